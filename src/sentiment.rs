// src/sentiment.rs
//! Closed classification tables: sentiment badges, fear-greed bands and
//! risk levels. Each maps a label or score onto a fixed style descriptor.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentimentStyle {
    pub text: &'static str,
    pub gradient: &'static str,
    pub glow: &'static str,
    pub background: &'static str,
    pub border: &'static str,
}

impl Sentiment {
    /// Unknown or absent labels read as neutral.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("bullish") => Sentiment::Bullish,
            Some("bearish") => Sentiment::Bearish,
            _ => Sentiment::Neutral,
        }
    }

    pub fn style(self) -> SentimentStyle {
        match self {
            Sentiment::Bullish => SentimentStyle {
                text: "Bullish",
                gradient: "from-emerald-500 to-green-600",
                glow: "shadow-[0_0_20px_rgba(0,255,136,0.5)]",
                background: "bg-emerald-500/10",
                border: "border-emerald-500/30",
            },
            Sentiment::Bearish => SentimentStyle {
                text: "Bearish",
                gradient: "from-red-500 to-pink-600",
                glow: "shadow-[0_0_20px_rgba(255,51,102,0.5)]",
                background: "bg-red-500/10",
                border: "border-red-500/30",
            },
            Sentiment::Neutral => SentimentStyle {
                text: "Neutral",
                gradient: "from-gray-400 to-gray-500",
                glow: "shadow-[0_0_20px_rgba(156,163,175,0.3)]",
                background: "bg-gray-500/10",
                border: "border-gray-500/30",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeSize {
    Sm,
    #[default]
    Md,
    Lg,
}

impl BadgeSize {
    pub fn classes(self) -> &'static str {
        match self {
            BadgeSize::Sm => "px-2 py-1 text-xs",
            BadgeSize::Md => "px-3 py-1.5 text-sm",
            BadgeSize::Lg => "px-4 py-2 text-base",
        }
    }
}

pub const NEUTRAL_FEAR_GREED: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FearGreedBand {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl FearGreedBand {
    /// Cut points: <=25, <=45, <=55, <=75, above.
    pub fn classify(index: i64) -> Self {
        if index <= 25 {
            FearGreedBand::ExtremeFear
        } else if index <= 45 {
            FearGreedBand::Fear
        } else if index <= 55 {
            FearGreedBand::Neutral
        } else if index <= 75 {
            FearGreedBand::Greed
        } else {
            FearGreedBand::ExtremeGreed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FearGreedBand::ExtremeFear => "Extreme Fear",
            FearGreedBand::Fear => "Fear",
            FearGreedBand::Neutral => "Neutral",
            FearGreedBand::Greed => "Greed",
            FearGreedBand::ExtremeGreed => "Extreme Greed",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            FearGreedBand::ExtremeFear => "text-red-500",
            FearGreedBand::Fear => "text-orange-500",
            FearGreedBand::Neutral => "text-yellow-500",
            FearGreedBand::Greed => "text-green-400",
            FearGreedBand::ExtremeGreed => "text-emerald-400",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Anything that is not low or medium is treated as high.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => RiskLevel::Low,
            Some("medium") => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn classes(self) -> &'static str {
        match self {
            RiskLevel::Low => "text-emerald-400 bg-emerald-500/20",
            RiskLevel::Medium => "text-yellow-400 bg-yellow-500/20",
            RiskLevel::High => "text-red-400 bg-red-500/20",
        }
    }
}
