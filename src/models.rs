// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    pub price: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub market_cap_rank: Option<u32>,
    pub total_volume: f64,
    pub price_change_percentage_24h: f64,
    pub sparkline_in_7d: Option<Sparkline>,
}

/// Market-wide aggregates shown in the stats strip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_market_cap_usd: f64,
    pub total_volume_usd: f64,
    pub btc_dominance: f64,
    pub active_cryptocurrencies: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub coins: Vec<Coin>,
    pub global: GlobalStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: String,
    pub coin_id: String,
    pub coin_name: String,
    #[serde(default)]
    pub coin_symbol: String,
    #[serde(default)]
    pub coin_image: String,
    pub quantity: f64,
    pub buy_price: f64,
    #[serde(default)]
    pub buy_date: Option<NaiveDate>,
    #[serde(default)]
    pub transaction_type: TransactionType,
}

/// Body accepted when a user adds a holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHolding {
    pub coin_id: String,
    pub coin_name: String,
    #[serde(default)]
    pub coin_symbol: String,
    #[serde(default)]
    pub coin_image: String,
    pub quantity: f64,
    pub buy_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub id: String,
    pub coin_id: String,
    pub coin_name: String,
    pub coin_symbol: String,
    #[serde(default)]
    pub coin_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWatchlistEntry {
    pub coin_id: String,
    pub coin_name: String,
    pub coin_symbol: String,
    #[serde(default)]
    pub coin_image: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub change_24h: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Current quotes keyed by coin id. Missing entries are expected.
pub type PriceLookup = HashMap<String, PriceQuote>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_date: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub price_history: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub source: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinAnalysis {
    pub sentiment: Option<String>,
    pub confidence: Option<f64>,
    pub factors: Vec<String>,
    pub summary: Option<String>,
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub coin: String,
    pub current_price: Option<f64>,
    pub sentiment: Option<String>,
    pub confidence: Option<f64>,
    pub risk_level: Option<String>,
    pub target_7d: Option<f64>,
    pub percent_change: Option<f64>,
    pub daily_prices: Vec<f64>,
    pub factors: Vec<String>,
    pub risks: Vec<String>,
    pub recommendation: Option<String>,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub name: String,
    pub trend: Option<String>,
    pub change: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorPerformance {
    pub sector: String,
    pub change: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub overall_sentiment: Option<String>,
    pub fear_greed_index: Option<i64>,
    pub fear_greed_label: Option<String>,
    pub trending_narratives: Vec<Narrative>,
    pub sector_performance: Vec<SectorPerformance>,
    pub key_events: Vec<String>,
    pub market_summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holding_defaults_optional_fields() {
        let holding: Holding = serde_json::from_str(
            r#"{"id":"h1","coin_id":"bitcoin","coin_name":"Bitcoin","quantity":0.5,"buy_price":60000}"#,
        )
        .unwrap();
        assert_eq!(holding.transaction_type, TransactionType::Buy);
        assert!(holding.buy_date.is_none());
        assert!(holding.coin_symbol.is_empty());
    }

    #[test]
    fn transaction_type_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&TransactionType::Sell).unwrap(),
            "\"sell\""
        );
    }
}
