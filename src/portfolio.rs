// src/portfolio.rs
use crate::format::{format_currency, format_signed_percent};
use crate::models::{Holding, PriceLookup};
use serde::Serialize;

/// Allocation chart colours, assigned by holding position.
pub const PALETTE: [&str; 7] = [
    "#00f5ff", "#bf00ff", "#00ff88", "#ff3366", "#ffd700", "#627eea", "#f7931a",
];

const GROWTH_POINTS: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingBreakdown {
    pub holding_id: String,
    pub coin_id: String,
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub invested_value: f64,
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
    /// `false` when no quote was available and the buy price stood in.
    pub priced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSlice {
    pub symbol: String,
    pub share: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PortfolioTotals {
    pub total_value: f64,
    pub total_invested: f64,
    pub total_profit_loss: f64,
    pub return_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    pub time: String,
    pub value: f64,
}

/// Placeholder history. There is no recorded valuation history, so this is a
/// straight ramp and is always marked synthetic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthSeries {
    pub synthetic: bool,
    pub points: Vec<GrowthPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub totals: PortfolioTotals,
    pub holdings: Vec<HoldingBreakdown>,
    pub allocation: Vec<AllocationSlice>,
}

pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

pub fn breakdown(holding: &Holding, prices: &PriceLookup) -> HoldingBreakdown {
    let quote = prices
        .get(&holding.coin_id)
        .map(|q| q.price)
        .filter(|p| p.is_finite());
    let current_price = quote.unwrap_or(holding.buy_price);
    let current_value = holding.quantity * current_price;
    let invested_value = holding.quantity * holding.buy_price;
    let profit_loss = current_value - invested_value;

    HoldingBreakdown {
        holding_id: holding.id.clone(),
        coin_id: holding.coin_id.clone(),
        symbol: holding.coin_symbol.to_uppercase(),
        quantity: holding.quantity,
        buy_price: holding.buy_price,
        current_price,
        current_value,
        invested_value,
        profit_loss,
        profit_loss_percent: percent_of(profit_loss, invested_value),
        priced: quote.is_some(),
    }
}

pub fn summarize(holdings: &[Holding], prices: &PriceLookup) -> PortfolioSummary {
    let rows: Vec<HoldingBreakdown> = holdings.iter().map(|h| breakdown(h, prices)).collect();

    let total_value: f64 = rows.iter().map(|r| r.current_value).sum();
    let total_invested: f64 = rows.iter().map(|r| r.invested_value).sum();
    let total_profit_loss = total_value - total_invested;

    let allocation = rows
        .iter()
        .enumerate()
        .map(|(index, row)| AllocationSlice {
            symbol: row.symbol.clone(),
            share: row.current_value,
            color: PALETTE[index % PALETTE.len()],
        })
        .collect();

    PortfolioSummary {
        totals: PortfolioTotals {
            total_value,
            total_invested,
            total_profit_loss,
            return_percent: percent_of(total_profit_loss, total_invested),
        },
        holdings: rows,
        allocation,
    }
}

pub fn growth_series(totals: &PortfolioTotals) -> GrowthSeries {
    let last = (GROWTH_POINTS - 1) as f64;
    let points = (0..GROWTH_POINTS)
        .map(|i| {
            let t = i as f64 / last;
            GrowthPoint {
                time: format!("Day {}", i + 1),
                value: totals.total_invested + (totals.total_value - totals.total_invested) * t,
            }
        })
        .collect();
    GrowthSeries {
        synthetic: true,
        points,
    }
}

/// Display strings for the four headline cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsDisplay {
    pub total_value: String,
    pub total_invested: String,
    pub total_profit_loss: String,
    pub return_percent: String,
    pub gaining: bool,
}

impl From<&PortfolioTotals> for TotalsDisplay {
    fn from(t: &PortfolioTotals) -> Self {
        let pl = format_currency(t.total_profit_loss);
        Self {
            total_value: format_currency(t.total_value),
            total_invested: format_currency(t.total_invested),
            total_profit_loss: if t.total_profit_loss > 0.0 {
                format!("+{}", pl)
            } else {
                pl
            },
            return_percent: format_signed_percent(t.return_percent),
            gaining: t.total_profit_loss >= 0.0,
        }
    }
}
