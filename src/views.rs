// src/views.rs
//! Render-ready projections: raw records run through the transformers and
//! formatters so a client only has to lay them out.

use crate::format::{
    format_compact_currency, format_currency, format_signed_percent, format_value, FormatKind,
};
use crate::market::{self, SortKey};
use crate::models::{
    Coin, CoinAnalysis, CoinDetail, GlobalStats, Holding, MarketOverview, MarketSnapshot,
    PredictionReport, PriceLookup, WatchlistEntry,
};
use crate::portfolio::{self, AllocationSlice, GrowthSeries, PortfolioTotals, TotalsDisplay};
use crate::sentiment::{
    BadgeSize, FearGreedBand, RiskLevel, Sentiment, SentimentStyle, NEUTRAL_FEAR_GREED,
};
use crate::sparkline;
use crate::watchlist::is_watchlisted;
use serde::Serialize;

const GAIN_STROKE: &str = "#00ff88";
const LOSS_STROKE: &str = "#ff3366";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparklineView {
    pub path: String,
    pub stroke: &'static str,
}

impl SparklineView {
    fn new(prices: &[f64], positive: bool) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        Some(Self {
            path: sparkline::path(prices),
            stroke: if positive { GAIN_STROKE } else { LOSS_STROKE },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinCard {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub rank: Option<u32>,
    pub price: String,
    pub change_24h: String,
    pub positive: bool,
    pub market_cap: String,
    pub volume_24h: String,
    pub sparkline: Option<SparklineView>,
    pub watchlisted: bool,
}

impl CoinCard {
    pub fn new(coin: &Coin, watchlist: &[WatchlistEntry]) -> Self {
        let positive = coin.price_change_percentage_24h >= 0.0;
        Self {
            id: coin.id.clone(),
            symbol: coin.symbol.to_uppercase(),
            name: coin.name.clone(),
            image: coin.image.clone(),
            rank: coin.market_cap_rank,
            price: format_currency(coin.current_price),
            change_24h: format_signed_percent(coin.price_change_percentage_24h),
            positive,
            market_cap: format_currency(coin.market_cap),
            volume_24h: format_currency(coin.total_volume),
            sparkline: coin
                .sparkline_in_7d
                .as_ref()
                .and_then(|s| SparklineView::new(&s.price, positive)),
            watchlisted: is_watchlisted(watchlist, &coin.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStatsView {
    pub total_market_cap: String,
    pub total_volume: String,
    pub btc_dominance: String,
    pub active_coins: String,
}

impl From<&GlobalStats> for GlobalStatsView {
    fn from(g: &GlobalStats) -> Self {
        Self {
            total_market_cap: format_compact_currency(g.total_market_cap_usd),
            total_volume: format_compact_currency(g.total_volume_usd),
            btc_dominance: format_value(Some(g.btc_dominance), FormatKind::Percent),
            active_coins: format_value(
                Some(g.active_cryptocurrencies as f64),
                FormatKind::Number,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketView {
    pub query: String,
    pub sort: SortKey,
    pub coins: Vec<CoinCard>,
    pub top_gainers: Vec<CoinCard>,
    pub top_losers: Vec<CoinCard>,
    pub global: GlobalStatsView,
}

pub fn market_view(
    snapshot: &MarketSnapshot,
    watchlist: &[WatchlistEntry],
    query: &str,
    sort: SortKey,
) -> MarketView {
    let cards = |coins: Vec<&Coin>| -> Vec<CoinCard> {
        coins.into_iter().map(|c| CoinCard::new(c, watchlist)).collect()
    };
    MarketView {
        query: query.to_string(),
        sort,
        coins: cards(market::filter_and_sort(&snapshot.coins, query, sort)),
        top_gainers: cards(market::top_gainers(&snapshot.coins)),
        top_losers: cards(market::top_losers(&snapshot.coins)),
        global: GlobalStatsView::from(&snapshot.global),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinDetailView {
    pub detail: CoinDetail,
    pub price: String,
    pub change_24h: String,
    pub positive: bool,
    pub market_cap: String,
    pub volume_24h: String,
    pub high_24h: String,
    pub low_24h: String,
    pub ath: String,
    pub sparkline: Option<SparklineView>,
    pub watchlisted: bool,
}

/// `coin_id` is the requested id; the id inside `detail` comes from the
/// service reply and is not trusted for watchlist membership.
pub fn coin_detail_view(
    coin_id: &str,
    detail: CoinDetail,
    watchlist: &[WatchlistEntry],
) -> CoinDetailView {
    let change = detail.price_change_percentage_24h.unwrap_or(0.0);
    let positive = change >= 0.0;
    let money = |v: Option<f64>| format_currency(v.unwrap_or(0.0));
    CoinDetailView {
        price: money(detail.current_price),
        change_24h: format_signed_percent(change),
        positive,
        market_cap: money(detail.market_cap),
        volume_24h: money(detail.total_volume),
        high_24h: money(detail.high_24h),
        low_24h: money(detail.low_24h),
        ath: money(detail.ath),
        sparkline: SparklineView::new(&detail.price_history, positive),
        watchlisted: is_watchlisted(watchlist, coin_id),
        detail,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    #[serde(flatten)]
    pub analysis: CoinAnalysis,
    pub sentiment_class: Sentiment,
    pub badge: SentimentStyle,
    pub badge_classes: &'static str,
}

impl From<CoinAnalysis> for AnalysisView {
    fn from(analysis: CoinAnalysis) -> Self {
        let sentiment_class = Sentiment::from_label(analysis.sentiment.as_deref());
        Self {
            badge: sentiment_class.style(),
            badge_classes: BadgeSize::Md.classes(),
            sentiment_class,
            analysis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    #[serde(flatten)]
    pub report: PredictionReport,
    pub sentiment_class: Sentiment,
    pub badge: SentimentStyle,
    pub badge_classes: &'static str,
    pub risk: RiskLevel,
    pub risk_classes: &'static str,
    pub target: String,
    pub chart: Vec<ChartPoint>,
}

impl From<PredictionReport> for PredictionView {
    fn from(report: PredictionReport) -> Self {
        let sentiment_class = Sentiment::from_label(report.sentiment.as_deref());
        let risk = RiskLevel::from_label(report.risk_level.as_deref());
        let chart = report
            .daily_prices
            .iter()
            .enumerate()
            .map(|(i, price)| ChartPoint {
                time: format!("Day {}", i + 1),
                price: *price,
            })
            .collect();
        Self {
            badge: sentiment_class.style(),
            badge_classes: BadgeSize::Lg.classes(),
            sentiment_class,
            risk,
            risk_classes: risk.classes(),
            target: format_currency(report.target_7d.unwrap_or(0.0)),
            chart,
            report,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    #[serde(flatten)]
    pub overview: MarketOverview,
    pub fear_greed: i64,
    pub band: FearGreedBand,
    pub band_label: &'static str,
    pub band_color: &'static str,
    pub sentiment_class: Sentiment,
    pub badge: SentimentStyle,
    pub badge_classes: &'static str,
}

impl From<MarketOverview> for OverviewView {
    fn from(overview: MarketOverview) -> Self {
        let fear_greed = overview.fear_greed_index.unwrap_or(NEUTRAL_FEAR_GREED);
        let band = FearGreedBand::classify(fear_greed);
        let sentiment_class = Sentiment::from_label(overview.overall_sentiment.as_deref());
        Self {
            fear_greed,
            band,
            band_label: band.label(),
            band_color: band.color(),
            sentiment_class,
            badge: sentiment_class.style(),
            badge_classes: BadgeSize::Sm.classes(),
            overview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingRow {
    #[serde(flatten)]
    pub holding: Holding,
    pub current_price: f64,
    pub current_value: f64,
    pub invested_value: f64,
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
    pub priced: bool,
    pub value_display: String,
    pub change_display: String,
    pub positive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioView {
    pub totals: PortfolioTotals,
    pub display: TotalsDisplay,
    pub holdings: Vec<HoldingRow>,
    pub allocation: Vec<AllocationSlice>,
    pub growth: Option<GrowthSeries>,
}

pub fn portfolio_view(holdings: &[Holding], prices: &PriceLookup) -> PortfolioView {
    let summary = portfolio::summarize(holdings, prices);
    let rows = holdings
        .iter()
        .zip(&summary.holdings)
        .map(|(holding, b)| HoldingRow {
            holding: holding.clone(),
            current_price: b.current_price,
            current_value: b.current_value,
            invested_value: b.invested_value,
            profit_loss: b.profit_loss,
            profit_loss_percent: b.profit_loss_percent,
            priced: b.priced,
            value_display: format_currency(b.current_value),
            change_display: format_signed_percent(b.profit_loss_percent),
            positive: b.profit_loss >= 0.0,
        })
        .collect();

    PortfolioView {
        display: TotalsDisplay::from(&summary.totals),
        growth: (!holdings.is_empty()).then(|| portfolio::growth_series(&summary.totals)),
        totals: summary.totals,
        holdings: rows,
        allocation: summary.allocation,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistRow {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub price: String,
    pub change_24h: String,
    pub positive: bool,
    pub market_cap: String,
}

pub fn watchlist_view(entries: &[WatchlistEntry], prices: &PriceLookup) -> Vec<WatchlistRow> {
    entries
        .iter()
        .map(|entry| {
            let quote = prices.get(&entry.coin_id).copied().unwrap_or_default();
            let change = quote.change_24h.unwrap_or(0.0);
            WatchlistRow {
                entry: entry.clone(),
                price: format_currency(quote.price),
                change_24h: format_signed_percent(change),
                positive: change >= 0.0,
                market_cap: format_currency(quote.market_cap.unwrap_or(0.0)),
            }
        })
        .collect()
}
