// src/insight.rs
//! Client for the hosted structured-generation service and coercion of its
//! replies. Replies are untrusted: every field is optional and wrong-typed
//! values are treated as missing.

use crate::error::{DashboardError, Result};
use crate::models::{
    Coin, CoinAnalysis, CoinDetail, GlobalStats, MarketOverview, MarketSnapshot, Narrative,
    NewsItem, PredictionReport, PriceLookup, PriceQuote, SectorPerformance, Sparkline,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightRequest {
    pub prompt: String,
    pub add_context_from_internet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<Value>,
}

impl InsightRequest {
    fn structured(prompt: String, schema: Value) -> Self {
        Self {
            prompt,
            add_context_from_internet: true,
            response_json_schema: Some(schema),
        }
    }
}

#[async_trait]
pub trait InsightSource: Send + Sync {
    async fn invoke(&self, request: InsightRequest) -> Result<Value>;
}

pub struct HttpInsightClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpInsightClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl InsightSource for HttpInsightClient {
    async fn invoke(&self, request: InsightRequest) -> Result<Value> {
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(DashboardError::Insight(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(response.json::<Value>().await?)
    }
}

// Field readers. Numbers may arrive as JSON numbers or numeric strings.

fn num(v: &Value, key: &str) -> Option<f64> {
    as_num(v.get(key)?)
}

fn as_num(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn num_list(v: Option<&Value>) -> Vec<f64> {
    v.and_then(Value::as_array)
        .map(|items| items.iter().filter_map(as_num).collect())
        .unwrap_or_default()
}

fn text_list(v: &Value, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn non_negative(n: Option<f64>) -> f64 {
    n.filter(|n| *n >= 0.0).unwrap_or(0.0)
}

fn rank(v: &Value, key: &str) -> Option<u32> {
    num(v, key)
        .filter(|r| *r >= 1.0 && *r <= u32::MAX as f64)
        .map(|r| r.round() as u32)
}

pub fn coerce_coin(v: &Value) -> Option<Coin> {
    let id = text(v, "id")?;
    let sparkline = v.get("sparkline_in_7d").and_then(|s| {
        let prices: Vec<f64> = num_list(s.get("price").or(Some(s)))
            .into_iter()
            .filter(|p| *p >= 0.0)
            .collect();
        (!prices.is_empty()).then_some(Sparkline { price: prices })
    });

    Some(Coin {
        symbol: text(v, "symbol").unwrap_or_default(),
        name: text(v, "name").unwrap_or_else(|| id.clone()),
        image: text(v, "image").unwrap_or_default(),
        current_price: non_negative(num(v, "current_price")),
        market_cap: non_negative(num(v, "market_cap")),
        market_cap_rank: rank(v, "market_cap_rank"),
        total_volume: non_negative(num(v, "total_volume")),
        price_change_percentage_24h: num(v, "price_change_percentage_24h").unwrap_or(0.0),
        sparkline_in_7d: sparkline,
        id,
    })
}

pub fn coerce_market_snapshot(v: &Value) -> MarketSnapshot {
    let raw = v.get("coins").and_then(Value::as_array);
    let coins: Vec<Coin> = raw
        .map(|items| items.iter().filter_map(coerce_coin).collect())
        .unwrap_or_default();
    let dropped = raw.map_or(0, Vec::len) - coins.len();
    if dropped > 0 {
        warn!("Dropped {} coin records without an id", dropped);
    }

    let global = v.get("global").cloned().unwrap_or(Value::Null);
    let usd = |key: &str| {
        global
            .get(key)
            .and_then(|g| num(g, "usd"))
            .map_or(0.0, |n| n.max(0.0))
    };

    MarketSnapshot {
        coins,
        global: GlobalStats {
            total_market_cap_usd: usd("total_market_cap"),
            total_volume_usd: usd("total_volume"),
            btc_dominance: global
                .get("market_cap_percentage")
                .and_then(|p| num(p, "btc"))
                .unwrap_or(0.0),
            active_cryptocurrencies: non_negative(num(&global, "active_cryptocurrencies")) as u64,
        },
    }
}

/// Accepts `{"bitcoin": 67500}` as well as
/// `{"bitcoin": {"price": 67500, "change_24h": 2.5, "market_cap": 1.3e12}}`.
pub fn coerce_price_lookup(v: &Value) -> PriceLookup {
    let Some(entries) = v.as_object() else {
        return PriceLookup::new();
    };

    entries
        .iter()
        .filter_map(|(coin_id, raw)| {
            let quote = match raw {
                Value::Object(_) => PriceQuote {
                    price: num(raw, "price").or_else(|| num(raw, "current_price"))?,
                    change_24h: num(raw, "change_24h"),
                    market_cap: num(raw, "market_cap"),
                },
                other => PriceQuote {
                    price: as_num(other)?,
                    ..Default::default()
                },
            };
            (quote.price >= 0.0).then(|| (coin_id.clone(), quote))
        })
        .collect()
}

pub fn coerce_coin_detail(coin_id: &str, v: &Value) -> CoinDetail {
    CoinDetail {
        id: text(v, "id").unwrap_or_else(|| coin_id.to_string()),
        symbol: text(v, "symbol"),
        name: text(v, "name"),
        image: text(v, "image"),
        current_price: num(v, "current_price"),
        market_cap: num(v, "market_cap"),
        market_cap_rank: rank(v, "market_cap_rank"),
        total_volume: num(v, "total_volume"),
        high_24h: num(v, "high_24h"),
        low_24h: num(v, "low_24h"),
        price_change_24h: num(v, "price_change_24h"),
        price_change_percentage_24h: num(v, "price_change_percentage_24h"),
        price_change_percentage_7d: num(v, "price_change_percentage_7d"),
        price_change_percentage_30d: num(v, "price_change_percentage_30d"),
        circulating_supply: num(v, "circulating_supply"),
        total_supply: num(v, "total_supply"),
        ath: num(v, "ath"),
        ath_date: text(v, "ath_date"),
        description: text(v, "description"),
        website: text(v, "website"),
        price_history: num_list(v.get("price_history"))
            .into_iter()
            .filter(|p| *p >= 0.0)
            .collect(),
    }
}

pub fn coerce_analysis(v: &Value) -> CoinAnalysis {
    let news = v
        .get("news")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(NewsItem {
                        title: text(item, "title")?,
                        source: text(item, "source"),
                        time: text(item, "time"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    CoinAnalysis {
        sentiment: text(v, "sentiment"),
        confidence: num(v, "confidence").map(|c| c.clamp(0.0, 100.0)),
        factors: text_list(v, "factors"),
        summary: text(v, "summary"),
        news,
    }
}

pub fn coerce_prediction(coin: &str, v: &Value) -> PredictionReport {
    let prediction = v.get("prediction").cloned().unwrap_or(Value::Null);
    PredictionReport {
        coin: text(v, "coin").unwrap_or_else(|| coin.to_string()),
        current_price: num(v, "current_price"),
        sentiment: text(v, "sentiment"),
        confidence: num(v, "confidence").map(|c| c.clamp(0.0, 100.0)),
        risk_level: text(v, "risk_level"),
        target_7d: num(&prediction, "7_day_target"),
        percent_change: num(&prediction, "percent_change"),
        daily_prices: num_list(prediction.get("daily_prices")),
        factors: text_list(v, "factors"),
        risks: text_list(v, "risks"),
        recommendation: text(v, "recommendation"),
        support_levels: num_list(v.get("support_levels")),
        resistance_levels: num_list(v.get("resistance_levels")),
    }
}

pub fn coerce_overview(v: &Value) -> MarketOverview {
    let objects = |key: &str| -> Vec<Value> {
        v.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    MarketOverview {
        overall_sentiment: text(v, "overall_sentiment"),
        fear_greed_index: num(v, "fear_greed_index").map(|i| i.round().clamp(0.0, 100.0) as i64),
        fear_greed_label: text(v, "fear_greed_label"),
        trending_narratives: objects("trending_narratives")
            .iter()
            .filter_map(|n| {
                Some(Narrative {
                    name: text(n, "name")?,
                    trend: text(n, "trend"),
                    change: num(n, "change"),
                })
            })
            .collect(),
        sector_performance: objects("sector_performance")
            .iter()
            .filter_map(|s| {
                Some(SectorPerformance {
                    sector: text(s, "sector")?,
                    change: num(s, "change"),
                })
            })
            .collect(),
        key_events: text_list(v, "key_events"),
        market_summary: text(v, "market_summary"),
    }
}

pub async fn fetch_market(source: &dyn InsightSource) -> Result<MarketSnapshot> {
    let prompt = "List current market data for the top 20 cryptocurrencies by market cap. \
        For each coin give id (CoinGecko id), symbol, name, image URL, current_price, market_cap, \
        market_cap_rank, total_volume, price_change_percentage_24h and sparkline_in_7d.price \
        (seven daily closing prices). Also give global totals: total_market_cap.usd, \
        total_volume.usd, market_cap_percentage.btc and active_cryptocurrencies. Use real \
        approximate current data."
        .to_string();
    let schema = json!({
        "type": "object",
        "properties": {
            "coins": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "symbol": { "type": "string" },
                        "name": { "type": "string" },
                        "image": { "type": "string" },
                        "current_price": { "type": "number" },
                        "market_cap": { "type": "number" },
                        "market_cap_rank": { "type": "number" },
                        "total_volume": { "type": "number" },
                        "price_change_percentage_24h": { "type": "number" },
                        "sparkline_in_7d": { "type": "object" }
                    }
                }
            },
            "global": { "type": "object" }
        }
    });

    let reply = source.invoke(InsightRequest::structured(prompt, schema)).await?;
    let snapshot = coerce_market_snapshot(&reply);
    debug!("Market snapshot with {} coins", snapshot.coins.len());
    Ok(snapshot)
}

/// Quotes for `coin_ids`; no request is made for an empty set.
pub async fn fetch_prices(source: &dyn InsightSource, coin_ids: &[String]) -> Result<PriceLookup> {
    if coin_ids.is_empty() {
        return Ok(PriceLookup::new());
    }

    let prompt = format!(
        "Give the current price data for these cryptocurrencies: {}. Return a JSON object keyed \
         by coin id where each value has price, change_24h and market_cap.",
        coin_ids.join(", ")
    );
    let schema = json!({
        "type": "object",
        "additionalProperties": {
            "type": "object",
            "properties": {
                "price": { "type": "number" },
                "change_24h": { "type": "number" },
                "market_cap": { "type": "number" }
            }
        }
    });

    let reply = source.invoke(InsightRequest::structured(prompt, schema)).await?;
    Ok(coerce_price_lookup(&reply))
}

pub async fn fetch_coin_detail(source: &dyn InsightSource, coin_id: &str) -> Result<CoinDetail> {
    let prompt = format!(
        "Describe the {} cryptocurrency with real approximate current data: symbol, name, image, \
         current_price, market_cap, market_cap_rank, total_volume, high_24h, low_24h, \
         price_change_24h, price_change_percentage_24h/7d/30d, circulating_supply, total_supply, \
         ath, ath_date, a short description, website, and price_history (14 recent daily closes).",
        coin_id
    );
    let schema = json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "symbol": { "type": "string" },
            "name": { "type": "string" },
            "image": { "type": "string" },
            "current_price": { "type": "number" },
            "market_cap": { "type": "number" },
            "market_cap_rank": { "type": "number" },
            "total_volume": { "type": "number" },
            "high_24h": { "type": "number" },
            "low_24h": { "type": "number" },
            "price_change_24h": { "type": "number" },
            "price_change_percentage_24h": { "type": "number" },
            "price_change_percentage_7d": { "type": "number" },
            "price_change_percentage_30d": { "type": "number" },
            "circulating_supply": { "type": "number" },
            "total_supply": { "type": "number" },
            "ath": { "type": "number" },
            "ath_date": { "type": "string" },
            "description": { "type": "string" },
            "website": { "type": "string" },
            "price_history": { "type": "array", "items": { "type": "number" } }
        }
    });

    let reply = source.invoke(InsightRequest::structured(prompt, schema)).await?;
    Ok(coerce_coin_detail(coin_id, &reply))
}

pub async fn fetch_analysis(source: &dyn InsightSource, coin_id: &str) -> Result<CoinAnalysis> {
    let prompt = format!(
        "Analyze {}: give the market sentiment (bullish, bearish or neutral), a confidence score \
         from 0 to 100, key factors affecting the price, a two or three sentence summary, and \
         three recent news headlines with source and age.",
        coin_id
    );
    let schema = json!({
        "type": "object",
        "properties": {
            "sentiment": { "type": "string" },
            "confidence": { "type": "number" },
            "factors": { "type": "array", "items": { "type": "string" } },
            "summary": { "type": "string" },
            "news": { "type": "array", "items": { "type": "object" } }
        }
    });

    let reply = source.invoke(InsightRequest::structured(prompt, schema)).await?;
    Ok(coerce_analysis(&reply))
}

pub async fn fetch_prediction(source: &dyn InsightSource, coin: &str) -> Result<PredictionReport> {
    let prompt = format!(
        "Produce a 7-day price outlook for {}: current_price, sentiment (bullish, bearish or \
         neutral), confidence 0-100, risk_level (low, medium or high), and a prediction object \
         with 7_day_target, percent_change and daily_prices (seven values). Add factors, risks, \
         a recommendation, support_levels and resistance_levels.",
        coin
    );
    let schema = json!({
        "type": "object",
        "properties": {
            "coin": { "type": "string" },
            "current_price": { "type": "number" },
            "sentiment": { "type": "string" },
            "confidence": { "type": "number" },
            "risk_level": { "type": "string" },
            "prediction": { "type": "object" },
            "factors": { "type": "array", "items": { "type": "string" } },
            "risks": { "type": "array", "items": { "type": "string" } },
            "recommendation": { "type": "string" },
            "support_levels": { "type": "array", "items": { "type": "number" } },
            "resistance_levels": { "type": "array", "items": { "type": "number" } }
        }
    });

    let reply = source.invoke(InsightRequest::structured(prompt, schema)).await?;
    Ok(coerce_prediction(coin, &reply))
}

pub async fn fetch_overview(source: &dyn InsightSource) -> Result<MarketOverview> {
    let prompt = "Summarize the crypto market: overall_sentiment, fear_greed_index (0-100) with \
        its fear_greed_label, trending_narratives (name, trend up/down/neutral, change), \
        sector_performance (sector, change), key_events to watch, and a market_summary."
        .to_string();
    let schema = json!({
        "type": "object",
        "properties": {
            "overall_sentiment": { "type": "string" },
            "fear_greed_index": { "type": "number" },
            "fear_greed_label": { "type": "string" },
            "trending_narratives": { "type": "array" },
            "sector_performance": { "type": "array" },
            "key_events": { "type": "array", "items": { "type": "string" } },
            "market_summary": { "type": "string" }
        }
    });

    let reply = source.invoke(InsightRequest::structured(prompt, schema)).await?;
    Ok(coerce_overview(&reply))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedInsight;
    use super::*;

    #[test]
    fn coin_requires_id_and_tolerates_junk() {
        assert!(coerce_coin(&json!({"name": "Nameless"})).is_none());

        let coin = coerce_coin(&json!({
            "id": "bitcoin",
            "symbol": "btc",
            "current_price": "67500",
            "market_cap": -3,
            "market_cap_rank": 1,
            "price_change_percentage_24h": null,
            "sparkline_in_7d": {"price": [1, "x", 3, -2]}
        }))
        .unwrap();
        assert_eq!(coin.name, "bitcoin");
        assert_eq!(coin.current_price, 67500.0);
        assert_eq!(coin.market_cap, 0.0);
        assert_eq!(coin.market_cap_rank, Some(1));
        assert_eq!(coin.price_change_percentage_24h, 0.0);
        assert_eq!(coin.sparkline_in_7d.unwrap().price, vec![1.0, 3.0]);
    }

    #[test]
    fn snapshot_reads_global_block() {
        let snapshot = coerce_market_snapshot(&json!({
            "coins": [{"id": "bitcoin"}, {"symbol": "???"}, "garbage"],
            "global": {
                "total_market_cap": {"usd": 2.5e12},
                "total_volume": {"usd": 1e11},
                "market_cap_percentage": {"btc": 52.5},
                "active_cryptocurrencies": 10000
            }
        }));
        assert_eq!(snapshot.coins.len(), 1);
        assert_eq!(snapshot.global.total_market_cap_usd, 2.5e12);
        assert_eq!(snapshot.global.btc_dominance, 52.5);
        assert_eq!(snapshot.global.active_cryptocurrencies, 10000);

        let empty = coerce_market_snapshot(&Value::String("sorry".into()));
        assert!(empty.coins.is_empty());
        assert_eq!(empty.global, GlobalStats::default());
    }

    #[test]
    fn price_lookup_accepts_both_shapes() {
        let lookup = coerce_price_lookup(&json!({
            "bitcoin": 67500,
            "ethereum": {"price": 3500, "change_24h": -1.2, "market_cap": 4.2e11},
            "solana": {"change_24h": 1.0},
            "broken": "n/a",
            "negative": -1
        }));
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup["bitcoin"].price, 67500.0);
        assert_eq!(lookup["ethereum"].change_24h, Some(-1.2));
        assert!(coerce_price_lookup(&json!([1, 2])).is_empty());
    }

    #[test]
    fn prediction_and_overview_defaults() {
        let report = coerce_prediction("bitcoin", &json!({"confidence": 140}));
        assert_eq!(report.coin, "bitcoin");
        assert_eq!(report.confidence, Some(100.0));
        assert!(report.daily_prices.is_empty());
        assert!(report.sentiment.is_none());

        let overview = coerce_overview(&json!({
            "fear_greed_index": 64.6,
            "trending_narratives": [{"name": "AI Tokens", "change": 15}, {"trend": "up"}]
        }));
        assert_eq!(overview.fear_greed_index, Some(65));
        assert_eq!(overview.trending_narratives.len(), 1);
    }

    #[tokio::test]
    async fn empty_price_request_skips_the_service() {
        let source = ScriptedInsight::new();
        let lookup = fetch_prices(&source, &[]).await.unwrap();
        assert!(lookup.is_empty());
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn fetch_market_sends_schema_and_context_flag() {
        let source = ScriptedInsight::new().reply(
            "top 20",
            json!({"coins": [{"id": "bitcoin", "current_price": 1}]}),
        );
        let snapshot = fetch_market(&source).await.unwrap();
        assert_eq!(snapshot.coins[0].id, "bitcoin");

        let requests = source.requests.lock().unwrap();
        assert!(requests[0].add_context_from_internet);
        assert!(requests[0].response_json_schema.is_some());
    }
}
