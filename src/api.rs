// src/api.rs
use crate::assistant::{self, ChatRequest};
use crate::error::{handle_rejection, DashboardError};
use crate::market::SortKey;
use crate::models::{NewHolding, NewWatchlistEntry, PriceLookup, WatchlistEntry};
use crate::state::{AppState, PriceScope};
use crate::views::{self, AnalysisView, OverviewView, PredictionView};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Deserialize)]
struct MarketQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    sort: SortKey,
}

#[derive(Debug, Deserialize)]
struct GreetingQuery {
    coin: Option<String>,
}

pub fn routes(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let market = warp::path!("market")
        .and(warp::get())
        .and(warp::query::<MarketQuery>())
        .and(with_state(state.clone()))
        .and_then(market_handler);

    let coin = warp::path!("coins" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(coin_handler);

    let analysis = warp::path!("coins" / String / "analysis")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(analysis_handler);

    let prediction = warp::path!("predictions" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(prediction_handler);

    let overview = warp::path!("overview")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(overview_handler);

    let get_portfolio = warp::path!("portfolio")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_portfolio_handler);

    let add_holding = warp::path!("portfolio")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::json())
        .and_then(add_holding_handler);

    let delete_holding = warp::path!("portfolio" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(delete_holding_handler);

    let get_watchlist = warp::path!("watchlist")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_watchlist_handler);

    let toggle_watchlist = warp::path!("watchlist" / "toggle")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::json())
        .and_then(toggle_watchlist_handler);

    let delete_watchlist = warp::path!("watchlist" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(delete_watchlist_handler);

    let chat = warp::path!("chat")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::json())
        .and_then(chat_handler);

    let greeting = warp::path!("chat" / "greeting")
        .and(warp::get())
        .and(warp::query::<GreetingQuery>())
        .map(|q: GreetingQuery| {
            warp::reply::json(&json!({
                "role": "assistant",
                "content": assistant::greeting(q.coin.as_deref()),
            }))
        });

    market
        .or(coin)
        .or(analysis)
        .or(prediction)
        .or(overview)
        .or(get_portfolio)
        .or(add_holding)
        .or(delete_holding)
        .or(get_watchlist)
        .or(toggle_watchlist)
        .or(delete_watchlist)
        .or(chat)
        .or(greeting)
        .recover(handle_rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn reject(context: &str, e: DashboardError) -> Rejection {
    error!("Failed to {}: {}", context, e);
    warp::reject::custom(e)
}

/// Watchlist membership only decorates other views, so a failure here
/// renders everything as not watchlisted.
async fn watchlist_or_empty(state: &AppState) -> Vec<WatchlistEntry> {
    state.watchlist().await.unwrap_or_else(|e| {
        warn!("Watchlist unavailable, rendering without flags: {}", e);
        Vec::new()
    })
}

async fn prices_or_empty(state: &AppState, scope: PriceScope, coin_ids: Vec<String>) -> PriceLookup {
    state.prices(scope, &coin_ids).await.unwrap_or_else(|e| {
        warn!("Price lookup failed for {:?}, using fallbacks: {}", scope, e);
        PriceLookup::new()
    })
}

async fn market_handler(query: MarketQuery, state: AppState) -> Result<impl Reply, Rejection> {
    let snapshot = state
        .market()
        .await
        .map_err(|e| reject("load market data", e))?;
    let watchlist = watchlist_or_empty(&state).await;
    let view = views::market_view(&snapshot, &watchlist, &query.q, query.sort);
    info!(
        "Market view: {} of {} coins for {:?}.",
        view.coins.len(),
        snapshot.coins.len(),
        query.q
    );
    Ok(warp::reply::json(&view))
}

async fn coin_handler(coin_id: String, state: AppState) -> Result<impl Reply, Rejection> {
    let detail = state
        .coin_detail(&coin_id)
        .await
        .map_err(|e| reject("load coin detail", e))?;
    let watchlist = watchlist_or_empty(&state).await;
    Ok(warp::reply::json(&views::coin_detail_view(
        &coin_id, detail, &watchlist,
    )))
}

async fn analysis_handler(coin_id: String, state: AppState) -> Result<impl Reply, Rejection> {
    let analysis = state
        .coin_analysis(&coin_id)
        .await
        .map_err(|e| reject("load coin analysis", e))?;
    Ok(warp::reply::json(&AnalysisView::from(analysis)))
}

async fn prediction_handler(coin: String, state: AppState) -> Result<impl Reply, Rejection> {
    let report = state
        .prediction(&coin)
        .await
        .map_err(|e| reject("load prediction", e))?;
    Ok(warp::reply::json(&PredictionView::from(report)))
}

async fn overview_handler(state: AppState) -> Result<impl Reply, Rejection> {
    let overview = state
        .overview()
        .await
        .map_err(|e| reject("load market overview", e))?;
    Ok(warp::reply::json(&OverviewView::from(overview)))
}

async fn get_portfolio_handler(state: AppState) -> Result<impl Reply, Rejection> {
    let holdings = state
        .holdings()
        .await
        .map_err(|e| reject("retrieve portfolio", e))?;
    let coin_ids = holdings.iter().map(|h| h.coin_id.clone()).collect();
    let prices = prices_or_empty(&state, PriceScope::Portfolio, coin_ids).await;
    info!("Portfolio retrieved with {} holdings.", holdings.len());
    Ok(warp::reply::json(&views::portfolio_view(&holdings, &prices)))
}

async fn add_holding_handler(
    state: AppState,
    holding: NewHolding,
) -> Result<impl Reply, Rejection> {
    let created = state
        .add_holding(holding)
        .await
        .map_err(|e| reject("add holding", e))?;
    Ok(warp::reply::with_status(
        warp::reply::json(&created),
        StatusCode::CREATED,
    ))
}

async fn delete_holding_handler(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    state
        .remove_holding(&id)
        .await
        .map_err(|e| reject("delete holding", e))?;
    Ok(warp::reply::with_status(
        "Holding deleted",
        StatusCode::OK,
    ))
}

async fn get_watchlist_handler(state: AppState) -> Result<impl Reply, Rejection> {
    let entries = state
        .watchlist()
        .await
        .map_err(|e| reject("retrieve watchlist", e))?;
    let coin_ids = entries.iter().map(|e| e.coin_id.clone()).collect();
    let prices = prices_or_empty(&state, PriceScope::Watchlist, coin_ids).await;
    info!("Watchlist retrieved with {} entries.", entries.len());
    Ok(warp::reply::json(&views::watchlist_view(&entries, &prices)))
}

async fn toggle_watchlist_handler(
    state: AppState,
    coin: NewWatchlistEntry,
) -> Result<impl Reply, Rejection> {
    let outcome = state
        .toggle_watchlist(coin)
        .await
        .map_err(|e| reject("toggle watchlist", e))?;
    Ok(warp::reply::json(&outcome))
}

async fn delete_watchlist_handler(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    state
        .remove_watchlist_entry(&id)
        .await
        .map_err(|e| reject("delete watchlist entry", e))?;
    Ok(warp::reply::with_status(
        "Watchlist entry deleted",
        StatusCode::OK,
    ))
}

async fn chat_handler(state: AppState, request: ChatRequest) -> Result<impl Reply, Rejection> {
    let reply = assistant::answer(state.insight.as_ref(), request)
        .await
        .map_err(|e| reject("answer chat message", e))?;
    Ok(warp::reply::json(&reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaleWindows;
    use crate::db::MemoryStore;
    use crate::insight::testing::ScriptedInsight;
    use serde_json::Value;
    use std::sync::Arc;

    fn market_reply() -> Value {
        json!({
            "coins": [
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 67500,
                 "market_cap": 1.32e12, "price_change_percentage_24h": 2.5,
                 "sparkline_in_7d": {"price": [65000, 66000, 67500]}},
                {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 3500,
                 "market_cap": 4.2e11, "price_change_percentage_24h": -1.2},
                {"id": "solana", "symbol": "sol", "name": "Solana", "current_price": 150,
                 "market_cap": 7e10, "price_change_percentage_24h": 8.1},
                {"id": "dogecoin", "symbol": "doge", "name": "Dogecoin", "current_price": 0.15,
                 "market_cap": 2.1e10, "price_change_percentage_24h": -6.4}
            ],
            "global": {"total_market_cap": {"usd": 2.5e12}}
        })
    }

    fn app(insight: ScriptedInsight) -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(insight),
            &StaleWindows::default(),
        )
    }

    fn body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn market_filters_grid_but_not_movers() {
        let api = routes(app(ScriptedInsight::new().reply("top 20", market_reply())));
        let res = warp::test::request()
            .method("GET")
            .path("/market?q=o&sort=change")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let view = body(&res);
        let grid: Vec<&str> = view["coins"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(grid, vec!["solana", "bitcoin", "dogecoin"]);
        assert_eq!(view["top_gainers"].as_array().unwrap().len(), 3);
        assert_eq!(view["top_losers"][0]["id"], "dogecoin");
        assert_eq!(view["global"]["total_market_cap"], "$2.50T");
        assert_eq!(view["coins"][1]["sparkline"]["stroke"], "#00ff88");
    }

    #[tokio::test]
    async fn unknown_sort_key_is_a_bad_request() {
        let api = routes(app(ScriptedInsight::new().reply("top 20", market_reply())));
        let res = warp::test::request()
            .method("GET")
            .path("/market?sort=volume")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn market_failure_is_a_bad_gateway() {
        let api = routes(app(ScriptedInsight::new()));
        let res = warp::test::request().method("GET").path("/market").reply(&api).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert!(body(&res)["error"].as_str().unwrap().contains("insight"));
    }

    #[tokio::test]
    async fn portfolio_lifecycle() {
        let api = routes(app(
            ScriptedInsight::new().reply("price data", json!({"bitcoin": {"price": 66000}})),
        ));

        let res = warp::test::request().method("GET").path("/portfolio").reply(&api).await;
        let empty = body(&res);
        assert_eq!(empty["totals"]["return_percent"], 0.0);
        assert!(empty["growth"].is_null());

        let res = warp::test::request()
            .method("POST")
            .path("/portfolio")
            .json(&json!({"coin_id": "bitcoin", "coin_name": "Bitcoin", "coin_symbol": "btc",
                          "quantity": 0.5, "buy_price": 60000}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let id = body(&res)["id"].as_str().unwrap().to_string();

        let res = warp::test::request().method("GET").path("/portfolio").reply(&api).await;
        let view = body(&res);
        assert_eq!(view["totals"]["total_value"], 33000.0);
        assert_eq!(view["totals"]["total_profit_loss"], 3000.0);
        assert_eq!(view["display"]["return_percent"], "+10.00%");
        assert_eq!(view["allocation"][0]["symbol"], "BTC");
        assert_eq!(view["growth"]["synthetic"], true);

        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/portfolio/{}", id))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/portfolio/{}", id))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn portfolio_prices_fall_back_when_lookup_fails() {
        let api = routes(app(ScriptedInsight::new()));
        warp::test::request()
            .method("POST")
            .path("/portfolio")
            .json(&json!({"coin_id": "solana", "coin_name": "Solana", "quantity": 2, "buy_price": 100}))
            .reply(&api)
            .await;

        let res = warp::test::request().method("GET").path("/portfolio").reply(&api).await;
        let view = body(&res);
        assert_eq!(view["totals"]["total_value"], 200.0);
        assert_eq!(view["holdings"][0]["priced"], false);
    }

    #[tokio::test]
    async fn invalid_holding_is_rejected() {
        let api = routes(app(ScriptedInsight::new()));
        let res = warp::test::request()
            .method("POST")
            .path("/portfolio")
            .json(&json!({"coin_id": "bitcoin", "coin_name": "Bitcoin", "quantity": 0, "buy_price": 1}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn watchlist_toggle_round_trip() {
        let api = routes(app(ScriptedInsight::new().reply("top 20", market_reply())));
        let toggle = || {
            warp::test::request()
                .method("POST")
                .path("/watchlist/toggle")
                .json(&json!({"coin_id": "ethereum", "coin_name": "Ethereum", "coin_symbol": "eth"}))
        };

        let res = toggle().reply(&api).await;
        assert_eq!(body(&res)["watchlisted"], true);

        let res = warp::test::request().method("GET").path("/market?q=eth").reply(&api).await;
        assert_eq!(body(&res)["coins"][0]["watchlisted"], true);

        let res = toggle().reply(&api).await;
        assert_eq!(body(&res)["watchlisted"], false);

        let res = warp::test::request().method("GET").path("/watchlist").reply(&api).await;
        assert_eq!(body(&res), json!([]));
    }

    #[tokio::test]
    async fn coin_detail_flags_by_route_id() {
        let api = routes(app(ScriptedInsight::new().reply(
            "Describe the bitcoin",
            json!({"id": "BTC", "name": "Bitcoin", "current_price": 67500}),
        )));
        warp::test::request()
            .method("POST")
            .path("/watchlist/toggle")
            .json(&json!({"coin_id": "bitcoin", "coin_name": "Bitcoin", "coin_symbol": "btc"}))
            .reply(&api)
            .await;

        let res = warp::test::request().method("GET").path("/coins/bitcoin").reply(&api).await;
        assert_eq!(res.status(), StatusCode::OK);
        let view = body(&res);
        assert_eq!(view["watchlisted"], true);
        assert_eq!(view["price"], "$67,500.00");
    }

    #[tokio::test]
    async fn overview_classifies_fear_greed() {
        let api = routes(app(ScriptedInsight::new().reply(
            "fear_greed_index",
            json!({"overall_sentiment": "bearish", "fear_greed_index": 26}),
        )));
        let res = warp::test::request().method("GET").path("/overview").reply(&api).await;
        let view = body(&res);
        assert_eq!(view["band"], "fear");
        assert_eq!(view["band_color"], "text-orange-500");
        assert_eq!(view["badge"]["text"], "Bearish");
    }

    #[tokio::test]
    async fn chat_degrades_to_fallback() {
        let api = routes(app(ScriptedInsight::new()));
        let res = warp::test::request()
            .method("POST")
            .path("/chat")
            .json(&json!({"message": "Is now a good time to buy?"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["content"], assistant::FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let api = routes(app(ScriptedInsight::new()));
        let res = warp::test::request().method("GET").path("/nope").reply(&api).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(body(&res)["error"].is_string());
    }
}
