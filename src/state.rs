// src/state.rs
use crate::cache::QueryCache;
use crate::config::StaleWindows;
use crate::db::{self, EntityStore};
use crate::error::Result;
use crate::insight::{self, InsightSource};
use crate::models::{
    CoinAnalysis, CoinDetail, Holding, MarketOverview, MarketSnapshot, NewHolding,
    NewWatchlistEntry, PredictionReport, PriceLookup, WatchlistEntry,
};
use crate::watchlist::{self, ToggleOutcome};
use log::info;
use std::sync::Arc;

pub const MARKET_KEY: &str = "market";
pub const OVERVIEW_KEY: &str = "overview";
pub const PORTFOLIO_KEY: &str = "portfolio";
pub const WATCHLIST_KEY: &str = "watchlist";

/// Which entity list a price lookup was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceScope {
    Portfolio,
    Watchlist,
}

impl PriceScope {
    fn prefix(self) -> &'static str {
        match self {
            PriceScope::Portfolio => "portfolio:prices:",
            PriceScope::Watchlist => "watchlist:prices:",
        }
    }
}

pub struct Caches {
    pub market: QueryCache<MarketSnapshot>,
    pub prices: QueryCache<PriceLookup>,
    pub detail: QueryCache<CoinDetail>,
    pub analysis: QueryCache<CoinAnalysis>,
    pub prediction: QueryCache<PredictionReport>,
    pub overview: QueryCache<MarketOverview>,
    pub holdings: QueryCache<Vec<Holding>>,
    pub watchlist: QueryCache<Vec<WatchlistEntry>>,
}

impl Caches {
    pub fn new(stale: &StaleWindows) -> Self {
        Self {
            market: QueryCache::new("market", stale.market),
            prices: QueryCache::new("prices", stale.prices),
            detail: QueryCache::new("coin detail", stale.detail),
            analysis: QueryCache::new("coin analysis", stale.analysis),
            prediction: QueryCache::new("prediction", stale.prediction),
            overview: QueryCache::new("overview", stale.overview),
            holdings: QueryCache::new("portfolio", stale.entities),
            watchlist: QueryCache::new("watchlist", stale.entities),
        }
    }
}

/// Shared handles behind every route: the two collaborators and the
/// query cache in front of them.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub insight: Arc<dyn InsightSource>,
    pub caches: Arc<Caches>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        insight: Arc<dyn InsightSource>,
        stale: &StaleWindows,
    ) -> Self {
        Self {
            store,
            insight,
            caches: Arc::new(Caches::new(stale)),
        }
    }

    pub async fn market(&self) -> Result<MarketSnapshot> {
        self.caches
            .market
            .get_or_fetch(MARKET_KEY, || insight::fetch_market(self.insight.as_ref()))
            .await
    }

    /// Fetches a new snapshot regardless of staleness and stores it.
    pub async fn refresh_market(&self) -> Result<usize> {
        let snapshot = insight::fetch_market(self.insight.as_ref()).await?;
        let count = snapshot.coins.len();
        self.caches.market.put(MARKET_KEY, snapshot).await;
        Ok(count)
    }

    pub async fn overview(&self) -> Result<MarketOverview> {
        self.caches
            .overview
            .get_or_fetch(OVERVIEW_KEY, || insight::fetch_overview(self.insight.as_ref()))
            .await
    }

    pub async fn coin_detail(&self, coin_id: &str) -> Result<CoinDetail> {
        self.caches
            .detail
            .get_or_fetch(&format!("coin:{}", coin_id), || {
                insight::fetch_coin_detail(self.insight.as_ref(), coin_id)
            })
            .await
    }

    pub async fn coin_analysis(&self, coin_id: &str) -> Result<CoinAnalysis> {
        self.caches
            .analysis
            .get_or_fetch(&format!("analysis:{}", coin_id), || {
                insight::fetch_analysis(self.insight.as_ref(), coin_id)
            })
            .await
    }

    pub async fn prediction(&self, coin: &str) -> Result<PredictionReport> {
        self.caches
            .prediction
            .get_or_fetch(&format!("prediction:{}", coin), || {
                insight::fetch_prediction(self.insight.as_ref(), coin)
            })
            .await
    }

    /// Quotes for a set of coin ids. Keyed by the id set, so a changed
    /// portfolio or watchlist never reuses a lookup made for another set.
    pub async fn prices(&self, scope: PriceScope, coin_ids: &[String]) -> Result<PriceLookup> {
        let mut ids = coin_ids.to_vec();
        ids.sort();
        ids.dedup();
        let key = format!("{}{}", scope.prefix(), ids.join(","));
        self.caches
            .prices
            .get_or_fetch(&key, || insight::fetch_prices(self.insight.as_ref(), &ids))
            .await
    }

    pub async fn holdings(&self) -> Result<Vec<Holding>> {
        self.caches
            .holdings
            .get_or_fetch(PORTFOLIO_KEY, || db::list_holdings(self.store.as_ref()))
            .await
    }

    pub async fn watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        self.caches
            .watchlist
            .get_or_fetch(WATCHLIST_KEY, || db::list_watchlist(self.store.as_ref()))
            .await
    }

    pub async fn add_holding(&self, holding: NewHolding) -> Result<Holding> {
        let created = db::add_holding(self.store.as_ref(), holding).await?;
        self.invalidate_portfolio().await;
        Ok(created)
    }

    pub async fn remove_holding(&self, id: &str) -> Result<()> {
        db::remove_holding(self.store.as_ref(), id).await?;
        self.invalidate_portfolio().await;
        Ok(())
    }

    pub async fn toggle_watchlist(&self, coin: NewWatchlistEntry) -> Result<ToggleOutcome> {
        let outcome = watchlist::toggle(self.store.as_ref(), coin).await?;
        self.invalidate_watchlist().await;
        Ok(outcome)
    }

    pub async fn remove_watchlist_entry(&self, id: &str) -> Result<()> {
        db::remove_watchlist_entry(self.store.as_ref(), id).await?;
        self.invalidate_watchlist().await;
        Ok(())
    }

    async fn invalidate_portfolio(&self) {
        self.caches.holdings.invalidate(PORTFOLIO_KEY).await;
        self.caches
            .prices
            .invalidate_prefix(PriceScope::Portfolio.prefix())
            .await;
        info!("Invalidated portfolio queries.");
    }

    async fn invalidate_watchlist(&self) {
        self.caches.watchlist.invalidate(WATCHLIST_KEY).await;
        self.caches
            .prices
            .invalidate_prefix(PriceScope::Watchlist.prefix())
            .await;
        info!("Invalidated watchlist queries.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::insight::testing::ScriptedInsight;
    use serde_json::json;

    fn state_with(insight: ScriptedInsight) -> (AppState, Arc<ScriptedInsight>) {
        let insight = Arc::new(insight);
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            insight.clone(),
            &StaleWindows::default(),
        );
        (state, insight)
    }

    fn btc() -> NewHolding {
        NewHolding {
            coin_id: "bitcoin".into(),
            coin_name: "Bitcoin".into(),
            coin_symbol: "btc".into(),
            coin_image: String::new(),
            quantity: 1.0,
            buy_price: 50000.0,
        }
    }

    #[tokio::test]
    async fn mutations_invalidate_the_holdings_list() {
        let (state, _) = state_with(ScriptedInsight::new());
        assert!(state.holdings().await.unwrap().is_empty());

        let created = state.add_holding(btc()).await.unwrap();
        assert_eq!(state.holdings().await.unwrap().len(), 1);

        state.remove_holding(&created.id).await.unwrap();
        assert!(state.holdings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn price_lookups_are_cached_per_id_set() {
        let (state, insight) =
            state_with(ScriptedInsight::new().reply("price data", json!({"bitcoin": 70000})));
        let ids = vec!["bitcoin".to_string()];

        state.prices(PriceScope::Portfolio, &ids).await.unwrap();
        state.prices(PriceScope::Portfolio, &ids).await.unwrap();
        assert_eq!(insight.request_count(), 1);

        state.add_holding(btc()).await.unwrap();
        let lookup = state.prices(PriceScope::Portfolio, &ids).await.unwrap();
        assert_eq!(lookup["bitcoin"].price, 70000.0);
        assert_eq!(insight.request_count(), 2);
    }

    #[tokio::test]
    async fn refresh_replaces_cached_market() {
        let (state, insight) = state_with(
            ScriptedInsight::new().reply("top 20", json!({"coins": [{"id": "bitcoin"}]})),
        );
        state.market().await.unwrap();
        assert_eq!(state.refresh_market().await.unwrap(), 1);
        state.market().await.unwrap();
        assert_eq!(insight.request_count(), 2);
    }
}
