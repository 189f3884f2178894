// src/db.rs
use crate::error::{DashboardError, Result};
use crate::models::{
    Holding, NewHolding, NewWatchlistEntry, TransactionType, WatchlistEntry,
};
use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use scylla::{query::Query, Session, SessionBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Portfolio,
    Watchlist,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Portfolio => "Portfolio",
            Collection::Watchlist => "Watchlist",
        }
    }
}

/// A stored entity: the store-assigned id plus the JSON fields it was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub body: Value,
}

impl Record {
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let mut fields = self.body.as_object().cloned().unwrap_or_default();
        fields.insert("id".into(), Value::String(self.id.clone()));
        match serde_json::from_value(Value::Object(fields)) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed record {}: {}", self.id, e);
                None
            }
        }
    }
}

/// Generic list/create/delete over named collections.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<Record>>;
    async fn create(&self, collection: Collection, body: Value) -> Result<Record>;
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn create(&self, collection: Collection, body: Value) -> Result<Record> {
        let record = Record {
            id: Uuid::new_v4().to_string(),
            body,
        };
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection).or_default();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(DashboardError::NotFound(format!(
                "{} record {}",
                collection.name(),
                id
            )));
        }
        Ok(())
    }
}

pub struct ScyllaStore {
    session: Session,
}

fn store_err(e: impl std::fmt::Display) -> DashboardError {
    DashboardError::Store(e.to_string())
}

impl ScyllaStore {
    pub async fn init(node: &str) -> Result<Self> {
        let session = SessionBuilder::new()
            .known_node(node)
            .build()
            .await
            .map_err(store_err)?;

        session.query("CREATE KEYSPACE IF NOT EXISTS crypto_dashboard WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}", &[]).await.map_err(store_err)?;
        session.query("CREATE TABLE IF NOT EXISTS crypto_dashboard.entities (collection TEXT, id TEXT, created_at BIGINT, body TEXT, PRIMARY KEY (collection, id))", &[]).await.map_err(store_err)?;

        info!("Successfully connected to ScyllaDB at {}.", node);
        Ok(Self { session })
    }
}

#[async_trait]
impl EntityStore for ScyllaStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        let query = Query::new(
            "SELECT id, created_at, body FROM crypto_dashboard.entities WHERE collection = ?",
        );
        let result = self
            .session
            .query(query, (collection.name(),))
            .await
            .map_err(store_err)?;

        let mut rows: Vec<(i64, Record)> = result
            .rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| {
                let id = row.columns[0].as_ref()?.as_text()?.to_string();
                let created_at = row.columns[1]
                    .as_ref()
                    .and_then(|v| v.as_bigint())
                    .unwrap_or_default();
                let text = row.columns[2].as_ref()?.as_text()?;
                match serde_json::from_str(text) {
                    Ok(body) => Some((created_at, Record { id, body })),
                    Err(e) => {
                        warn!("Unreadable body for {} {}: {}", collection.name(), id, e);
                        None
                    }
                }
            })
            .collect();
        // Clustering order is by id; present records in creation order.
        rows.sort_by_key(|(created_at, _)| *created_at);
        Ok(rows.into_iter().map(|(_, record)| record).collect())
    }

    async fn create(&self, collection: Collection, body: Value) -> Result<Record> {
        let record = Record {
            id: Uuid::new_v4().to_string(),
            body,
        };
        let query = Query::new(
            "INSERT INTO crypto_dashboard.entities (collection, id, created_at, body) VALUES (?, ?, ?, ?)",
        );
        self.session
            .query(
                query,
                (
                    collection.name(),
                    record.id.as_str(),
                    Utc::now().timestamp_millis(),
                    serde_json::to_string(&record.body)?,
                ),
            )
            .await
            .map_err(store_err)?;
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let query =
            Query::new("DELETE FROM crypto_dashboard.entities WHERE collection = ? AND id = ?");
        self.session
            .query(query, (collection.name(), id))
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DashboardError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

pub async fn list_holdings(store: &dyn EntityStore) -> Result<Vec<Holding>> {
    let records = store.list(Collection::Portfolio).await?;
    Ok(records.iter().filter_map(|r| r.decode()).collect())
}

pub async fn add_holding(store: &dyn EntityStore, holding: NewHolding) -> Result<Holding> {
    require_text("coin_id", &holding.coin_id)?;
    require_text("coin_name", &holding.coin_name)?;
    if !(holding.quantity.is_finite() && holding.quantity > 0.0) {
        return Err(DashboardError::InvalidInput(
            "quantity must be greater than zero".into(),
        ));
    }
    if !(holding.buy_price.is_finite() && holding.buy_price >= 0.0) {
        return Err(DashboardError::InvalidInput(
            "buy_price must not be negative".into(),
        ));
    }

    let body = json!({
        "coin_id": holding.coin_id,
        "coin_name": holding.coin_name,
        "coin_symbol": holding.coin_symbol,
        "coin_image": holding.coin_image,
        "quantity": holding.quantity,
        "buy_price": holding.buy_price,
        "buy_date": Utc::now().date_naive(),
        "transaction_type": TransactionType::Buy,
    });
    let record = store.create(Collection::Portfolio, body).await?;
    info!("Holding {} added for {}.", record.id, holding.coin_id);
    record
        .decode()
        .ok_or_else(|| DashboardError::Store("created holding could not be read back".into()))
}

pub async fn remove_holding(store: &dyn EntityStore, id: &str) -> Result<()> {
    store.delete(Collection::Portfolio, id).await?;
    info!("Holding {} removed.", id);
    Ok(())
}

pub async fn list_watchlist(store: &dyn EntityStore) -> Result<Vec<WatchlistEntry>> {
    let records = store.list(Collection::Watchlist).await?;
    Ok(records.iter().filter_map(|r| r.decode()).collect())
}

pub async fn add_watchlist_entry(
    store: &dyn EntityStore,
    entry: NewWatchlistEntry,
) -> Result<WatchlistEntry> {
    require_text("coin_id", &entry.coin_id)?;
    require_text("coin_name", &entry.coin_name)?;
    require_text("coin_symbol", &entry.coin_symbol)?;

    let record = store
        .create(Collection::Watchlist, serde_json::to_value(&entry)?)
        .await?;
    info!("{} added to watchlist.", entry.coin_id);
    record
        .decode()
        .ok_or_else(|| DashboardError::Store("created watchlist entry could not be read back".into()))
}

pub async fn remove_watchlist_entry(store: &dyn EntityStore, id: &str) -> Result<()> {
    store.delete(Collection::Watchlist, id).await?;
    info!("Watchlist entry {} removed.", id);
    Ok(())
}
