// src/watchlist.rs
use crate::db::{self, EntityStore};
use crate::error::Result;
use crate::models::{NewWatchlistEntry, WatchlistEntry};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Add,
    /// Remove the stored entry with this id.
    Remove(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub coin_id: String,
    pub watchlisted: bool,
}

pub fn is_watchlisted(entries: &[WatchlistEntry], coin_id: &str) -> bool {
    entries.iter().any(|e| e.coin_id == coin_id)
}

pub fn plan_toggle(entries: &[WatchlistEntry], coin_id: &str) -> Toggle {
    match entries.iter().find(|e| e.coin_id == coin_id) {
        Some(existing) => Toggle::Remove(existing.id.clone()),
        None => Toggle::Add,
    }
}

pub async fn toggle(store: &dyn EntityStore, coin: NewWatchlistEntry) -> Result<ToggleOutcome> {
    let entries = db::list_watchlist(store).await?;
    let watchlisted = match plan_toggle(&entries, &coin.coin_id) {
        Toggle::Remove(id) => {
            db::remove_watchlist_entry(store, &id).await?;
            false
        }
        Toggle::Add => {
            db::add_watchlist_entry(store, coin.clone()).await?;
            true
        }
    };
    Ok(ToggleOutcome {
        coin_id: coin.coin_id,
        watchlisted,
    })
}
