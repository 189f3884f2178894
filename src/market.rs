// src/market.rs
use crate::models::Coin;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const MOVERS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    MarketCap,
    Price,
    Change,
}

impl SortKey {
    fn field(self, coin: &Coin) -> f64 {
        match self {
            SortKey::MarketCap => coin.market_cap,
            SortKey::Price => coin.current_price,
            SortKey::Change => coin.price_change_percentage_24h,
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Case-insensitive substring match on name or symbol. Blank matches all.
pub fn matches(coin: &Coin, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || coin.name.to_lowercase().contains(&query)
        || coin.symbol.to_lowercase().contains(&query)
}

/// Filtered grid, sorted descending on `key`. Ties keep input order.
pub fn filter_and_sort<'a>(coins: &'a [Coin], query: &str, key: SortKey) -> Vec<&'a Coin> {
    let mut grid: Vec<&Coin> = coins.iter().filter(|c| matches(c, query)).collect();
    grid.sort_by(|a, b| descending(key.field(a), key.field(b)));
    grid
}

pub fn top_gainers(coins: &[Coin]) -> Vec<&Coin> {
    let mut ranked: Vec<&Coin> = coins.iter().collect();
    ranked.sort_by(|a, b| {
        descending(a.price_change_percentage_24h, b.price_change_percentage_24h)
    });
    ranked.truncate(MOVERS);
    ranked
}

pub fn top_losers(coins: &[Coin]) -> Vec<&Coin> {
    let mut ranked: Vec<&Coin> = coins.iter().collect();
    ranked.sort_by(|a, b| {
        descending(b.price_change_percentage_24h, a.price_change_percentage_24h)
    });
    ranked.truncate(MOVERS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(id: &str, symbol: &str, price: f64, cap: f64, change: f64) -> Coin {
        Coin {
            id: id.into(),
            symbol: symbol.into(),
            name: format!("{}{}", id[..1].to_uppercase(), &id[1..]),
            image: String::new(),
            current_price: price,
            market_cap: cap,
            market_cap_rank: None,
            total_volume: 0.0,
            price_change_percentage_24h: change,
            sparkline_in_7d: None,
        }
    }

    fn market() -> Vec<Coin> {
        vec![
            coin("bitcoin", "btc", 67500.0, 1.32e12, 2.5),
            coin("ethereum", "eth", 3500.0, 4.2e11, -1.2),
            coin("solana", "sol", 150.0, 7.0e10, 8.1),
            coin("dogecoin", "doge", 0.15, 2.1e10, -6.4),
            coin("cardano", "ada", 0.45, 1.6e10, 0.3),
        ]
    }

    fn ids(coins: &[&Coin]) -> Vec<String> {
        coins.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn change_sorts_by_signed_value() {
        let coins = vec![
            coin("a", "a", 1.0, 1.0, -5.0),
            coin("b", "b", 1.0, 1.0, 10.0),
            coin("c", "c", 1.0, 1.0, 0.0),
        ];
        let sorted = filter_and_sort(&coins, "", SortKey::Change);
        let changes: Vec<f64> = sorted.iter().map(|c| c.price_change_percentage_24h).collect();
        assert_eq!(changes, vec![10.0, 0.0, -5.0]);
    }

    #[test]
    fn sorts_by_cap_and_price_descending() {
        let coins = market();
        assert_eq!(
            ids(&filter_and_sort(&coins, "", SortKey::Price)),
            vec!["bitcoin", "ethereum", "solana", "cardano", "dogecoin"]
        );
        assert_eq!(
            ids(&filter_and_sort(&coins, "", SortKey::MarketCap)),
            vec!["bitcoin", "ethereum", "solana", "dogecoin", "cardano"]
        );
    }

    #[test]
    fn query_matches_name_or_symbol_case_insensitively() {
        let coins = market();
        assert_eq!(ids(&filter_and_sort(&coins, "ETH", SortKey::MarketCap)), vec!["ethereum"]);
        assert_eq!(ids(&filter_and_sort(&coins, "Doge", SortKey::MarketCap)), vec!["dogecoin"]);
        assert_eq!(ids(&filter_and_sort(&coins, "o", SortKey::Price)).len(), 4);
        assert!(filter_and_sort(&coins, "zzz", SortKey::Price).is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let coins = vec![
            coin("x", "x", 5.0, 1.0, 0.0),
            coin("y", "y", 5.0, 1.0, 0.0),
            coin("z", "z", 5.0, 1.0, 0.0),
        ];
        assert_eq!(ids(&filter_and_sort(&coins, "", SortKey::Price)), vec!["x", "y", "z"]);
    }

    #[test]
    fn movers_ignore_the_search_filter() {
        let coins = market();
        let _grid = filter_and_sort(&coins, "bitcoin", SortKey::Price);
        assert_eq!(ids(&top_gainers(&coins)), vec!["solana", "bitcoin", "cardano"]);
        assert_eq!(ids(&top_losers(&coins)), vec!["dogecoin", "ethereum", "cardano"]);
    }

    #[test]
    fn movers_of_short_lists() {
        let coins = vec![coin("a", "a", 1.0, 1.0, 1.0), coin("b", "b", 1.0, 1.0, -1.0)];
        assert_eq!(top_gainers(&coins).len(), 2);
        assert_eq!(top_losers(&coins).len(), 2);
        assert!(top_gainers(&[]).is_empty());
    }

    #[test]
    fn sort_key_wire_names() {
        let key: SortKey = serde_json::from_str("\"market_cap\"").unwrap();
        assert_eq!(key, SortKey::MarketCap);
        let key: SortKey = serde_json::from_str("\"change\"").unwrap();
        assert_eq!(key, SortKey::Change);
    }
}
