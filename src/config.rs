// src/config.rs
use log::{warn, LevelFilter};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

/// Staleness windows for every cached query key family.
#[derive(Debug, Clone)]
pub struct StaleWindows {
    pub market: Duration,
    pub prices: Duration,
    pub detail: Duration,
    pub analysis: Duration,
    pub prediction: Duration,
    pub overview: Duration,
    pub entities: Duration,
}

impl Default for StaleWindows {
    fn default() -> Self {
        Self {
            market: Duration::from_secs(60),
            prices: Duration::from_secs(60),
            detail: Duration::from_secs(30),
            analysis: Duration::from_secs(60),
            prediction: Duration::from_secs(120),
            overview: Duration::from_secs(300),
            entities: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub scylla_node: String,
    pub insight_api_url: String,
    pub insight_api_key: Option<String>,
    pub log_level: LevelFilter,
    pub refresh_interval: Duration,
    pub stale: StaleWindows,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            store_backend: StoreBackend::Memory,
            scylla_node: "127.0.0.1:9042".into(),
            insight_api_url: "http://127.0.0.1:8787/v1/invoke".into(),
            insight_api_key: None,
            log_level: LevelFilter::Info,
            refresh_interval: Duration::from_secs(120),
            stale: StaleWindows::default(),
        }
    }
}

/// Logger level read ahead of [`Config::from_env`], so that the fallbacks
/// it reports reach an installed logger. Unparsable values are reported
/// again by `from_env` once logging is up.
pub fn log_level_from_env() -> LevelFilter {
    log_level_from(env::var("LOG_LEVEL").ok())
}

fn log_level_from(raw: Option<String>) -> LevelFilter {
    raw.and_then(|r| r.parse().ok())
        .unwrap_or(Config::default().log_level)
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let secs = |key: &str, default: Duration| -> Duration {
            parsed(&lookup, key, default.as_secs()).map_or(default, Duration::from_secs)
        };

        let store_backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("scylla") => StoreBackend::Scylla,
            Some(other) => {
                warn!("Unknown STORE_BACKEND {:?}, using in-memory store", other);
                StoreBackend::Memory
            }
        };

        Self {
            bind_addr: parsed(&lookup, "BIND_ADDR", defaults.bind_addr)
                .unwrap_or(defaults.bind_addr),
            store_backend,
            scylla_node: lookup("SCYLLA_NODE").unwrap_or(defaults.scylla_node),
            insight_api_url: lookup("INSIGHT_API_URL").unwrap_or(defaults.insight_api_url),
            insight_api_key: lookup("INSIGHT_API_KEY").filter(|k| !k.is_empty()),
            log_level: parsed(&lookup, "LOG_LEVEL", defaults.log_level)
                .unwrap_or(defaults.log_level),
            refresh_interval: non_zero(
                "REFRESH_INTERVAL_SECS",
                secs("REFRESH_INTERVAL_SECS", defaults.refresh_interval),
                defaults.refresh_interval,
            ),
            stale: StaleWindows {
                market: secs("MARKET_STALE_SECS", defaults.stale.market),
                prices: secs("PRICES_STALE_SECS", defaults.stale.prices),
                detail: secs("DETAIL_STALE_SECS", defaults.stale.detail),
                analysis: secs("ANALYSIS_STALE_SECS", defaults.stale.analysis),
                prediction: secs("PREDICTION_STALE_SECS", defaults.stale.prediction),
                overview: secs("OVERVIEW_STALE_SECS", defaults.stale.overview),
                entities: secs("ENTITY_STALE_SECS", defaults.stale.entities),
            },
        }
    }
}

fn non_zero(key: &str, value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        warn!("{} must be greater than zero, using {:?}", key, default);
        return default;
    }
    value
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable {}={:?}, using {:?}", key, raw, default);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3030)));
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.stale.market, Duration::from_secs(60));
        assert_eq!(config.stale.overview, Duration::from_secs(300));
        assert_eq!(config.refresh_interval, Duration::from_secs(120));
        assert!(config.insight_api_key.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("STORE_BACKEND", "scylla"),
            ("MARKET_STALE_SECS", "15"),
            ("LOG_LEVEL", "debug"),
            ("INSIGHT_API_KEY", "secret"),
        ]);
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.store_backend, StoreBackend::Scylla);
        assert_eq!(config.stale.market, Duration::from_secs(15));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.insight_api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("PRICES_STALE_SECS", "soon"),
            ("BIND_ADDR", "nowhere"),
            ("STORE_BACKEND", "postgres"),
        ]);
        assert_eq!(config.stale.prices, Duration::from_secs(60));
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3030)));
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn zero_refresh_interval_uses_default() {
        let config = config_from(&[
            ("REFRESH_INTERVAL_SECS", "0"),
            ("MARKET_STALE_SECS", "0"),
        ]);
        assert_eq!(config.refresh_interval, Duration::from_secs(120));
        assert_eq!(config.stale.market, Duration::ZERO);

        let config = config_from(&[("REFRESH_INTERVAL_SECS", "30")]);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn early_log_level_never_fails() {
        assert_eq!(log_level_from(None), LevelFilter::Info);
        assert_eq!(log_level_from(Some("warn".into())), LevelFilter::Warn);
        assert_eq!(log_level_from(Some("chatty".into())), LevelFilter::Info);

        let config = config_from(&[("LOG_LEVEL", "chatty")]);
        assert_eq!(config.log_level, LevelFilter::Info);
    }
}
