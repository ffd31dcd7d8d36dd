//! Engine configuration.
//!
//! Reads the `[series]`, `[cache]` and `[refill]` sections from a
//! [`ConfigPort`] and validates every key before any work starts. Missing
//! keys take their defaults.

use crate::domain::bar_series::{BarSeries, RefillPolicy};
use crate::domain::cache::{EvictionPolicy, MIN_LRU_CAPACITY, SeriesCache};
use crate::domain::error::SamtaError;
use crate::domain::series::DEFAULT_MAX_LEN;
use crate::ports::config_port::ConfigPort;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window bound for bar series and derived series; 0 is unbounded.
    pub series_max_len: usize,
    pub cache_policy: EvictionPolicy,
    pub refill: RefillPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            series_max_len: DEFAULT_MAX_LEN,
            cache_policy: EvictionPolicy::Unbounded,
            refill: RefillPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SamtaError> {
        let series_max_len = read_count(config, "series", "max_len", DEFAULT_MAX_LEN as u64, 0)?;
        // stepping needs the previous bar alongside the current one
        if series_max_len == 1 {
            return Err(invalid(
                "series",
                "max_len",
                "must be 0 (unbounded) or at least 2".into(),
            ));
        }
        Ok(Self {
            series_max_len: series_max_len as usize,
            cache_policy: read_cache_policy(config)?,
            refill: read_refill_policy(config)?,
        })
    }

    pub fn build_cache(&self) -> Result<SeriesCache, SamtaError> {
        let mut cache = SeriesCache::with_policy(self.cache_policy)?;
        cache.set_max_len(self.series_max_len);
        Ok(cache)
    }

    /// Empty bar series carrying the configured window bound and refill policy.
    pub fn bar_series(&self) -> BarSeries {
        let mut bars = BarSeries::with_max_len(self.series_max_len);
        bars.set_refill_policy(self.refill.clone());
        bars
    }
}

fn read_cache_policy(config: &dyn ConfigPort) -> Result<EvictionPolicy, SamtaError> {
    let policy = config
        .get_string("cache", "policy")
        .map(|p| p.trim().to_ascii_lowercase());
    match policy.as_deref() {
        None | Some("unbounded") => Ok(EvictionPolicy::Unbounded),
        Some("lru") => {
            if config.get_string("cache", "capacity").is_none() {
                return Err(SamtaError::ConfigMissing {
                    section: "cache".into(),
                    key: "capacity".into(),
                });
            }
            let capacity = read_count(config, "cache", "capacity", 0, MIN_LRU_CAPACITY as u64)?;
            Ok(EvictionPolicy::Lru {
                capacity: capacity as usize,
            })
        }
        Some(other) => Err(invalid(
            "cache",
            "policy",
            format!("expected unbounded or lru, found '{other}'"),
        )),
    }
}

fn read_refill_policy(config: &dyn ConfigPort) -> Result<RefillPolicy, SamtaError> {
    let max_attempts = read_count(config, "refill", "max_attempts", 1, 1)?;
    let max_attempts = u32::try_from(max_attempts)
        .map_err(|_| invalid("refill", "max_attempts", "value is too large".into()))?;
    let timeout_ms = read_count(config, "refill", "timeout_ms", DEFAULT_TIMEOUT_MS, 0)?;
    let backoff_ms = read_count(config, "refill", "backoff_ms", 0, 0)?;
    Ok(RefillPolicy {
        max_attempts,
        timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        backoff: Duration::from_millis(backoff_ms),
    })
}

/// Non-negative integer at least `min`, or `default` when the key is absent.
fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: u64,
    min: u64,
) -> Result<u64, SamtaError> {
    if config.get_string(section, key).is_none() {
        return Ok(default);
    }
    let value = config
        .get_int(section, key)
        .ok_or_else(|| invalid(section, key, "must be an integer".into()))?;
    if value < min as i64 {
        return Err(invalid(section, key, format!("must be at least {min}")));
    }
    Ok(value as u64)
}

fn invalid(section: &str, key: &str, reason: String) -> SamtaError {
    SamtaError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
