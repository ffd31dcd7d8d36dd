//! Memoization cache for derived series.
//!
//! Every derivation resolves a [`Signature`] to a cached `TimeSeries<f64>` and
//! extends it forward; repeated calls with the same inputs and parameters land
//! on the same entry. The cache is an ordinary value owned by the caller and
//! passed `&mut` into each derivation.

use crate::domain::error::SamtaError;
use crate::domain::ohlcv::Field;
use crate::domain::series::{DEFAULT_MAX_LEN, SeriesId, TimeSeries, Timestamp};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Smallest capacity accepted for [`EvictionPolicy::Lru`].
pub const MIN_LRU_CAPACITY: usize = 16;

/// Scalar parameter of a derivation, as it participates in the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Int(i64),
    /// Bit pattern of an `f64`; `-0.0` is stored as `0.0`.
    Float(u64),
    Flag(bool),
    Field(Field),
}

impl Param {
    pub fn float(value: f64) -> Self {
        let value = if value == 0.0 { 0.0 } else { value };
        Param::Float(value.to_bits())
    }
}

impl From<usize> for Param {
    fn from(n: usize) -> Self {
        Param::Int(n as i64)
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::float(value)
    }
}

impl From<bool> for Param {
    fn from(flag: bool) -> Self {
        Param::Flag(flag)
    }
}

impl From<Field> for Param {
    fn from(field: Field) -> Self {
        Param::Field(field)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(n) => write!(f, "{n}"),
            Param::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Param::Flag(flag) => write!(f, "{flag}"),
            Param::Field(field) => write!(f, "{field}"),
        }
    }
}

/// Identity of a derived series: what was computed, from which inputs, with
/// which parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub kind: &'static str,
    pub inputs: Vec<SeriesId>,
    pub params: Vec<Param>,
}

impl Signature {
    pub fn new(
        kind: &'static str,
        inputs: impl IntoIterator<Item = SeriesId>,
        params: impl IntoIterator<Item = Param>,
    ) -> Self {
        Self {
            kind,
            inputs: inputs.into_iter().collect(),
            params: params.into_iter().collect(),
        }
    }
}

/// Renders as `rsi(#3, 14)`.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        let mut sep = "";
        for input in &self.inputs {
            write!(f, "{sep}{input}")?;
            sep = ", ";
        }
        for param in &self.params {
            write!(f, "{sep}{param}")?;
            sep = ", ";
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    #[default]
    Unbounded,
    /// Keep at most `capacity` derived series, dropping the least recently
    /// resolved one when a new series is created.
    ///
    /// Entries resolved inside the current [`SeriesCache::in_pass`] are never
    /// dropped, so a pass whose working set is larger than `capacity` grows
    /// the cache past it until a later miss outside that set.
    Lru { capacity: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Source nodes walked by catch-up traversals.
    pub nodes_visited: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub(crate) struct CacheEntry {
    pub(crate) series: TimeSeries<f64>,
    /// Last source timestamp the traversal consumed.
    pub(crate) watermark: Option<Timestamp>,
    // None for caller-registered series, which are never evicted
    signature: Option<Signature>,
    last_used: u64,
}

#[derive(Debug)]
pub struct SeriesCache {
    signatures: HashMap<Signature, SeriesId>,
    entries: HashMap<SeriesId, CacheEntry>,
    policy: EvictionPolicy,
    max_len: usize,
    clock: u64,
    // clock value at which the outermost running pass started
    pass_start: Option<u64>,
    stats: CacheStats,
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesCache {
    pub fn new() -> Self {
        Self {
            signatures: HashMap::new(),
            entries: HashMap::new(),
            policy: EvictionPolicy::Unbounded,
            max_len: DEFAULT_MAX_LEN,
            clock: 0,
            pass_start: None,
            stats: CacheStats::default(),
        }
    }

    pub fn with_policy(policy: EvictionPolicy) -> Result<Self, SamtaError> {
        if let EvictionPolicy::Lru { capacity } = policy {
            if capacity < MIN_LRU_CAPACITY {
                return Err(SamtaError::Config {
                    name: "cache".into(),
                    reason: format!(
                        "lru capacity {capacity} is below the minimum of {MIN_LRU_CAPACITY}"
                    ),
                });
            }
        }
        Ok(Self {
            policy,
            ..Self::new()
        })
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Window bound given to derived series created from now on.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry, caller-registered series included, and resets stats.
    pub fn clear(&mut self) {
        self.signatures.clear();
        self.entries.clear();
        self.clock = 0;
        self.stats = CacheStats::default();
    }

    /// Runs `f` as one evaluation pass: no entry resolved during it is evicted
    /// before it returns. Nested passes join the outermost one.
    pub fn in_pass<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.pass_start.is_some() {
            return f(self);
        }
        self.pass_start = Some(self.clock + 1);
        let result = f(self);
        self.pass_start = None;
        result
    }

    /// Hands a caller-built series to the cache so derivations can read it.
    /// Registered series are never evicted.
    pub fn insert_series(&mut self, series: TimeSeries<f64>) -> SeriesId {
        let id = series.id();
        self.entries.insert(
            id,
            CacheEntry {
                series,
                watermark: None,
                signature: None,
                last_used: 0,
            },
        );
        id
    }

    pub fn contains(&self, id: SeriesId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn lookup(&self, signature: &Signature) -> Option<SeriesId> {
        self.signatures.get(signature).copied()
    }

    pub fn series(&self, id: SeriesId) -> Option<&TimeSeries<f64>> {
        self.entries.get(&id).map(|e| &e.series)
    }

    /// Mutable access to a caller-registered series. Derived series are only
    /// written by their own traversal, so this returns `None` for them.
    pub fn series_mut(&mut self, id: SeriesId) -> Option<&mut TimeSeries<f64>> {
        self.entries
            .get_mut(&id)
            .filter(|e| e.signature.is_none())
            .map(|e| &mut e.series)
    }

    /// Value at the series' cursor.
    pub fn value(&self, id: SeriesId) -> Option<f64> {
        self.series(id).and_then(|s| s.value().copied())
    }

    pub fn value_at(&self, id: SeriesId, timestamp: Timestamp) -> Option<f64> {
        self.series(id).and_then(|s| s.get(timestamp).copied())
    }

    pub(crate) fn source(&self, id: SeriesId) -> Result<&TimeSeries<f64>, SamtaError> {
        self.series(id)
            .ok_or(SamtaError::UnknownSeries { id: id.get() })
    }

    /// Returns the entry for `signature`, creating an empty one on a miss.
    pub(crate) fn resolve(&mut self, signature: Signature) -> SeriesId {
        self.clock += 1;
        if let Some(&id) = self.signatures.get(&signature) {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.last_used = self.clock;
                self.stats.hits += 1;
                return id;
            }
        }

        self.stats.misses += 1;
        self.evict_for_insert();
        let series = TimeSeries::with_max_len(self.max_len);
        let id = series.id();
        debug!(signature = %signature, series = %id, "new derived series");
        self.signatures.insert(signature.clone(), id);
        self.entries.insert(
            id,
            CacheEntry {
                series,
                watermark: None,
                signature: Some(signature),
                last_used: self.clock,
            },
        );
        id
    }

    fn evict_for_insert(&mut self) {
        let EvictionPolicy::Lru { capacity } = self.policy else {
            return;
        };
        let protected_from = self.pass_start.unwrap_or(u64::MAX);
        let mut derived = self
            .entries
            .values()
            .filter(|e| e.signature.is_some())
            .count();
        while derived >= capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(_, e)| e.signature.is_some() && e.last_used < protected_from)
                .min_by_key(|(_, e)| e.last_used)
                .map(|(&id, _)| id);
            let Some(entry) = victim.and_then(|id| self.entries.remove(&id)) else {
                return;
            };
            if let Some(signature) = entry.signature {
                debug!(signature = %signature, "evicting derived series");
                self.signatures.remove(&signature);
            }
            self.stats.evictions += 1;
            derived -= 1;
        }
    }

    /// Moves an entry out so its series can be written while other entries are
    /// read. Must be paired with [`SeriesCache::restore`].
    pub(crate) fn take(&mut self, id: SeriesId) -> Result<CacheEntry, SamtaError> {
        self.entries
            .remove(&id)
            .ok_or(SamtaError::UnknownSeries { id: id.get() })
    }

    pub(crate) fn restore(&mut self, id: SeriesId, entry: CacheEntry) {
        self.entries.insert(id, entry);
    }

    pub(crate) fn record_visits(&mut self, visited: u64) {
        self.stats.nodes_visited += visited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(i: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + i * 300, 0).unwrap()
    }

    fn sig(kind: &'static str, n: usize) -> Signature {
        Signature::new(kind, [SeriesId::fresh()], [Param::from(n)])
    }

    #[test]
    fn signature_display_lists_inputs_then_params() {
        let src = SeriesId::fresh();
        let signature = Signature::new("kc", [src], [Param::from(20usize), Param::from(1.5), true.into()]);
        assert_eq!(signature.to_string(), format!("kc({src}, 20, 1.5, true)"));
    }

    #[test]
    fn float_params_key_on_bits() {
        assert_eq!(Param::float(-0.0), Param::float(0.0));
        assert_ne!(Param::float(0.1 + 0.2), Param::float(0.3));
        assert_eq!(Param::float(0.3), Param::float(0.3));
    }

    #[test]
    fn resolve_hits_on_same_signature() {
        let mut cache = SeriesCache::new();
        let signature = sig("sma", 3);
        let a = cache.resolve(signature.clone());
        let b = cache.resolve(signature.clone());
        assert_eq!(a, b);
        assert_eq!(cache.lookup(&signature), Some(a));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn derived_series_inherit_cache_window() {
        let mut cache = SeriesCache::new();
        cache.set_max_len(7);
        let id = cache.resolve(sig("ema", 2));
        assert_eq!(cache.series(id).unwrap().max_len(), 7);
    }

    #[test]
    fn registered_series_are_writable_and_readable() {
        let mut cache = SeriesCache::new();
        let id = cache.insert_series(TimeSeries::new());
        let series = cache.series_mut(id).unwrap();
        series.set(ts(0), 4.0);
        series.set_current(ts(0));
        assert_eq!(cache.value(id), Some(4.0));
        assert_eq!(cache.value_at(id, ts(0)), Some(4.0));
        assert_eq!(cache.value_at(id, ts(1)), None);

        let derived = cache.resolve(sig("sma", 2));
        assert!(cache.series_mut(derived).is_none());
    }

    #[test]
    fn lru_capacity_has_a_floor() {
        let err = SeriesCache::with_policy(EvictionPolicy::Lru { capacity: 4 }).unwrap_err();
        assert!(matches!(err, SamtaError::Config { .. }));
    }

    #[test]
    fn lru_evicts_least_recent_derived_entry_only() {
        let mut cache = SeriesCache::with_policy(EvictionPolicy::Lru {
            capacity: MIN_LRU_CAPACITY,
        })
        .unwrap();
        let pinned = cache.insert_series(TimeSeries::new());
        let signatures: Vec<Signature> = (0..MIN_LRU_CAPACITY).map(|n| sig("sma", n)).collect();
        let ids: Vec<SeriesId> = signatures.iter().map(|s| cache.resolve(s.clone())).collect();

        // refresh the oldest so the second one becomes the victim
        cache.resolve(signatures[0].clone());
        cache.resolve(sig("sma", 99));

        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.contains(ids[0]));
        assert!(!cache.contains(ids[1]));
        assert!(cache.lookup(&signatures[1]).is_none());
        assert!(cache.contains(pinned));
    }

    #[test]
    fn pass_protects_its_own_entries() {
        let mut cache = SeriesCache::with_policy(EvictionPolicy::Lru {
            capacity: MIN_LRU_CAPACITY,
        })
        .unwrap();
        let old = cache.resolve(sig("ema", 1));

        let signatures: Vec<Signature> = (0..20).map(|n| sig("sma", n)).collect();
        let ids: Vec<SeriesId> = cache.in_pass(|cache| {
            signatures.iter().map(|s| cache.resolve(s.clone())).collect()
        });

        // only the entry from before the pass could make room
        assert_eq!(cache.stats().evictions, 1);
        assert!(!cache.contains(old));
        assert!(ids.iter().all(|&id| cache.contains(id)));
        assert_eq!(cache.len(), 20);

        // the next miss outside a pass trims back under capacity
        cache.resolve(sig("rma", 3));
        assert_eq!(cache.len(), MIN_LRU_CAPACITY);
        assert!(!cache.contains(ids[0]));
        assert!(cache.contains(ids[19]));
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = SeriesCache::new();
        cache.insert_series(TimeSeries::new());
        let signature = sig("rma", 14);
        cache.resolve(signature.clone());
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.lookup(&signature).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn take_and_restore_round_trip() {
        let mut cache = SeriesCache::new();
        let id = cache.resolve(sig("sum", 2));
        let entry = cache.take(id).unwrap();
        assert!(!cache.contains(id));
        assert!(matches!(cache.take(id), Err(SamtaError::UnknownSeries { .. })));
        cache.restore(id, entry);
        assert!(cache.contains(id));
    }
}
