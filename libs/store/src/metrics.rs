//! Per-Store operation metrics (spec §4.3, expanded per SPEC_FULL §10.5
//! from the reference `proxystore/store/stats.py`).
//!
//! Disabled by default. When enabled, recording sits on the hot path: each
//! counter is a pair of atomics (`calls`, `nanos`) updated with `Relaxed`
//! ordering, so a reader may observe a slightly stale total but never a
//! torn one (no single counter is updated by more than one atomic op).
//! Per-key object sizes and timings are kept in a `DashMap` so recording
//! never blocks on a single Store-wide lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use proxystore_connectors::Key;

/// Fixed set of timers the reference implementation tracks per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Connector,
    Serialize,
    Deserialize,
    FactoryResolve,
    FactoryCall,
    Total,
}

impl TimerKind {
    fn name(&self) -> &'static str {
        match self {
            TimerKind::Connector => "connector",
            TimerKind::Serialize => "serialize",
            TimerKind::Deserialize => "deserialize",
            TimerKind::FactoryResolve => "factory.resolve",
            TimerKind::FactoryCall => "factory.call",
            TimerKind::Total => "total",
        }
    }
}

#[derive(Debug, Default)]
struct Counter {
    calls: AtomicU64,
    nanos: AtomicU64,
}

impl Counter {
    fn record(&self, d: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.nanos.fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            total: Duration::from_nanos(self.nanos.load(Ordering::Relaxed)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub calls: u64,
    pub total: Duration,
}

/// Records timings, cache hit/miss counts, and object sizes for one Store.
/// A no-op `StoreMetrics::disabled()` instance costs one branch per call.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    enabled: bool,
    timers: DashMap<(&'static str, Key), Counter>,
    sizes: DashMap<Key, usize>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl StoreMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&self, kind: TimerKind, key: &Key, duration: Duration) {
        if !self.enabled {
            return;
        }
        self.timers
            .entry((kind.name(), key.clone()))
            .or_default()
            .record(duration);
    }

    pub fn record_size(&self, key: &Key, size_bytes: usize) {
        if !self.enabled {
            return;
        }
        self.sizes.insert(key.clone(), size_bytes);
    }

    pub fn record_cache_hit(&self) {
        if self.enabled {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_miss(&self) {
        if self.enabled {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn timer(&self, kind: TimerKind, key: &Key) -> Option<TimerSnapshot> {
        self.timers
            .get(&(kind.name(), key.clone()))
            .map(|c| c.snapshot())
    }

    pub fn object_size(&self, key: &Key) -> Option<usize> {
        self.sizes.get(key).map(|v| *v)
    }
}

/// RAII guard that records elapsed time into a [`StoreMetrics`] timer on
/// drop, so a timed block reports its duration even if it returns early
/// via `?`.
pub struct TimerGuard<'a> {
    metrics: &'a StoreMetrics,
    kind: TimerKind,
    key: Key,
    start: Instant,
}

impl<'a> TimerGuard<'a> {
    pub fn start(metrics: &'a StoreMetrics, kind: TimerKind, key: Key) -> Self {
        Self {
            metrics,
            kind,
            key,
            start: Instant::now(),
        }
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.metrics.record(self.kind, &self.key, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxystore_connectors::LocalKey;
    use std::thread::sleep;

    fn key() -> Key {
        Key::Local(LocalKey(1))
    }

    #[test]
    fn disabled_metrics_record_nothing() {
        let metrics = StoreMetrics::new(false);
        metrics.record(TimerKind::Total, &key(), Duration::from_millis(1));
        metrics.record_cache_hit();
        assert_eq!(metrics.timer(TimerKind::Total, &key()), None);
        assert_eq!(metrics.cache_hits(), 0);
    }

    #[test]
    fn enabled_metrics_accumulate_calls() {
        let metrics = StoreMetrics::new(true);
        metrics.record(TimerKind::Connector, &key(), Duration::from_millis(1));
        metrics.record(TimerKind::Connector, &key(), Duration::from_millis(1));
        let snap = metrics.timer(TimerKind::Connector, &key()).unwrap();
        assert_eq!(snap.calls, 2);
    }

    #[test]
    fn timer_guard_records_on_drop() {
        let metrics = StoreMetrics::new(true);
        {
            let _guard = TimerGuard::start(&metrics, TimerKind::Total, key());
            sleep(Duration::from_millis(1));
        }
        let snap = metrics.timer(TimerKind::Total, &key()).unwrap();
        assert_eq!(snap.calls, 1);
        assert!(snap.total >= Duration::from_millis(1));
    }

    #[test]
    fn cache_hit_and_miss_counters_are_independent() {
        let metrics = StoreMetrics::new(true);
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        assert_eq!(metrics.cache_hits(), 2);
        assert_eq!(metrics.cache_misses(), 1);
    }
}
