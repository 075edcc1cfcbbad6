//! In-process metrics.
//!
//! With the `telemetry` feature enabled, samples land in one process-wide
//! registry readable through [`snapshot`]. Without it every recorder is a
//! no-op and [`snapshot`] is empty.

use std::collections::BTreeMap;

use serde::Serialize;

pub mod memory;
pub mod tags;
pub mod worker;

pub use memory::{MemoryInfo, system_memory};

/// Summary of one histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
}

impl HistogramSnapshot {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        }
    }

    fn record(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count = self.count.saturating_add(1);
        self.total = self.total.saturating_add(value);
    }
}

/// Point-in-time copy of every metric, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub counters: BTreeMap<&'static str, u64>,
    pub gauges: BTreeMap<&'static str, u64>,
    pub histograms: BTreeMap<&'static str, HistogramSnapshot>,
}

impl TelemetrySnapshot {
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.gauges.get(name).copied()
    }

    pub fn histogram(&self, name: &str) -> Option<HistogramSnapshot> {
        self.histograms.get(name).copied()
    }
}

#[inline]
pub fn increment_counter(name: &'static str, value: u64) {
    record(|metrics| {
        let counter = metrics.counters.entry(name).or_insert(0);
        *counter = counter.saturating_add(value);
    });
}

#[inline]
pub fn record_histogram(name: &'static str, value: u64) {
    record(|metrics| metrics.histograms.entry(name).or_default().record(value));
}

#[inline]
pub fn set_gauge(name: &'static str, value: u64) {
    record(|metrics| {
        metrics.gauges.insert(name, value);
    });
}

#[inline]
pub fn add_gauge(name: &'static str, delta: u64) {
    record(|metrics| {
        let gauge = metrics.gauges.entry(name).or_insert(0);
        *gauge = gauge.saturating_add(delta);
    });
}

/// Lowers a gauge, stopping at zero.
#[inline]
pub fn sub_gauge_saturating(name: &'static str, delta: u64) {
    record(|metrics| {
        let gauge = metrics.gauges.entry(name).or_insert(0);
        *gauge = gauge.saturating_sub(delta);
    });
}

pub fn snapshot() -> TelemetrySnapshot {
    #[cfg(feature = "telemetry")]
    {
        registry::with(|metrics| metrics.clone())
    }

    #[cfg(not(feature = "telemetry"))]
    {
        TelemetrySnapshot::default()
    }
}

#[cfg(feature = "telemetry")]
#[inline]
fn record(update: impl FnOnce(&mut TelemetrySnapshot)) {
    registry::with(update);
}

#[cfg(not(feature = "telemetry"))]
#[inline]
fn record(_update: impl FnOnce(&mut TelemetrySnapshot)) {}

#[cfg(feature = "telemetry")]
mod registry {
    use std::sync::{Mutex, OnceLock};

    use super::TelemetrySnapshot;

    static METRICS: OnceLock<Mutex<TelemetrySnapshot>> = OnceLock::new();

    pub(super) fn with<T>(f: impl FnOnce(&mut TelemetrySnapshot) -> T) -> T {
        let metrics = METRICS.get_or_init(Mutex::default);
        let mut guard = match metrics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}
