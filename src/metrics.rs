//! Metrics helpers and per-manager telemetry bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

#[cfg(feature = "metrics")]
const METRIC_LOOKUPS_TOTAL: &str = "credential_cache_lookups_total";
#[cfg(feature = "metrics")]
const METRIC_HITS_TOTAL: &str = "credential_cache_hits_total";
#[cfg(feature = "metrics")]
const METRIC_ISSUES_TOTAL: &str = "credential_cache_issues_total";
#[cfg(feature = "metrics")]
const METRIC_MISSES_TOTAL: &str = "credential_cache_misses_total";
#[cfg(feature = "metrics")]
const METRIC_REFRESH_TOTAL: &str = "credential_cache_refresh_total";
#[cfg(feature = "metrics")]
const METRIC_REFRESH_DURATION: &str = "credential_cache_refresh_duration_seconds";
#[cfg(feature = "metrics")]
const METRIC_REFRESH_ERRORS: &str = "credential_cache_refresh_errors_total";

/// Thread-safe metrics accumulator for a single manager instance.
#[derive(Debug, Default)]
pub struct ManagerMetrics {
	total_lookups: AtomicU64,
	cache_hits: AtomicU64,
	issues: AtomicU64,
	refresh_successes: AtomicU64,
	refresh_errors: AtomicU64,
	last_refresh_micros: AtomicU64,
}
impl ManagerMetrics {
	/// Create a new metrics accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a lookup served from the store without any remote call.
	pub fn record_hit(&self) {
		self.total_lookups.fetch_add(1, Ordering::Relaxed);
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a lookup that required an initial issuance.
	pub fn record_issue(&self) {
		self.total_lookups.fetch_add(1, Ordering::Relaxed);
		self.issues.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a lookup that fell through to a remote refresh.
	pub fn record_miss(&self) {
		self.total_lookups.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a successful refresh and its latency.
	pub fn record_refresh_success(&self, duration: Duration) {
		self.refresh_successes.fetch_add(1, Ordering::Relaxed);
		self.last_refresh_micros.store(duration.as_micros() as u64, Ordering::Relaxed);
	}

	/// Record a failed refresh attempt.
	pub fn record_refresh_error(&self) {
		self.refresh_errors.fetch_add(1, Ordering::Relaxed);
	}

	/// Take a point-in-time snapshot for status reporting.
	pub fn snapshot(&self) -> ManagerMetricsSnapshot {
		ManagerMetricsSnapshot {
			total_lookups: self.total_lookups.load(Ordering::Relaxed),
			cache_hits: self.cache_hits.load(Ordering::Relaxed),
			issues: self.issues.load(Ordering::Relaxed),
			refresh_successes: self.refresh_successes.load(Ordering::Relaxed),
			refresh_errors: self.refresh_errors.load(Ordering::Relaxed),
			last_refresh_micros: match self.last_refresh_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}
}

/// Read-only snapshot of per-manager telemetry counters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagerMetricsSnapshot {
	/// Total number of token lookups observed.
	pub total_lookups: u64,
	/// Count of lookups served from the store.
	pub cache_hits: u64,
	/// Count of lookups that performed an initial issuance.
	pub issues: u64,
	/// Count of successful refresh operations.
	pub refresh_successes: u64,
	/// Count of refresh attempts that resulted in errors.
	pub refresh_errors: u64,
	/// Microsecond latency of the most recent refresh.
	pub last_refresh_micros: Option<u64>,
}
impl ManagerMetricsSnapshot {
	/// Convenience method to compute the cache hit rate.
	pub fn hit_rate(&self) -> f64 {
		if self.total_lookups == 0 {
			0.0
		} else {
			self.cache_hits as f64 / self.total_lookups as f64
		}
	}
}

/// Record a lookup served from the store, labelled by slot key.
pub fn record_lookup_hit(slot: &str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(METRIC_LOOKUPS_TOTAL, "slot" => slot.to_owned()).increment(1);
		metrics::counter!(METRIC_HITS_TOTAL, "slot" => slot.to_owned()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = slot;
}

/// Record a lookup that required an initial issuance.
pub fn record_lookup_issue(slot: &str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(METRIC_LOOKUPS_TOTAL, "slot" => slot.to_owned()).increment(1);
		metrics::counter!(METRIC_ISSUES_TOTAL, "slot" => slot.to_owned()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = slot;
}

/// Record a lookup that fell through to a remote refresh.
pub fn record_lookup_miss(slot: &str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(METRIC_LOOKUPS_TOTAL, "slot" => slot.to_owned()).increment(1);
		metrics::counter!(METRIC_MISSES_TOTAL, "slot" => slot.to_owned()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = slot;
}

/// Record a successful refresh attempt along with its latency.
pub fn record_refresh_success(slot: &str, duration: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(METRIC_REFRESH_TOTAL, "slot" => slot.to_owned(), "status" => "success")
			.increment(1);
		metrics::histogram!(METRIC_REFRESH_DURATION, "slot" => slot.to_owned())
			.record(duration.as_secs_f64());
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (slot, duration);
}

/// Record a failed refresh attempt.
pub fn record_refresh_error(slot: &str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(METRIC_REFRESH_TOTAL, "slot" => slot.to_owned(), "status" => "error")
			.increment(1);
		metrics::counter!(METRIC_REFRESH_ERRORS, "slot" => slot.to_owned()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = slot;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reflects_recorded_events() {
		let metrics = ManagerMetrics::new();

		metrics.record_hit();
		metrics.record_hit();
		metrics.record_issue();
		metrics.record_miss();
		metrics.record_refresh_success(Duration::from_millis(20));
		metrics.record_refresh_error();

		let snapshot = metrics.snapshot();

		assert_eq!(snapshot.total_lookups, 4);
		assert_eq!(snapshot.cache_hits, 2);
		assert_eq!(snapshot.issues, 1);
		assert_eq!(snapshot.refresh_successes, 1);
		assert_eq!(snapshot.refresh_errors, 1);
		assert_eq!(snapshot.last_refresh_micros, Some(20_000));
	}

	#[test]
	fn hit_rate_handles_empty_counters() {
		let metrics = ManagerMetrics::new();

		assert_eq!(metrics.snapshot().hit_rate(), 0.0);

		metrics.record_hit();
		metrics.record_issue();

		assert!((metrics.snapshot().hit_rate() - 0.5).abs() < f64::EPSILON);
	}
}
