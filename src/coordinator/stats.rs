// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh elections and retries.
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	coalesced: AtomicU64,
	retries: AtomicU64,
}
impl CoordinatorMetrics {
	/// Returns the number of refresh runs started (one per election won).
	pub fn refresh_attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh runs that installed new credentials.
	pub fn refresh_successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh runs that terminated the session.
	pub fn refresh_failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many callers joined a refresh started by someone else.
	pub fn coalesced_waits(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Returns how many requests were re-dispatched after an expiry.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}
}
