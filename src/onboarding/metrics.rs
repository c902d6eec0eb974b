//! In-process counters kept by each onboarding machine.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing one onboarding machine's lifetime.
#[derive(Debug, Default)]
pub struct OnboardingMetrics {
	transitions: AtomicU64,
	resets: AtomicU64,
	submissions: AtomicU64,
	rejected: AtomicU64,
	failed_saves: AtomicU64,
	discarded: AtomicU64,
}
impl OnboardingMetrics {
	/// Returns the number of state changes.
	pub fn transitions(&self) -> u64 {
		self.transitions.load(Ordering::Relaxed)
	}

	/// Returns the number of hard resets (sign-out, lost session, user switch).
	pub fn resets(&self) -> u64 {
		self.resets.load(Ordering::Relaxed)
	}

	/// Returns the number of non-blank token submissions.
	pub fn submissions(&self) -> u64 {
		self.submissions.load(Ordering::Relaxed)
	}

	/// Returns the number of submissions the grading platform refused.
	pub fn rejected_submissions(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	/// Returns the number of validated tokens that could not be stored.
	pub fn failed_saves(&self) -> u64 {
		self.failed_saves.load(Ordering::Relaxed)
	}

	/// Returns the number of async results dropped because a reset happened meanwhile.
	pub fn discarded_results(&self) -> u64 {
		self.discarded.load(Ordering::Relaxed)
	}

	pub(crate) fn record_transition(&self) {
		self.transitions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reset(&self) {
		self.resets.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_submission(&self) {
		self.submissions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejection(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failed_save(&self) {
		self.failed_saves.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_discard(&self) {
		self.discarded.fetch_add(1, Ordering::Relaxed);
	}
}
