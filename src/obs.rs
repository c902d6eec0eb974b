//! Optional observability helpers for onboarding steps.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `integra_onboarding.step` with the
//!   `step` and `stage` (call site) fields, plus `warn`-level events for failures that are
//!   swallowed by fail-closed paths.
//! - Enable `metrics` to increment the `integra_onboarding_step_total` counter for every
//!   attempt/success/failure, labeled by `step` + `outcome`, and the
//!   `integra_onboarding_transition_total` counter labeled by the state entered.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Asynchronous steps performed while onboarding a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepKind {
	/// Resolving the persisted session.
	SessionFetch,
	/// Requesting a one-time login link.
	LoginLink,
	/// Redeeming a one-time login link.
	LoginRedeem,
	/// Rotating the session's access token.
	SessionRefresh,
	/// Looking up the stored credential.
	CredentialLookup,
	/// Checking a credential against the grading platform.
	TokenValidation,
	/// Persisting a validated credential.
	TokenUpsert,
	/// Signing out locally and remotely.
	SignOut,
}
impl StepKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StepKind::SessionFetch => "session_fetch",
			StepKind::LoginLink => "login_link",
			StepKind::LoginRedeem => "login_redeem",
			StepKind::SessionRefresh => "session_refresh",
			StepKind::CredentialLookup => "credential_lookup",
			StepKind::TokenValidation => "token_validation",
			StepKind::TokenUpsert => "token_upsert",
			StepKind::SignOut => "sign_out",
		}
	}
}
impl Display for StepKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepOutcome {
	/// Entry to a step.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or swallowed into a fail-closed state.
	Failure,
}
impl StepOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StepOutcome::Attempt => "attempt",
			StepOutcome::Success => "success",
			StepOutcome::Failure => "failure",
		}
	}
}
impl Display for StepOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the final outcome of a step result.
pub(crate) fn record_result<T, E>(kind: StepKind, result: &Result<T, E>) {
	match result {
		Ok(_) => record_step_outcome(kind, StepOutcome::Success),
		Err(_) => record_step_outcome(kind, StepOutcome::Failure),
	}
}
