// self
use crate::{_prelude::*, obs::StepKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStep<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStep<F> = F;

/// A span builder used by onboarding steps.
#[derive(Clone, Debug)]
pub struct StepSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StepSpan {
	/// Creates a new span tagged with the provided step kind + stage.
	pub fn new(kind: StepKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("integra_onboarding.step", step = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStep<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a failure that the caller turns into a fail-closed result instead of propagating.
pub fn log_swallowed_failure(kind: StepKind, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(step = kind.as_str(), error = %error, "step failed closed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Logs an onboarding state transition.
pub fn log_transition(from: &'static str, to: &'static str, epoch: u64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(from, to, epoch, "onboarding transition");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (from, to, epoch);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ValidationError;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = StepSpan::new(StepKind::TokenValidation, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn logging_helpers_accept_any_error() {
		log_swallowed_failure(StepKind::CredentialLookup, &ValidationError::BlankToken);
		log_transition("loading", "ready", 1);
	}
}
