// self
use crate::obs::{StepKind, StepOutcome};

/// Records a step outcome via the global metrics recorder (when enabled).
pub fn record_step_outcome(kind: StepKind, outcome: StepOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"integra_onboarding_step_total",
			"step" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records entry into an onboarding state via the global metrics recorder (when enabled).
pub fn record_transition(state: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("integra_onboarding_transition_total", "state" => state).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = state;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_step_outcome(StepKind::TokenUpsert, StepOutcome::Failure);
		record_transition("token_required");
	}
}
