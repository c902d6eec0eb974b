//! Onboarding states and the user-facing notices attached to them.

// self
use crate::_prelude::*;

/// What a [`OnboardingState::Loading`] machine is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingPhase {
	/// Resolving the persisted session.
	Initializing,
	/// Looking up the signed-in user's stored credential.
	Validating,
}

/// Derived onboarding state. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
	/// An existence check is in flight.
	Loading(LoadingPhase),
	/// No session; the login form is shown.
	Unauthenticated,
	/// Signed in without a stored credential.
	TokenRequired,
	/// Signed in with a stored credential.
	Ready,
}
impl OnboardingState {
	/// Returns a stable label suitable for logs, metrics, and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			OnboardingState::Loading(LoadingPhase::Initializing) => "initializing",
			OnboardingState::Loading(LoadingPhase::Validating) => "validating",
			OnboardingState::Unauthenticated => "unauthenticated",
			OnboardingState::TokenRequired => "token_required",
			OnboardingState::Ready => "ready",
		}
	}

	/// Returns `true` while an existence check is in flight.
	pub const fn is_loading(self) -> bool {
		matches!(self, OnboardingState::Loading(_))
	}
}
impl Default for OnboardingState {
	fn default() -> Self {
		OnboardingState::Loading(LoadingPhase::Initializing)
	}
}
impl Display for OnboardingState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Generic user-facing message. Detailed failure kinds stay in logs and returned errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
	/// A blank token was submitted.
	MissingToken,
	/// The grading platform refused the token (or could not be reached).
	InvalidToken,
	/// The token was valid but could not be stored.
	SaveFailed,
	/// The login form was submitted with an unusable address.
	InvalidEmail,
	/// The auth platform did not send the login link.
	LoginLinkFailed,
}
impl Notice {
	/// Message shown to the user.
	pub const fn message(self) -> &'static str {
		match self {
			Notice::MissingToken => "Please enter a Canvas token.",
			Notice::InvalidToken => "Invalid Canvas token. Please check and try again.",
			Notice::SaveFailed => "Failed to save token. Please try again.",
			Notice::InvalidEmail => "Please enter a valid email address.",
			Notice::LoginLinkFailed => "Failed to send the login link. Please try again.",
		}
	}
}
impl Display for Notice {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.message())
	}
}
