//! Presentation outputs derived from the onboarding state.
//!
//! Screens carry data only; rendering is left to the embedding UI.

// self
use crate::{
	_prelude::*,
	auth::Email,
	onboarding::{LoadingPhase, Notice},
};

/// Steps shown on the token-setup screen, after "Go to Canvas Settings".
pub const TOKEN_INSTRUCTIONS: [&str; 5] = [
	"Scroll to \"Approved Integrations\"",
	"Click \"+ New Access Token\"",
	"Purpose: \"Integra Analysis\"",
	"Expiration: Leave blank (no expiration)",
	"Copy the token and paste below",
];

/// Upcoming features listed on the dashboard placeholder.
pub const DASHBOARD_NEXT_STEPS: [&str; 4] = [
	"Fetch your Canvas courses and assignments",
	"Calculate true weight for each assignment",
	"Show impact scenarios",
	"Display recommendations",
];

/// Screen the embedding UI should show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
	/// Spinner while an existence check runs.
	Loading(LoadingView),
	/// Login-link request form, or its "check your email" confirmation.
	Login(LoginView),
	/// Canvas token collection.
	TokenSetup(TokenSetupView),
	/// Placeholder dashboard.
	Dashboard(DashboardView),
}
impl Screen {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Screen::Loading(_) => "loading",
			Screen::Login(_) => "login",
			Screen::TokenSetup(_) => "token_setup",
			Screen::Dashboard(_) => "dashboard",
		}
	}
}

/// Loading spinner contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadingView {
	/// Spinner caption.
	pub message: &'static str,
}
impl LoadingView {
	pub(crate) fn for_phase(phase: LoadingPhase) -> Self {
		let message = match phase {
			LoadingPhase::Initializing => "Loading Integra...",
			LoadingPhase::Validating => "Checking for existing token...",
		};

		Self { message }
	}
}

/// Login screen contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginView {
	/// Address the last login link went to; `Some` switches to the confirmation view.
	pub link_sent_to: Option<Email>,
	/// Notice to display, if any.
	pub notice: Option<Notice>,
}

/// Token-setup screen contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSetupView {
	/// Signed-in user's address.
	pub email: Email,
	/// Canvas settings page for the first instruction step.
	pub settings_url: Url,
	/// Remaining instruction steps.
	pub instructions: &'static [&'static str],
	/// Whether a submission is being validated or saved.
	pub submitting: bool,
	/// Notice to display, if any.
	pub notice: Option<Notice>,
}

/// Dashboard placeholder contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardView {
	/// Signed-in user's address.
	pub email: Email,
	/// Upcoming features.
	pub next_steps: &'static [&'static str],
}
