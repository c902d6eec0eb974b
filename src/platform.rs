//! Remote platform configuration shared by every HTTP adapter.
//!
//! [`PlatformDescriptor`] captures the grading-platform base URL, the backend-as-a-service
//! endpoint and publishable key, the credential table name, the login-link redirect target,
//! and the request timeout applied to every outbound call. Descriptors are assembled through
//! [`PlatformDescriptorBuilder`], which enforces HTTPS (loopback hosts may use plain HTTP
//! for local development) and a positive timeout, and derive `Serialize`/`Deserialize` so
//! deployments can load them from JSON.

/// Builder API for assembling platform descriptors.
pub mod builder;

pub use builder::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Canvas instance used when the builder is not told otherwise.
pub const DEFAULT_GRADING_BASE_URL: &str = "https://canvas.oneschoolglobal.com";
/// Record table holding credential rows.
pub const DEFAULT_CREDENTIAL_TABLE: &str = "user_tokens";
/// Upper bound applied to each outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(10);

/// Backend-as-a-service endpoint set (auth API and record tables).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoint {
	/// Project URL, e.g. `https://<project>.supabase.co`.
	pub url: Url,
	/// Publishable (anon) key sent as the `apikey` header.
	pub api_key: TokenSecret,
	/// Table holding credential rows.
	pub credential_table: String,
}

/// Immutable platform descriptor consumed by the session, validator, and store adapters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
	/// Grading platform (Canvas) base URL.
	pub grading_base_url: Url,
	/// Backend-as-a-service endpoint.
	pub backend: BackendEndpoint,
	/// Target embedded in emailed login links.
	pub redirect_url: Url,
	/// Per-request timeout.
	pub request_timeout: Duration,
}
impl PlatformDescriptor {
	/// Creates a new builder.
	pub fn builder() -> PlatformDescriptorBuilder {
		PlatformDescriptorBuilder::new()
	}

	/// Canvas "self profile" endpoint used to validate tokens.
	pub fn profile_url(&self) -> Result<Url, ConfigError> {
		join_endpoint(&self.grading_base_url, "api/v1/users/self", "profile")
	}

	/// Canvas settings page where users mint access tokens.
	pub fn settings_url(&self) -> Result<Url, ConfigError> {
		join_endpoint(&self.grading_base_url, "profile/settings", "settings")
	}

	/// Auth API endpoint under `auth/v1/`.
	pub fn auth_url(&self, path: &str) -> Result<Url, ConfigError> {
		join_endpoint(&self.backend.url, &format!("auth/v1/{path}"), "auth")
	}

	/// REST endpoint for the credential table.
	pub fn credential_table_url(&self) -> Result<Url, ConfigError> {
		join_endpoint(
			&self.backend.url,
			&format!("rest/v1/{}", self.backend.credential_table),
			"credential table",
		)
	}

	/// Timeout converted for transports that take [`std::time::Duration`].
	pub fn request_timeout_std(&self) -> StdDuration {
		self.request_timeout.unsigned_abs()
	}
}

fn join_endpoint(base: &Url, path: &str, endpoint: &'static str) -> Result<Url, ConfigError> {
	let mut base = base.clone();

	if !base.path().ends_with('/') {
		let with_slash = format!("{}/", base.path());

		base.set_path(&with_slash);
	}

	base.join(path).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}
