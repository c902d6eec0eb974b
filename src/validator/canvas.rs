//! Canvas LMS validator that resolves `/api/v1/users/self` with the submitted token.

// self
use crate::{
	_prelude::*,
	auth::{RemoteUserId, TokenSecret},
	error::ConfigError,
	http::ReqwestHttpClient,
	obs::{self, StepKind, StepOutcome, StepSpan},
	platform::PlatformDescriptor,
	validator::{self, CredentialValidator, ValidatorFuture},
};

const ENDPOINT: &str = "profile";

#[derive(Deserialize)]
struct Profile {
	id: i64,
}

/// Validates Canvas personal access tokens with one bounded `GET`.
#[derive(Clone)]
pub struct CanvasValidator {
	http: ReqwestHttpClient,
	profile_url: Url,
	timeout: std::time::Duration,
}
impl CanvasValidator {
	/// Builds a validator with a descriptor-bound HTTP client.
	pub fn new(descriptor: &PlatformDescriptor) -> Result<Self, ConfigError> {
		Self::with_http_client(descriptor, ReqwestHttpClient::for_descriptor(descriptor)?)
	}

	/// Builds a validator that reuses an existing HTTP client. The descriptor's timeout is
	/// still applied to every request.
	pub fn with_http_client(
		descriptor: &PlatformDescriptor,
		http: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			http,
			profile_url: descriptor.profile_url()?,
			timeout: descriptor.request_timeout_std(),
		})
	}

	async fn resolve(&self, token: &TokenSecret) -> Result<RemoteUserId> {
		validator::ensure_present(token)?;

		let request = self
			.http
			.get(self.profile_url.clone())
			.timeout(self.timeout)
			.bearer_auth(token.expose())
			.header(reqwest::header::ACCEPT, "application/json");
		let reply = self.http.send(ENDPOINT, request).await?;

		match reply.status {
			200..=299 => {
				let profile: Profile = reply.parse_json(ENDPOINT)?;

				Ok(RemoteUserId(profile.id))
			},
			400..=499 => Err(Error::InvalidCredential { status: Some(reply.status) }),
			_ => Err(reply.unexpected(ENDPOINT).into()),
		}
	}
}
impl CredentialValidator for CanvasValidator {
	fn check<'a>(&'a self, token: &'a TokenSecret) -> ValidatorFuture<'a, RemoteUserId> {
		Box::pin(async move {
			let span = StepSpan::new(StepKind::TokenValidation, "canvas_check");

			obs::record_step_outcome(StepKind::TokenValidation, StepOutcome::Attempt);

			let result = span.instrument(self.resolve(token)).await;

			obs::record_result(StepKind::TokenValidation, &result);

			result
		})
	}
}
impl Debug for CanvasValidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CanvasValidator")
			.field("profile_url", &self.profile_url.as_str())
			.field("timeout", &self.timeout)
			.finish()
	}
}
