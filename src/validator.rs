//! Grading-platform credential validation.
//!
//! [`CredentialValidator::check`] keeps the distinct failure kind (rejected credential,
//! upstream hiccup, transport failure) while [`CredentialValidator::validate`] collapses
//! every failure into an invalid [`CredentialCheck`] after logging it. Neither retries.

#[cfg(feature = "reqwest")] pub mod canvas;

#[cfg(feature = "reqwest")] pub use canvas::CanvasValidator;

// self
use crate::{
	_prelude::*,
	auth::{RemoteUserId, TokenSecret},
	error::ValidationError,
	obs::{self, StepKind},
};

/// Boxed future returned by [`CredentialValidator::check`].
pub type ValidatorFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Outcome of a collapsed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialCheck {
	/// Whether the grading platform accepted the credential.
	pub valid: bool,
	/// Identity of the credential's owner on the grading platform, when accepted.
	pub remote_user_id: Option<RemoteUserId>,
}
impl CredentialCheck {
	/// Accepted credential owned by `remote_user_id`.
	pub fn accepted(remote_user_id: RemoteUserId) -> Self {
		Self { valid: true, remote_user_id: Some(remote_user_id) }
	}

	/// Rejected (or unverifiable) credential.
	pub fn rejected() -> Self {
		Self { valid: false, remote_user_id: None }
	}
}

/// Confirms a bearer credential against the grading platform.
pub trait CredentialValidator
where
	Self: Send + Sync,
{
	/// Issues a single validation request, returning the owner's remote identity.
	fn check<'a>(&'a self, token: &'a TokenSecret) -> ValidatorFuture<'a, RemoteUserId>;

	/// Same request as [`check`](Self::check), with every failure reported as invalid.
	fn validate<'a>(
		&'a self,
		token: &'a TokenSecret,
	) -> Pin<Box<dyn Future<Output = CredentialCheck> + 'a + Send>> {
		Box::pin(async move {
			match self.check(token).await {
				Ok(remote_user_id) => CredentialCheck::accepted(remote_user_id),
				Err(e) => {
					obs::log_swallowed_failure(StepKind::TokenValidation, &e);

					CredentialCheck::rejected()
				},
			}
		})
	}
}

/// Rejects blank credentials before anything leaves the process.
pub fn ensure_present(token: &TokenSecret) -> Result<(), ValidationError> {
	if token.is_blank() { Err(ValidationError::BlankToken) } else { Ok(()) }
}
