//! Stored grading-platform credential records and their builder.

// self
use crate::{
	_prelude::*,
	auth::{RemoteUserId, TokenSecret, UserId},
};

/// Errors produced by [`CredentialRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialRecordBuilderError {
	/// Issued when no token value (or a blank one) was provided.
	#[error("External token is required.")]
	MissingToken,
	/// Issued when the grading-platform identity was not supplied.
	#[error("External user id is required.")]
	MissingExternalUserId,
}

/// Grading-platform credential stored for a single local user.
///
/// At most one record exists per [`UserId`]; writes replace the previous record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
	/// Local user owning the credential (unique key).
	pub user_id: UserId,
	/// Canvas personal access token; callers must avoid logging it.
	pub external_token: TokenSecret,
	/// Identity of the user on the grading platform.
	pub external_user_id: RemoteUserId,
	/// Instant of the last write.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl CredentialRecord {
	/// Returns a builder for the provided owner.
	pub fn builder(user_id: UserId) -> CredentialRecordBuilder {
		CredentialRecordBuilder::new(user_id)
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("user_id", &self.user_id)
			.field("external_token", &"<redacted>")
			.field("external_user_id", &self.external_user_id)
			.field("updated_at", &self.updated_at)
			.finish()
	}
}

/// Builder for [`CredentialRecord`].
#[derive(Clone, Debug)]
pub struct CredentialRecordBuilder {
	user_id: UserId,
	external_token: Option<TokenSecret>,
	external_user_id: Option<RemoteUserId>,
	updated_at: Option<OffsetDateTime>,
}
impl CredentialRecordBuilder {
	fn new(user_id: UserId) -> Self {
		Self { user_id, external_token: None, external_user_id: None, updated_at: None }
	}

	/// Provides the token value.
	pub fn external_token(mut self, token: impl Into<String>) -> Self {
		self.external_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the grading-platform identity.
	pub fn external_user_id(mut self, id: impl Into<RemoteUserId>) -> Self {
		self.external_user_id = Some(id.into());

		self
	}

	/// Overrides the write instant (defaults to the current clock at build time).
	pub fn updated_at(mut self, instant: OffsetDateTime) -> Self {
		self.updated_at = Some(instant);

		self
	}

	/// Consumes the builder and produces a [`CredentialRecord`].
	pub fn build(self) -> Result<CredentialRecord, CredentialRecordBuilderError> {
		let external_token = self
			.external_token
			.filter(|token| !token.is_blank())
			.ok_or(CredentialRecordBuilderError::MissingToken)?;
		let external_user_id =
			self.external_user_id.ok_or(CredentialRecordBuilderError::MissingExternalUserId)?;

		Ok(CredentialRecord {
			user_id: self.user_id,
			external_token,
			external_user_id,
			updated_at: self.updated_at.unwrap_or_else(OffsetDateTime::now_utc),
		})
	}
}
