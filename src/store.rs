//! Storage contracts, the fail-closed credential adapter, and built-in store backends.

pub mod file;
pub mod memory;
#[cfg(feature = "reqwest")] pub mod rest;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "reqwest")] pub use rest::RestStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, RemoteUserId, TokenSecret, UserId},
	obs::{self, StepKind, StepOutcome, StepSpan},
};

/// Boxed future returned by [`CredentialStore`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for credential records keyed by [`UserId`].
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the record owned by `user_id`, if present.
	fn fetch<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Option<CredentialRecord>>;

	/// Inserts or replaces the record for `record.user_id` (last write wins).
	fn upsert(&self, record: CredentialRecord) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Records could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Front door the onboarding machine uses to read and write credentials.
///
/// Reads fail closed: [`get_token`](Self::get_token) maps both "not found" and backend
/// errors to `None` after logging the error, while [`lookup`](Self::lookup) keeps them
/// apart. Writes always surface their failure.
#[derive(Clone)]
pub struct CredentialStoreAdapter {
	store: Arc<dyn CredentialStore>,
}
impl CredentialStoreAdapter {
	/// Wraps a backend.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self { store }
	}

	/// Returns the stored record, or `None` when it is absent or the read failed.
	pub async fn get_token(&self, user_id: &UserId) -> Option<CredentialRecord> {
		match self.lookup(user_id).await {
			Ok(record) => record,
			Err(e) => {
				obs::log_swallowed_failure(StepKind::CredentialLookup, &e);

				None
			},
		}
	}

	/// Single keyed read that preserves the difference between "absent" and "failed".
	pub async fn lookup(&self, user_id: &UserId) -> Result<Option<CredentialRecord>, StoreError> {
		let span = StepSpan::new(StepKind::CredentialLookup, "store_adapter_lookup");

		obs::record_step_outcome(StepKind::CredentialLookup, StepOutcome::Attempt);

		let result = span.instrument(self.store.fetch(user_id)).await;

		obs::record_result(StepKind::CredentialLookup, &result);

		result
	}

	/// Stores `token` for `user_id`, stamping `updated_at` with the current clock.
	pub async fn upsert_token(
		&self,
		user_id: &UserId,
		token: TokenSecret,
		remote_user_id: RemoteUserId,
	) -> Result<CredentialRecord, StoreError> {
		let span = StepSpan::new(StepKind::TokenUpsert, "store_adapter_upsert");

		obs::record_step_outcome(StepKind::TokenUpsert, StepOutcome::Attempt);

		let result = span
			.instrument(async {
				let record = CredentialRecord::builder(user_id.clone())
					.external_token(token.expose())
					.external_user_id(remote_user_id)
					.updated_at(OffsetDateTime::now_utc())
					.build()
					.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

				self.store.upsert(record.clone()).await?;

				Ok(record)
			})
			.await;

		obs::record_result(StepKind::TokenUpsert, &result);

		result
	}
}
impl Debug for CredentialStoreAdapter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStoreAdapter").finish_non_exhaustive()
	}
}
