//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, UserId},
	store::{CredentialStore, StoreFuture},
};

type RecordMap = Arc<RwLock<HashMap<UserId, CredentialRecord>>>;

/// Keeps credential records in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(RecordMap);
impl MemoryStore {
	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` if no record is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Reads a record synchronously, for assertions in tests and demos.
	pub fn get(&self, user_id: &UserId) -> Option<CredentialRecord> {
		self.0.read().get(user_id).cloned()
	}
}
impl CredentialStore for MemoryStore {
	fn fetch<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Option<CredentialRecord>> {
		let map = self.0.clone();
		let user_id = user_id.to_owned();

		Box::pin(async move { Ok(map.read().get(&user_id).cloned()) })
	}

	fn upsert(&self, record: CredentialRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(record.user_id.clone(), record);

			Ok(())
		})
	}
}
