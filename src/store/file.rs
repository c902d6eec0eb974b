//! File-backed [`CredentialStore`] that snapshots every record to a JSON document.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, UserId},
	store::{CredentialStore, StoreError, StoreFuture},
};

/// Persists credential records to a JSON file after each write.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<UserId, CredentialRecord>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist_locked(&self, contents: &HashMap<UserId, CredentialRecord>) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let mut records: Vec<_> = contents.values().collect();

		records.sort_by(|a, b| a.user_id.cmp(&b.user_id));

		let serialized =
			serde_json::to_vec_pretty(&records).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credential snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

			file.write_all(&serialized).map_err(|e| backend("write", &tmp_path, e))?;
			file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| backend("replace", &self.path, e))
	}
}
impl CredentialStore for FileStore {
	fn fetch<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Option<CredentialRecord>> {
		Box::pin(async move { Ok(self.inner.read().get(user_id).cloned()) })
	}

	fn upsert(&self, record: CredentialRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let previous = guard.insert(record.user_id.clone(), record.clone());

			if let Err(e) = self.persist_locked(&guard) {
				// Keep memory and disk in agreement when the write does not land.
				match previous {
					Some(previous) => guard.insert(record.user_id, previous),
					None => guard.remove(&record.user_id),
				};

				return Err(e);
			}

			Ok(())
		})
	}
}

fn load_snapshot(path: &Path) -> Result<HashMap<UserId, CredentialRecord>, StoreError> {
	if !path.exists() {
		return Ok(HashMap::new());
	}

	let bytes = fs::read(path).map_err(|e| backend("read", path, e))?;

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(HashMap::new());
	}

	let records: Vec<CredentialRecord> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(records.into_iter().map(|record| (record.user_id.clone(), record)).collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
	}

	Ok(())
}

fn backend(action: &str, path: &Path, error: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {error}", path.display()) }
}
