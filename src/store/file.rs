//! JSON-file [`CredentialStore`] for CLIs and long-running agents.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialState,
	store::{CredentialStore, StoreError, StoreFuture},
};

/// Persists credentials to a JSON file, replacing it atomically on every save.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	lock: Arc<Mutex<()>>,
}
impl FileStore {
	/// Opens a store at the provided path, creating parent directories on demand.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, lock: Default::default() })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn load_now(&self) -> Result<Option<CredentialState>, StoreError> {
		let _guard = self.lock.lock();
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", self.path.display()),
		})
	}

	fn save_now(&self, state: &CredentialState) -> Result<(), StoreError> {
		let _guard = self.lock.lock();

		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(state).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize credentials: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn clear_now(&self) -> Result<(), StoreError> {
		let _guard = self.lock.lock();

		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			}),
		}
	}
}
impl CredentialStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialState>> {
		Box::pin(async move { self.load_now() })
	}

	fn save(&self, state: CredentialState) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.save_now(&state) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.clear_now() })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::time::{SystemTime, UNIX_EPOCH};
	// self
	use super::*;
	use crate::auth::TokenPair;

	fn temp_path(label: &str) -> PathBuf {
		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.expect("System clock should be after the Unix epoch.")
			.as_nanos();

		std::env::temp_dir()
			.join(format!("token-coordinator-{label}-{}-{nanos}", std::process::id()))
			.join("credentials.json")
	}

	#[tokio::test]
	async fn persists_across_instances() {
		let path = temp_path("persist");
		let store = FileStore::open(&path).expect("Store should open.");

		assert_eq!(store.load().await.expect("Missing file should load as empty."), None);

		let state = CredentialState::from(TokenPair::new("A1", "R1"));

		store.save(state.clone()).await.expect("Save should succeed.");

		let reopened = FileStore::open(&path).expect("Store should reopen.");

		assert_eq!(reopened.load().await.expect("Load should succeed."), Some(state));

		reopened.clear().await.expect("Clear should succeed.");
		reopened.clear().await.expect("Clearing twice should be a no-op.");

		assert!(!path.exists());

		let _ = fs::remove_dir_all(path.parent().expect("Temp path should have a parent."));
	}

	#[tokio::test]
	async fn corrupt_file_is_a_serialization_error() {
		let path = temp_path("corrupt");
		let store = FileStore::open(&path).expect("Store should open.");

		fs::write(&path, b"{not json").expect("Fixture write should succeed.");

		let err = store.load().await.expect_err("Corrupt file must not load.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		let _ = fs::remove_dir_all(path.parent().expect("Temp path should have a parent."));
	}
}
