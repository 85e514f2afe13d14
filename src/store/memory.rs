//! Thread-safe in-memory [`CredentialStore`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::CredentialState,
	store::{CredentialStore, StoreFuture},
};

/// Keeps the last saved credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<CredentialState>>>);
impl MemoryStore {
	/// Creates a store pre-seeded with credentials.
	pub fn seeded(state: CredentialState) -> Self {
		Self(Arc::new(RwLock::new(Some(state))))
	}

	/// Returns the stored credentials without going through the async contract.
	pub fn snapshot(&self) -> Option<CredentialState> {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialState>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, state: CredentialState) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(state);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TokenPair;

	#[tokio::test]
	async fn save_load_clear() {
		let store = MemoryStore::default();

		assert_eq!(store.load().await.expect("Empty load should succeed."), None);

		let state = CredentialState::from(TokenPair::new("A1", "R1"));

		store.save(state.clone()).await.expect("Save should succeed.");

		assert_eq!(store.load().await.expect("Load should succeed."), Some(state));

		store.clear().await.expect("Clear should succeed.");

		assert_eq!(store.snapshot(), None);
	}
}
