//! Persistence contract and built-in stores mirroring the coordinator's credentials.
//!
//! The coordinator stays the only writer: it saves after every successful rotation or
//! sign-in and clears after every termination, so a restarted process can resume the
//! session through [`crate::coordinator::TokenCoordinator::restore`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::CredentialState};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Loads the persisted credentials, if any.
	fn load(&self) -> StoreFuture<'_, Option<CredentialState>>;

	/// Persists or replaces the credentials.
	fn save(&self, state: CredentialState) -> StoreFuture<'_, ()>;

	/// Removes any persisted credentials.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
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

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_coordinator_error_with_source() {
		let store_error = StoreError::Backend { message: "keychain locked".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("keychain locked"));

		let source = StdError::source(&error)
			.expect("Coordinator error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
