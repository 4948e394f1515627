//! Credential store contract and built-in store implementations.
//!
//! The store is a flat string key/value space. The session manager only ever writes the refresh
//! credential under [`ServiceConfig::refresh_key`](crate::config::ServiceConfig::refresh_key), and
//! a logout wipes every key.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Durable key/value persistence for credential strings.
///
/// Calls are synchronous so the session manager can apply a store effect and commit the next
/// session inside one critical section.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if present.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Removes every key.
	fn clear(&self) -> Result<(), StoreError>;
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
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert_eq!(error.kind(), ErrorKind::Storage);
		assert!(error.to_string().contains("disk unavailable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn stores_are_usable_as_trait_objects() {
		let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());

		store.set("refreshToken", "r-1").expect("Memory store set should succeed.");

		assert_eq!(
			store.get("refreshToken").expect("Memory store get should succeed."),
			Some("r-1".into())
		);
	}
}
