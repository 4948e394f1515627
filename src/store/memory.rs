//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreError},
};

type StoreMap = Arc<RwLock<HashMap<String, String>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
///
/// Clones share the same map, so a test can keep a handle while the manager owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Creates a store pre-populated with `entries`.
	pub fn with_entries<I, K, V>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let map = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

		Self(Arc::new(RwLock::new(map)))
	}

	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().clear();

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clones_share_state_and_clear_drops_every_key() {
		let store = MemoryStore::with_entries([("refreshToken", "r-1"), ("theme", "dark")]);
		let handle = store.clone();

		store.set("refreshToken", "r-2").expect("Memory store set should succeed.");

		assert_eq!(
			handle.get("refreshToken").expect("Memory store get should succeed."),
			Some("r-2".into())
		);
		assert_eq!(handle.len(), 2);

		store.clear().expect("Memory store clear should succeed.");

		assert!(handle.is_empty());
		assert_eq!(handle.get("theme").expect("Memory store get should succeed."), None);
	}
}
