//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, StoredToken},
	store::{self, CredentialStore, StoreError, StoreFuture},
};

type StoreSlot = Arc<RwLock<Option<CredentialRecord>>>;

/// Thread-safe storage backend that keeps the session in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreSlot);
impl MemoryStore {
	/// Creates a store pre-seeded with `record`.
	pub fn with_record(record: CredentialRecord) -> Self {
		Self(Arc::new(RwLock::new(Some(record))))
	}

	/// Returns a copy of the current record without going through the async contract.
	pub fn snapshot(&self) -> Option<CredentialRecord> {
		self.0.read().clone()
	}

	fn rotate_now(
		slot: StoreSlot,
		access_token: StoredToken,
		refresh_token: Option<StoredToken>,
	) -> Result<(), StoreError> {
		let mut guard = slot.write();

		store::apply_rotation(&mut guard, access_token, refresh_token)
	}

	fn revoke_refresh_now(slot: StoreSlot) {
		if let Some(record) = slot.write().as_mut() {
			record.refresh_token = None;
		}
	}
}
impl CredentialStore for MemoryStore {
	fn fetch(&self) -> StoreFuture<'_, Option<CredentialRecord>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, record: CredentialRecord) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(record);

			Ok(())
		})
	}

	fn rotate_access(
		&self,
		access_token: StoredToken,
		refresh_token: Option<StoredToken>,
	) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::rotate_now(slot, access_token, refresh_token) })
	}

	fn revoke_refresh(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			Self::revoke_refresh_now(slot);

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
