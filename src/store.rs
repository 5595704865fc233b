//! Storage contracts and built-in backends for session credentials.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, StoredToken},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the access token, refresh token, and user profile of one session.
///
/// Every mutation must replace the affected values in a single write so readers never observe
/// a half-applied login, rotation, or logout.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored record, if any.
	fn fetch(&self) -> StoreFuture<'_, Option<CredentialRecord>>;

	/// Persists a fresh record, replacing anything previously stored.
	fn save(&self, record: CredentialRecord) -> StoreFuture<'_, ()>;

	/// Replaces the access token (and the refresh token when a rotated one is supplied).
	///
	/// Fails with [`StoreError::Missing`] when no record exists.
	fn rotate_access(
		&self,
		access_token: StoredToken,
		refresh_token: Option<StoredToken>,
	) -> StoreFuture<'_, ()>;

	/// Drops the refresh token, keeping the rest of the record.
	fn revoke_refresh(&self) -> StoreFuture<'_, ()>;

	/// Removes every stored value at once.
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
	/// A rotation targeted a session that is no longer stored.
	#[error("No credentials are stored.")]
	Missing,
}

/// Applies an access-token rotation to `slot`.
pub(crate) fn apply_rotation(
	slot: &mut Option<CredentialRecord>,
	access_token: StoredToken,
	refresh_token: Option<StoredToken>,
) -> Result<(), StoreError> {
	let record = slot.as_mut().ok_or(StoreError::Missing)?;

	record.access_token = access_token;

	if let Some(refresh) = refresh_token {
		record.refresh_token = Some(refresh);
	}

	Ok(())
}
