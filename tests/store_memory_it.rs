#![cfg(feature = "reqwest")]

// crates.io
use time::macros;
// self
use mentorai_client::{
	_preludet::*,
	auth::{CredentialRecord, Stored, TokenSecret, UserProfile},
	config::CookiePolicy,
	store::{CredentialStore, MemoryStore, StoreError},
};

fn build_record(access: &str, refresh: Option<&str>) -> CredentialRecord {
	let user = UserProfile {
		id: "7".into(),
		name: "Ada".into(),
		email: "ada@example.com".into(),
		role: "Student".into(),
		profile_image_url: None,
		is_profile_complete: false,
		created_at: "2025-11-10T12:00:00Z".into(),
	};

	CredentialRecord::issue(
		&CookiePolicy::default(),
		macros::datetime!(2025-11-10 12:00 UTC),
		TokenSecret::new(access),
		refresh.map(TokenSecret::new),
		Some(user),
	)
}

#[tokio::test]
async fn save_and_fetch_round_trip() {
	let store = MemoryStore::default();
	let record = build_record("access-1", Some("refresh-1"));

	store.save(record.clone()).await.expect("Saving record fixture into memory store should succeed.");

	let fetched = store
		.fetch()
		.await
		.expect("Fetching record from memory store should succeed.")
		.expect("Stored record should remain present.");

	assert_eq!(fetched, record);
}

#[tokio::test]
async fn rotation_replaces_access_and_optionally_refresh() {
	let store = MemoryStore::with_record(build_record("access-1", Some("refresh-1")));
	let policy = CookiePolicy::default();
	let now = macros::datetime!(2025-11-10 13:00 UTC);

	store
		.rotate_access(Stored::issue(TokenSecret::new("access-2"), now, policy.access_ttl, &policy), None)
		.await
		.expect("Rotation without a new refresh token should succeed.");

	let record = store.snapshot().expect("Rotated record should remain present.");

	assert_eq!(record.access_token.value.expose(), "access-2");
	assert_eq!(record.refresh_token.as_ref().map(|stored| stored.value.expose()), Some("refresh-1"));

	store
		.rotate_access(
			Stored::issue(TokenSecret::new("access-3"), now, policy.access_ttl, &policy),
			Some(Stored::issue(TokenSecret::new("refresh-2"), now, policy.refresh_ttl, &policy)),
		)
		.await
		.expect("Rotation with a new refresh token should succeed.");

	let record = store.snapshot().expect("Rotated record should remain present.");

	assert_eq!(record.access_token.value.expose(), "access-3");
	assert_eq!(record.refresh_token.as_ref().map(|stored| stored.value.expose()), Some("refresh-2"));
	assert!(record.user.is_some());
}

#[tokio::test]
async fn rotation_without_session_reports_missing() {
	let store = MemoryStore::default();
	let policy = CookiePolicy::default();
	let now = macros::datetime!(2025-11-10 13:00 UTC);
	let err = store
		.rotate_access(Stored::issue(TokenSecret::new("orphan"), now, policy.access_ttl, &policy), None)
		.await
		.expect_err("Rotation without a stored record should fail.");

	assert_eq!(err, StoreError::Missing);
	assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn revoke_and_clear() {
	let store = MemoryStore::with_record(build_record("access-1", Some("refresh-1")));

	store.revoke_refresh().await.expect("Revoking the refresh token should succeed.");

	let record = store.snapshot().expect("Revocation should keep the record.");

	assert!(record.refresh_token.is_none());
	assert_eq!(record.access_token.value.expose(), "access-1");

	store.clear().await.expect("Clearing the store should succeed.");

	assert!(store.fetch().await.expect("Fetch after clear should succeed.").is_none());
}

#[tokio::test]
async fn clones_share_state() {
	let store = MemoryStore::default();
	let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());

	shared
		.save(build_record("access-1", None))
		.await
		.expect("Saving through the trait object should succeed.");

	assert_eq!(
		store.snapshot().map(|record| record.access_token.value.expose().to_owned()),
		Some("access-1".into())
	);
}
