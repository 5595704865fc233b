#![cfg(feature = "reqwest")]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use time::macros;
use tokio::sync::Semaphore;
// self
use mentorai_client::{
	_preludet::*,
	auth::{CredentialRecord, StoredToken, TokenSecret},
	client::ApiClient,
	config::{ClientConfig, CookiePolicy},
	http::{HttpTransport, OutboundRequest, RawResponse, TransportError, TransportFuture},
	store::{CredentialStore, MemoryStore, StoreError, StoreFuture},
};

const CONCURRENCY: usize = 6;

/// Backend stand-in: resource calls succeed only with `Bearer fresh`, and the refresh endpoint
/// is held until the test releases it.
struct FakeBackend {
	refresh_status: u16,
	always_unauthorized: bool,
	resource_delay: StdDuration,
	refresh_calls: AtomicUsize,
	resource_calls: AtomicUsize,
	refresh_gate: Semaphore,
	seen: Mutex<Vec<OutboundRequest>>,
}
impl FakeBackend {
	fn new(refresh_status: u16) -> Self {
		Self {
			refresh_status,
			always_unauthorized: false,
			resource_delay: StdDuration::ZERO,
			refresh_calls: AtomicUsize::new(0),
			resource_calls: AtomicUsize::new(0),
			refresh_gate: Semaphore::new(0),
			seen: Mutex::new(Vec::new()),
		}
	}

	fn release_refresh(&self) {
		self.refresh_gate.add_permits(1);
	}

	async fn respond(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
		self.seen.lock().push(request.clone());

		if request.url.path().ends_with("/auth/login") {
			return Ok(RawResponse::json(
				200,
				&serde_json::json!({
					"success": true,
					"data": {
						"userId": "7",
						"userName": "Ada",
						"accessToken": "login-access",
						"refreshToken": "refresh-1"
					}
				}),
			));
		}

		if request.url.path().ends_with("/auth/refresh") {
			self.refresh_calls.fetch_add(1, Ordering::SeqCst);

			let _permit = self.refresh_gate.acquire().await.map_err(TransportError::network)?;

			return Ok(if self.refresh_status == 200 {
				RawResponse::json(200, &serde_json::json!({ "accessToken": "fresh" }))
			} else {
				RawResponse::json(
					self.refresh_status,
					&serde_json::json!({ "message": "Invalid refresh token" }),
				)
			});
		}

		self.resource_calls.fetch_add(1, Ordering::SeqCst);

		if !self.resource_delay.is_zero() {
			tokio::time::sleep(self.resource_delay).await;
		}
		if !self.always_unauthorized && request.header("authorization") == Some("Bearer fresh") {
			Ok(RawResponse::json(200, &serde_json::json!({ "ok": true })))
		} else {
			Ok(RawResponse::json(401, &serde_json::json!({ "message": "Unauthorized" })))
		}
	}
}
impl HttpTransport for FakeBackend {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(self.respond(request))
	}
}

/// Memory store whose `clear` always fails.
#[derive(Default)]
struct StickyStore(MemoryStore);
impl CredentialStore for StickyStore {
	fn fetch(&self) -> StoreFuture<'_, Option<CredentialRecord>> {
		self.0.fetch()
	}

	fn save(&self, record: CredentialRecord) -> StoreFuture<'_, ()> {
		self.0.save(record)
	}

	fn rotate_access(
		&self,
		access_token: StoredToken,
		refresh_token: Option<StoredToken>,
	) -> StoreFuture<'_, ()> {
		self.0.rotate_access(access_token, refresh_token)
	}

	fn revoke_refresh(&self) -> StoreFuture<'_, ()> {
		self.0.revoke_refresh()
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "disk is read-only".into() }) })
	}
}

fn seeded_store() -> Arc<MemoryStore> {
	let record = CredentialRecord::issue(
		&CookiePolicy::default(),
		OffsetDateTime::now_utc(),
		TokenSecret::new("stale"),
		Some(TokenSecret::new("refresh-1")),
		None,
	);

	Arc::new(MemoryStore::with_record(record))
}

fn build_client(
	backend: Arc<FakeBackend>,
	store: Arc<MemoryStore>,
	timeout: StdDuration,
) -> ApiClient<FakeBackend> {
	build_client_with_store(backend, store, timeout)
}

fn build_client_with_store(
	backend: Arc<FakeBackend>,
	store: Arc<dyn CredentialStore>,
	timeout: StdDuration,
) -> ApiClient<FakeBackend> {
	let config = ClientConfig::builder()
		.base_url(Url::parse("http://backend.test/api").expect("Fixture base URL should parse."))
		.timeout(timeout)
		.build()
		.expect("Fixture configuration should build.");

	ApiClient::with_transport(config, store, backend)
}

fn resource_bearers(backend: &FakeBackend) -> Vec<Option<String>> {
	backend
		.seen
		.lock()
		.iter()
		.filter(|request| request.url.path() == "/api/problems")
		.map(|request| request.header("authorization").map(str::to_owned))
		.collect()
}

async fn wait_for_waiters(client: &ApiClient<FakeBackend>, expected: usize) {
	for _ in 0..500 {
		if client.refresh_coordinator().waiting() == expected {
			return;
		}

		tokio::time::sleep(StdDuration::from_millis(5)).await;
	}

	panic!("Expected {expected} waiters to enroll before releasing the refresh.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let backend = Arc::new(FakeBackend::new(200));
	let store = seeded_store();
	let client = build_client(backend.clone(), store.clone(), StdDuration::from_secs(5));
	let handles = (0..CONCURRENCY)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move { client.get::<serde_json::Value>("/problems").await })
		})
		.collect::<Vec<_>>();

	wait_for_waiters(&client, CONCURRENCY - 1).await;
	backend.release_refresh();

	for handle in handles {
		let body = handle
			.await
			.expect("Request task should not panic.")
			.expect("Every request should succeed after the shared refresh.");

		assert_eq!(body, serde_json::json!({ "ok": true }));
	}

	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(backend.resource_calls.load(Ordering::SeqCst), CONCURRENCY * 2);
	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(client.refresh_metrics.successes(), 1);
	assert_eq!(client.refresh_metrics.joined(), (CONCURRENCY - 1) as u64);
	assert_eq!(client.in_flight(), 0);
	assert!(!client.is_loading());

	let record = store.snapshot().expect("Refreshed record should stay stored.");

	assert_eq!(record.access_token.value.expose(), "fresh");
	assert_eq!(
		record.refresh_token.as_ref().map(|stored| stored.value.expose()),
		Some("refresh-1")
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_requests_share_one_failure() {
	let backend = Arc::new(FakeBackend::new(400));
	let store = seeded_store();
	let client = build_client(backend.clone(), store.clone(), StdDuration::from_secs(5));
	let handles = (0..CONCURRENCY)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move { client.get::<serde_json::Value>("/problems").await })
		})
		.collect::<Vec<_>>();

	wait_for_waiters(&client, CONCURRENCY - 1).await;
	backend.release_refresh();

	let mut errors = Vec::new();

	for handle in handles {
		errors.push(
			handle
				.await
				.expect("Request task should not panic.")
				.expect_err("Every request should observe the refresh failure."),
		);
	}

	assert!(errors.windows(2).all(|pair| pair[0] == pair[1]));
	assert_eq!(errors[0].status, 400);
	assert_eq!(errors[0].kind, ApiErrorKind::Http);
	assert_eq!(errors[0].message, "Invalid refresh token");
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(backend.resource_calls.load(Ordering::SeqCst), CONCURRENCY);
	assert_eq!(client.refresh_metrics.failures(), 1);
	assert_eq!(client.in_flight(), 0);
	assert!(
		store.snapshot().expect("Record should remain stored.").refresh_token.is_none(),
		"A rejected refresh token should be revoked."
	);
}

#[tokio::test]
async fn second_unauthorized_is_returned_without_another_refresh() {
	let mut backend = FakeBackend::new(200);

	backend.always_unauthorized = true;
	backend.release_refresh();

	let backend = Arc::new(backend);
	let client = build_client(backend.clone(), seeded_store(), StdDuration::from_secs(5));
	let err = client
		.get::<serde_json::Value>("/admin/problems")
		.await
		.expect_err("A replay that is rejected again should fail.");

	assert_eq!(err.status, 401);
	assert_eq!(err.kind, ApiErrorKind::Http);
	assert_eq!(err.message, "Unauthorized");
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(backend.resource_calls.load(Ordering::SeqCst), 2);

	let seen = backend.seen.lock();
	let replay = seen.last().expect("Replay should have been recorded.");

	assert_eq!(replay.header("authorization"), Some("Bearer fresh"));
}

#[tokio::test]
async fn refresh_call_bypasses_bearer_and_tracking() {
	let backend = FakeBackend::new(200);

	backend.release_refresh();

	let backend = Arc::new(backend);
	let client = build_client(backend.clone(), seeded_store(), StdDuration::from_secs(5));

	client.get::<serde_json::Value>("/problems").await.expect("Replay should succeed.");

	let seen = backend.seen.lock();
	let refresh = seen
		.iter()
		.find(|request| request.url.path() == "/api/auth/refresh")
		.expect("Refresh call should have been recorded.");
	let body: serde_json::Value = serde_json::from_slice(
		refresh.body.as_deref().expect("Refresh call should carry a body."),
	)
	.expect("Refresh body should be JSON.");

	assert_eq!(refresh.header("authorization"), None);
	assert_eq!(body, serde_json::json!({ "token": "refresh-1" }));
}

#[tokio::test]
async fn missing_refresh_token_fails_without_network_call() {
	let backend = Arc::new(FakeBackend::new(200));
	let record = CredentialRecord::issue(
		&CookiePolicy::default(),
		OffsetDateTime::now_utc(),
		TokenSecret::new("stale"),
		None,
		None,
	);
	let store = Arc::new(MemoryStore::with_record(record));
	let client = build_client(backend.clone(), store, StdDuration::from_secs(5));
	let err = client
		.get::<serde_json::Value>("/problems")
		.await
		.expect_err("Recovery without a refresh token should fail.");

	assert_eq!(err, ApiError::missing_refresh_token());
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn expired_refresh_token_reads_as_missing() {
	let backend = Arc::new(FakeBackend::new(200));
	let record = CredentialRecord::issue(
		&CookiePolicy::default(),
		macros::datetime!(2020-01-01 00:00 UTC),
		TokenSecret::new("stale"),
		Some(TokenSecret::new("refresh-old")),
		None,
	);
	let client = build_client(
		backend.clone(),
		Arc::new(MemoryStore::with_record(record)),
		StdDuration::from_secs(5),
	);
	let err = client
		.get::<serde_json::Value>("/problems")
		.await
		.expect_err("Expired credentials should not be refreshed.");

	assert_eq!(err.kind, ApiErrorKind::Unauthorized);
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);

	let seen = backend.seen.lock();

	assert_eq!(seen[0].header("authorization"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_leader_rejects_waiters() {
	let backend = Arc::new(FakeBackend::new(200));
	let client = build_client(backend.clone(), seeded_store(), StdDuration::from_secs(5));
	let leader = {
		let client = client.clone();

		tokio::spawn(async move { client.get::<serde_json::Value>("/problems").await })
	};

	for _ in 0..500 {
		if backend.refresh_calls.load(Ordering::SeqCst) == 1 {
			break;
		}

		tokio::time::sleep(StdDuration::from_millis(5)).await;
	}

	let waiter = {
		let client = client.clone();

		tokio::spawn(async move { client.get::<serde_json::Value>("/problems").await })
	};

	wait_for_waiters(&client, 1).await;
	leader.abort();

	let err = waiter
		.await
		.expect("Waiter task should not panic.")
		.expect_err("Waiters of an abandoned refresh should fail.");

	assert_eq!(err, ApiError::refresh_abandoned());
	assert!(!client.refresh_coordinator().is_refreshing());
	assert_eq!(client.in_flight(), 0);
}

#[tokio::test]
async fn timeouts_are_normalized_and_release_the_counter() {
	let mut backend = FakeBackend::new(200);

	backend.resource_delay = StdDuration::from_millis(500);

	let backend = Arc::new(backend);
	let client = build_client(backend, seeded_store(), StdDuration::from_millis(50));
	let err = client
		.get::<serde_json::Value>("/problems")
		.await
		.expect_err("Slow responses should time out.");

	assert_eq!(err, ApiError::timeout());
	assert_eq!(err.status, 0);
	assert_eq!(client.in_flight(), 0);
}

#[tokio::test]
async fn expired_access_token_is_refreshed_while_refresh_token_lives() {
	let backend = FakeBackend::new(200);

	backend.release_refresh();

	let backend = Arc::new(backend);
	let store = Arc::new(MemoryStore::default());
	let client = build_client(backend.clone(), store.clone(), StdDuration::from_secs(5));

	client.login("ada@example.com", "hunter22").await.expect("Login should succeed.");

	let issued = OffsetDateTime::now_utc() - Duration::hours(36);
	let aged = CredentialRecord::issue(
		&CookiePolicy::default(),
		issued,
		TokenSecret::new("login-access"),
		Some(TokenSecret::new("refresh-1")),
		None,
	);

	store.save(aged).await.expect("Replacing the record with an aged one should succeed.");

	let body = client
		.get::<serde_json::Value>("/problems")
		.await
		.expect("An expired access token should be refreshed with the live refresh token.");

	assert_eq!(body, serde_json::json!({ "ok": true }));
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(resource_bearers(&backend), vec![None, Some("Bearer fresh".to_owned())]);
	assert_eq!(
		store.snapshot().map(|record| record.access_token.value.expose().to_owned()),
		Some("fresh".into())
	);
}

#[tokio::test]
async fn failed_logout_keeps_the_session() {
	let backend = Arc::new(FakeBackend::new(200));
	let store = Arc::new(StickyStore::default());
	let client = build_client_with_store(backend, store.clone(), StdDuration::from_secs(5));

	client.login("ada@example.com", "hunter22").await.expect("Login should succeed.");

	let epoch = client.refresh_coordinator().epoch();
	let err = client.logout().await.expect_err("Logout should fail when the store cannot clear.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })));
	assert_eq!(client.refresh_coordinator().epoch(), epoch);
	assert_eq!(
		client.refresh_coordinator().current().map(|token| token.expose().to_owned()),
		Some("login-access".into())
	);
	assert!(store.0.snapshot().is_some());
}
