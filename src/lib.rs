//! Token-refresh-aware REST client for the MentorAI coding platform: bearer attachment,
//! single-flight 401 recovery, in-flight tracking, and normalized errors in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::ApiClient,
		config::ClientConfig,
		http::ReqwestTransport,
		pipeline::LoadingFlag,
		store::{CredentialStore, MemoryStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = ApiClient<ReqwestTransport>;

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Builds a client configuration pointing at a mock server base URL with backoff disabled.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::builder()
			.base_url(Url::parse(base_url).expect("Mock server base URL should parse."))
			.timeout(StdDuration::from_secs(5))
			.build()
			.expect("Test client configuration should be valid.")
	}

	/// Constructs an [`ApiClient`] backed by an in-memory store, a loading flag, and the
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (ReqwestTestClient, Arc<MemoryStore>, Arc<LoadingFlag>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let flag = Arc::new(LoadingFlag::default());
		let client = ReqwestTestClient::with_transport(
			test_config(base_url),
			store,
			test_reqwest_transport(),
		)
		.with_loading_indicator(flag.clone());

		(client, store_backend, flag)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{ApiError, ApiErrorKind, Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
