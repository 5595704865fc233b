//! Client configuration: base origin, timeout, refresh endpoint and backoff, and the cookie-style
//! persistence policy applied to stored credentials.

pub mod builder;
pub mod cookie;

pub use builder::*;
pub use cookie::*;

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// Immutable configuration shared by every request issued through a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base origin every request path is appended to.
	pub base_url: Url,
	/// Per-request timeout.
	pub timeout: StdDuration,
	/// Path of the token refresh endpoint, relative to [`ClientConfig::base_url`].
	pub refresh_path: String,
	/// Refresh pacing policy.
	pub refresh: RefreshPolicy,
	/// Expiry and transport flags applied to stored credentials.
	pub cookies: CookiePolicy,
}
impl ClientConfig {
	/// Base origin used when none is configured.
	pub const DEFAULT_BASE_URL: &'static str = "https://localhost:7001/api";
	/// Default per-request timeout.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Environment variable consulted by [`ClientConfig::from_env`].
	pub const BASE_URL_ENV: &'static str = "MENTORAI_API_BASE_URL";

	/// Returns a builder seeded with defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::new()
	}

	/// Builds a default configuration, taking the base origin from `MENTORAI_API_BASE_URL`
	/// when it is set and non-empty.
	pub fn from_env() -> Result<Self, ClientConfigError> {
		let mut builder = Self::builder();

		if let Some(raw) = std::env::var(Self::BASE_URL_ENV).ok().filter(|v| !v.trim().is_empty())
		{
			let url = Url::parse(raw.trim())
				.map_err(|source| ClientConfigError::InvalidBaseUrl { source })?;

			builder = builder.base_url(url);
		}

		builder.build()
	}

	/// Resolves `path` against the base origin by appending it, the way axios joins `baseURL`.
	pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
		let base = self.base_url.as_str().trim_end_matches('/');

		if path.is_empty() {
			Url::parse(base)
		} else if path.starts_with('/') {
			Url::parse(&format!("{base}{path}"))
		} else {
			Url::parse(&format!("{base}/{path}"))
		}
	}

	/// Resolves the refresh endpoint URL.
	pub fn refresh_endpoint(&self) -> Result<Url, url::ParseError> {
		self.endpoint(&self.refresh_path)
	}
}

/// Pacing applied before a refresh call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshPolicy {
	/// Upper bound for the jittered delay before contacting the refresh endpoint.
	pub max_backoff: StdDuration,
}
impl RefreshPolicy {
	/// Hard ceiling for [`RefreshPolicy::max_backoff`].
	pub const BACKOFF_CEILING: StdDuration = StdDuration::from_secs(5);

	/// Creates a policy, clamping the backoff to [`RefreshPolicy::BACKOFF_CEILING`].
	pub fn with_max_backoff(max_backoff: StdDuration) -> Self {
		Self { max_backoff: max_backoff.min(Self::BACKOFF_CEILING) }
	}

	/// Picks a delay uniformly from `0..=max_backoff`.
	pub fn jittered_delay(&self) -> StdDuration {
		let ceiling = self.max_backoff.min(Self::BACKOFF_CEILING);
		let millis = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);

		if millis == 0 {
			return StdDuration::ZERO;
		}

		StdDuration::from_millis(rand::rng().random_range(0..=millis))
	}
}
