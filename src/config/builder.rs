//! Builder and validation for [`ClientConfig`].

// self
use crate::{
	_prelude::*,
	config::{ClientConfig, CookiePolicy, CookiePolicyError, RefreshPolicy},
};

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL could not be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// URL that failed validation.
		url: String,
	},
	/// Timeout of zero would fail every request.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
	/// Refresh path must be absolute relative to the base URL.
	#[error("Refresh path must start with '/': {path}.")]
	InvalidRefreshPath {
		/// Path that failed validation.
		path: String,
	},
	/// Cookie policy failed validation.
	#[error(transparent)]
	Cookies(#[from] CookiePolicyError),
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
	/// Base origin; defaults to [`ClientConfig::DEFAULT_BASE_URL`].
	pub base_url: Option<Url>,
	/// Per-request timeout; defaults to [`ClientConfig::DEFAULT_TIMEOUT`].
	pub timeout: Option<StdDuration>,
	/// Refresh path; defaults to [`ClientConfig::DEFAULT_REFRESH_PATH`].
	pub refresh_path: Option<String>,
	/// Refresh pacing policy.
	pub refresh: RefreshPolicy,
	/// Stored credential policy.
	pub cookies: CookiePolicy,
}
impl ClientConfigBuilder {
	/// Creates a builder with every field at its default.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the base origin.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the per-request timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = Some(path.into());

		self
	}

	/// Sets the upper bound for the jittered pre-refresh delay (clamped to five seconds).
	pub fn refresh_backoff(mut self, max_backoff: StdDuration) -> Self {
		self.refresh = RefreshPolicy::with_max_backoff(max_backoff);

		self
	}

	/// Replaces the stored credential policy.
	pub fn cookies(mut self, policy: CookiePolicy) -> Self {
		self.cookies = policy;

		self
	}

	/// Consumes the builder and produces a validated [`ClientConfig`].
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let base_url = match self.base_url {
			Some(url) => url,
			None => Url::parse(ClientConfig::DEFAULT_BASE_URL)
				.map_err(|source| ClientConfigError::InvalidBaseUrl { source })?,
		};

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: base_url.to_string() });
		}

		let timeout = self.timeout.unwrap_or(ClientConfig::DEFAULT_TIMEOUT);

		if timeout.is_zero() {
			return Err(ClientConfigError::ZeroTimeout);
		}

		let refresh_path =
			self.refresh_path.unwrap_or_else(|| ClientConfig::DEFAULT_REFRESH_PATH.to_owned());

		if !refresh_path.starts_with('/') {
			return Err(ClientConfigError::InvalidRefreshPath { path: refresh_path });
		}

		self.cookies.validate()?;

		Ok(ClientConfig {
			base_url,
			timeout,
			refresh_path,
			refresh: RefreshPolicy::with_max_backoff(self.refresh.max_backoff),
			cookies: self.cookies,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_backend_conventions() {
		let config = ClientConfigBuilder::new().build().expect("Default configuration should build.");

		assert_eq!(config.base_url.as_str(), "https://localhost:7001/api");
		assert_eq!(config.timeout, StdDuration::from_secs(10));
		assert_eq!(config.refresh_path, "/auth/refresh");
		assert_eq!(config.refresh.max_backoff, StdDuration::ZERO);
		assert_eq!(config.cookies, CookiePolicy::default());
	}

	#[test]
	fn builder_rejects_invalid_settings() {
		let err = ClientConfigBuilder::new()
			.base_url(Url::parse("ftp://example.com/api").expect("Fixture URL should parse."))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ClientConfigError::UnsupportedScheme { .. }));

		let err = ClientConfigBuilder::new()
			.timeout(StdDuration::ZERO)
			.build()
			.expect_err("Zero timeouts should be rejected.");

		assert_eq!(err, ClientConfigError::ZeroTimeout);

		let err = ClientConfigBuilder::new()
			.refresh_path("auth/refresh")
			.build()
			.expect_err("Relative refresh paths should be rejected.");

		assert!(matches!(err, ClientConfigError::InvalidRefreshPath { .. }));
	}
}
