//! Per-call knobs layered over the client-wide configuration.

// self
use crate::_prelude::*;

/// Optional overrides applied to a single call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOptions {
	/// Extra headers; names are matched case-insensitively.
	pub headers: Vec<(String, String)>,
	/// Query parameters appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Timeout override for this call.
	pub timeout: Option<StdDuration>,
	/// Whether a 401 triggers token refresh and a replay.
	pub refresh: bool,
}
impl RequestOptions {
	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Overrides the client timeout for this call.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Opts out of 401 recovery so the backend's rejection reaches the caller unchanged.
	pub fn without_refresh(mut self) -> Self {
		self.refresh = false;

		self
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self { headers: Vec::new(), query: Vec::new(), timeout: None, refresh: true }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_allow_refresh() {
		let options = RequestOptions::default();

		assert!(options.refresh);
		assert!(options.headers.is_empty());
		assert_eq!(options.timeout, None);
	}

	#[test]
	fn builders_accumulate() {
		let options = RequestOptions::default()
			.header("X-Trace", "1")
			.query("problemId", "7")
			.timeout(StdDuration::from_secs(2))
			.without_refresh();

		assert_eq!(options.headers, vec![("X-Trace".to_owned(), "1".to_owned())]);
		assert_eq!(options.query, vec![("problemId".to_owned(), "7".to_owned())]);
		assert_eq!(options.timeout, Some(StdDuration::from_secs(2)));
		assert!(!options.refresh);
	}
}
