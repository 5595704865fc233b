//! Client-level error types: the normalized [`ApiError`] surfaced by every pipeline call and the
//! broader [`Error`] returned by session lifecycle operations.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Field-keyed validation messages returned by the backend.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Canonical error returned by session lifecycle operations.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Normalized request failure.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),

	/// Backend accepted the login call but refused to open a session.
	#[error("Login failed: {reason}.")]
	Login {
		/// Backend- or client-supplied reason string.
		reason: String,
	},
}

/// Configuration and construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Client configuration failed validation.
	#[error(transparent)]
	Invalid(#[from] crate::config::ClientConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Classification attached to every [`ApiError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorKind {
	/// No response was received.
	Network,
	/// No response was received before the request timeout elapsed.
	Timeout,
	/// The backend answered with a non-2xx status.
	Http,
	/// Session credentials are unusable and no refresh could be attempted.
	Unauthorized,
	/// A successful response body did not match the expected shape.
	Decode,
	/// The credential store failed while serving the request.
	Storage,
	/// The request could not be built locally.
	InvalidRequest,
}
impl ApiErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ApiErrorKind::Network => "network",
			ApiErrorKind::Timeout => "timeout",
			ApiErrorKind::Http => "http",
			ApiErrorKind::Unauthorized => "unauthorized",
			ApiErrorKind::Decode => "decode",
			ApiErrorKind::Storage => "storage",
			ApiErrorKind::InvalidRequest => "invalid_request",
		}
	}
}
impl Display for ApiErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Normalized failure shape handed to every caller of the request pipeline.
///
/// `status` is the HTTP status code, or `0` when no response was received. `message` prefers
/// the backend's own `message` field, and `errors` carries the backend's field-keyed
/// validation map when one was supplied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{message} (status {status}).")]
pub struct ApiError {
	/// Failure classification.
	pub kind: ApiErrorKind,
	/// HTTP status code, `0` for failures without a response.
	pub status: u16,
	/// Human-readable message.
	pub message: String,
	/// Optional field-keyed validation errors.
	pub errors: Option<FieldErrors>,
}
impl ApiError {
	/// Fallback message for non-2xx responses without a usable `message` field.
	pub const HTTP_FALLBACK: &'static str = "An error occurred";
	/// Message used for failures where no response was received.
	pub const NETWORK_MESSAGE: &'static str = "Network error";
	/// Message used when the request timeout elapsed.
	pub const TIMEOUT_MESSAGE: &'static str = "Request timed out";
	/// Message used when no refresh token is available for 401 recovery.
	pub const SESSION_EXPIRED_MESSAGE: &'static str = "Session expired, please log in again";

	/// Builds an error with no field map.
	pub fn new(kind: ApiErrorKind, status: u16, message: impl Into<String>) -> Self {
		Self { kind, status, message: message.into(), errors: None }
	}

	/// Attaches a field-keyed validation map.
	pub fn with_errors(mut self, errors: FieldErrors) -> Self {
		self.errors = Some(errors);

		self
	}

	/// Network-level failure without a response.
	pub fn network() -> Self {
		Self::new(ApiErrorKind::Network, 0, Self::NETWORK_MESSAGE)
	}

	/// Request timeout without a response.
	pub fn timeout() -> Self {
		Self::new(ApiErrorKind::Timeout, 0, Self::TIMEOUT_MESSAGE)
	}

	/// Synthesized authentication failure raised when no refresh token is stored.
	pub fn missing_refresh_token() -> Self {
		Self::new(ApiErrorKind::Unauthorized, 401, Self::SESSION_EXPIRED_MESSAGE)
	}

	/// Raised for waiters and leaders whose session ended while a refresh was in flight.
	pub fn session_ended() -> Self {
		Self::new(ApiErrorKind::Unauthorized, 401, "Session ended during token refresh")
	}

	/// Raised for waiters whose refresh leader was dropped before settling.
	pub fn refresh_abandoned() -> Self {
		Self::new(ApiErrorKind::Unauthorized, 401, "Token refresh was abandoned")
	}

	/// Wraps a credential store failure.
	pub fn storage(err: &crate::store::StoreError) -> Self {
		Self::new(ApiErrorKind::Storage, 0, err.to_string())
	}

	/// Wraps a local request construction failure.
	pub fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(ApiErrorKind::InvalidRequest, 0, message)
	}

	/// Returns `true` when the backend rejected the request with 401.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn api_error_display_includes_status() {
		let err = ApiError::new(ApiErrorKind::Http, 404, "Problem not found");

		assert_eq!(err.to_string(), "Problem not found (status 404).");
		assert_eq!(ApiError::network().status, 0);
		assert!(ApiError::missing_refresh_token().is_unauthorized());
	}
}
