//! Transport primitives for backend calls.
//!
//! The module exposes [`HttpTransport`] alongside the transport-neutral [`OutboundRequest`] and
//! [`RawResponse`] types so the request pipeline can be exercised against any HTTP stack. The
//! pipeline builds an [`OutboundRequest`], runs it through its stages, and hands it to the
//! transport. Transports only move bytes; status interpretation, bearer attachment, and error
//! normalization all live in [`crate::pipeline`].

// self
use crate::_prelude::*;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing backend calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// every clone of an [`ApiClient`](crate::client::ApiClient), and the futures they return must be
/// `Send` so requests can hop executors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and returns the raw response, whatever its status.
	///
	/// Only failures that produced no response are reported as [`TransportError`].
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// HTTP verbs used by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the uppercase verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Transport-neutral request handed to [`HttpTransport::send`].
#[derive(Clone, PartialEq, Eq)]
pub struct OutboundRequest {
	/// HTTP verb.
	pub method: Method,
	/// Fully resolved target URL.
	pub url: Url,
	/// Header map keyed by lowercase header name.
	pub headers: BTreeMap<String, String>,
	/// Encoded request body.
	pub body: Option<Vec<u8>>,
	/// Upper bound for the whole exchange.
	pub timeout: StdDuration,
}
impl OutboundRequest {
	/// Creates a request with no headers or body.
	pub fn new(method: Method, url: Url, timeout: StdDuration) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: None, timeout }
	}

	/// Sets or replaces a header; names are stored lowercase.
	pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
		self.headers.insert(name.to_ascii_lowercase(), value.into());
	}

	/// Removes a header, returning its previous value.
	pub fn remove_header(&mut self, name: &str) -> Option<String> {
		self.headers.remove(&name.to_ascii_lowercase())
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}
impl Debug for OutboundRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers: BTreeMap<&str, &str> = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name == "authorization" {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect();

		f.debug_struct("OutboundRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Response as received from the wire, before any interpretation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Header map keyed by lowercase header name.
	pub headers: BTreeMap<String, String>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Creates a response with the given status and body and no headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Convenience constructor for JSON bodies.
	pub fn json(status: u16, body: &serde_json::Value) -> Self {
		let mut response = Self::new(status, body.to_string());

		response.headers.insert("content-type".into(), "application/json".into());

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

/// Failures that prevented any response from being received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The exchange did not complete within the request timeout.
	#[error("Request timed out.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: Box<dyn StdError + Send + Sync>,
	},
	/// The request could not be expressed by the transport.
	#[error("Request could not be built: {message}.")]
	InvalidRequest {
		/// Human-readable reason.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_builder() {
			Self::InvalidRequest { message: e.to_string() }
		} else {
			Self::network(e)
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn execute(
		client: ReqwestClient,
		request: OutboundRequest,
	) -> Result<RawResponse, TransportError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = client.request(method, request.url).timeout(request.timeout);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		let response = builder.send().await?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
			})
			.collect();
		let body = response.bytes().await?.to_vec();

		Ok(RawResponse { status, headers, body })
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(Self::execute(client, request))
	}
}
