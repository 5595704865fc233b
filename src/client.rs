//! The configured API client: one pipeline shared by every endpoint call.
//!
//! [`ApiClient`] owns the transport, the credential store, and the pipeline state (in-flight
//! tracker, refresh coordinator, session lock). Clones share all of it, so a single client can
//! be handed to every task in the process.

pub mod options;

mod refresh;

pub use options::RequestOptions;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	http::{HttpTransport, Method, OutboundRequest, RawResponse},
	obs::{self, OpKind, OpOutcome, OpSpan},
	pipeline::{
		InFlightTracker, LoadingIndicator, RefreshCoordinator, RefreshMetrics, attach_auth,
		normalize,
	},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Token-refresh-aware client for the backend API.
///
/// Every call attaches the stored bearer token, holds the in-flight counter up for the duration
/// of the exchange, recovers from a single 401 by refreshing the access token, and normalizes
/// failures into [`ApiError`].
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound call, including the refresh call.
	pub transport: Arc<T>,
	/// Store holding the session credentials.
	pub store: Arc<dyn CredentialStore>,
	/// Immutable client configuration.
	pub config: Arc<ClientConfig>,
	/// Counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	inflight: Arc<InFlightTracker>,
	pub(crate) refresh: Arc<RefreshCoordinator>,
	pub(crate) session_guard: Arc<AsyncMutex<()>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config: Arc::new(config),
			refresh_metrics: Default::default(),
			inflight: Default::default(),
			refresh: Default::default(),
			session_guard: Default::default(),
		}
	}

	/// Routes in-flight transitions to `indicator`.
	///
	/// Call this before issuing requests; guards handed out earlier keep reporting to the
	/// previous indicator.
	pub fn with_loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
		self.inflight = Arc::new(InFlightTracker::new(indicator));

		self
	}

	/// Number of requests currently in flight.
	pub fn in_flight(&self) -> usize {
		self.inflight.in_flight()
	}

	/// Returns `true` while at least one request is in flight.
	pub fn is_loading(&self) -> bool {
		self.inflight.is_busy()
	}

	/// Refresh coordinator shared by every clone of this client.
	pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.refresh
	}

	/// Issues a call and decodes the JSON response body into `R`.
	///
	/// An empty body decodes as JSON `null`, so `R = ()` and `Option<_>` suit 204 responses.
	pub async fn request<R, B>(
		&self,
		method: Method,
		path: &str,
		body: Option<&B>,
		options: RequestOptions,
	) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let response = self.send(method, path, body, options).await?;

		normalize::decode_json(&response)
	}

	/// Issues a call and returns the successful response untouched.
	pub async fn send<B>(
		&self,
		method: Method,
		path: &str,
		body: Option<&B>,
		options: RequestOptions,
	) -> Result<RawResponse, ApiError>
	where
		B: ?Sized + Serialize,
	{
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, "send");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result: Result<RawResponse, ApiError> = span
			.instrument(async move {
				let request = self.build_request(method, path, body, &options)?;

				self.execute(request, options.refresh).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// `GET path`, decoded as JSON.
	pub async fn get<R>(&self, path: &str) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.request::<R, ()>(Method::Get, path, None, RequestOptions::default()).await
	}

	/// `POST path` with a JSON body, decoded as JSON.
	pub async fn post<R, B>(&self, path: &str, body: &B) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.request(Method::Post, path, Some(body), RequestOptions::default()).await
	}

	/// `PUT path` with a JSON body, decoded as JSON.
	pub async fn put<R, B>(&self, path: &str, body: &B) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.request(Method::Put, path, Some(body), RequestOptions::default()).await
	}

	/// `DELETE path`, decoded as JSON.
	pub async fn delete<R>(&self, path: &str) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.request::<R, ()>(Method::Delete, path, None, RequestOptions::default()).await
	}

	fn build_request<B>(
		&self,
		method: Method,
		path: &str,
		body: Option<&B>,
		options: &RequestOptions,
	) -> Result<OutboundRequest, ApiError>
	where
		B: ?Sized + Serialize,
	{
		let mut url = self.config.endpoint(path).map_err(|e| {
			ApiError::invalid_request(format!("Request path `{path}` could not be resolved: {e}"))
		})?;

		if !options.query.is_empty() {
			url.query_pairs_mut().extend_pairs(options.query.iter());
		}

		let mut request =
			OutboundRequest::new(method, url, options.timeout.unwrap_or(self.config.timeout));

		for (name, value) in &options.headers {
			request.set_header(name, value.clone());
		}
		if let Some(body) = body {
			let encoded = serde_json::to_vec(body).map_err(|e| {
				ApiError::invalid_request(format!("Request body could not be encoded: {e}"))
			})?;

			request.body = Some(encoded);
		}

		Ok(request)
	}

	async fn execute(
		&self,
		request: OutboundRequest,
		refresh: bool,
	) -> Result<RawResponse, ApiError> {
		let mut bearer = self.stored_access_token().await?;
		let mut retried = false;

		loop {
			let response = self.dispatch(request.clone(), bearer.as_ref()).await?;

			if response.is_success() {
				return Ok(response);
			}
			if response.status != 401 || retried || !refresh {
				return Err(normalize::from_response(&response));
			}

			retried = true;
			bearer = Some(self.recover_unauthorized(bearer.as_ref()).await?);
		}
	}

	async fn dispatch(
		&self,
		mut request: OutboundRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<RawResponse, ApiError> {
		attach_auth::apply(&mut request, bearer);

		let _in_flight = self.inflight.begin();

		self.send_bounded(request).await
	}

	async fn send_bounded(&self, request: OutboundRequest) -> Result<RawResponse, ApiError> {
		let timeout = request.timeout;

		match tokio::time::timeout(timeout, self.transport.send(request)).await {
			Ok(Ok(response)) => Ok(response),
			Ok(Err(err)) => Err(normalize::from_transport(&err)),
			Err(_) => Err(ApiError::timeout()),
		}
	}

	async fn stored_access_token(&self) -> Result<Option<TokenSecret>, ApiError> {
		let record = self.store.fetch().await.map_err(|e| ApiError::storage(&e))?;
		let now = OffsetDateTime::now_utc();

		Ok(record.and_then(|record| record.access_token_at(now).cloned()))
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a fresh reqwest transport honoring the configured timeout.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		let http = ReqwestClient::builder().timeout(config.timeout).build()?;

		Ok(Self::with_transport(config, store, ReqwestTransport::with_client(http)))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			inflight: self.inflight.clone(),
			refresh: self.refresh.clone(),
			session_guard: self.session_guard.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("in_flight", &self.inflight.in_flight())
			.field("refresh", &self.refresh)
			.finish()
	}
}
