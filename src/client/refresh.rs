//! 401 recovery: lead, join, or reuse a token refresh, then hand the replay its bearer.
//!
//! The leader reads the stored refresh token, waits out the configured jitter, and posts it to
//! the refresh endpoint outside the pipeline (no bearer, no in-flight tracking). A rejected
//! refresh token is revoked so later 401s fail fast, and a refreshed access token is only
//! persisted when the session that started the refresh is still current.

// self
use crate::{
	_prelude::*,
	auth::{Stored, TokenSecret},
	client::ApiClient,
	http::{HttpTransport, Method, OutboundRequest},
	obs::{self, OpKind, OpOutcome, OpSpan},
	pipeline::{RefreshTicket, Stage, attach_auth, normalize},
};

#[derive(Serialize)]
struct RefreshRequest<'a> {
	token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	#[serde(rename = "accessToken", alias = "AccessToken", default)]
	access_token: Option<String>,
	#[serde(rename = "refreshToken", alias = "RefreshToken", default)]
	refresh_token: Option<String>,
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Returns the bearer a request that was sent with `sent` and received a 401 should replay
	/// with.
	///
	/// A reusable token is only replayed while the store still holds it live; otherwise the
	/// caller re-enters as the holder of that token and leads or joins a refresh.
	pub(crate) async fn recover_unauthorized(
		&self,
		sent: Option<&TokenSecret>,
	) -> Result<TokenSecret, ApiError> {
		const STAGE: &str = Stage::HandleUnauthorized.as_str();

		let mut sent = sent.cloned();

		loop {
			match self.refresh.enter(sent.as_ref()) {
				RefreshTicket::Reuse(token) => {
					if self.stored_access_token().await?.as_ref() == Some(&token) {
						self.refresh_metrics.record_joined();
						obs::debug_event(
							OpKind::Refresh,
							STAGE,
							"Replaying with the current access token.",
						);

						return Ok(token);
					}

					obs::debug_event(
						OpKind::Refresh,
						STAGE,
						"Current access token is no longer stored; refreshing.",
					);

					sent = Some(token);
				},
				RefreshTicket::Wait(waiter) => {
					self.refresh_metrics.record_joined();
					obs::debug_event(
						OpKind::Refresh,
						STAGE,
						"Waiting on the in-flight token refresh.",
					);

					return waiter.wait().await;
				},
				RefreshTicket::Lead(lease) => {
					let outcome = self.refresh_access_token(lease.epoch()).await;

					return lease.settle(outcome);
				},
			}
		}
	}

	/// Exchanges the stored refresh token for a new access token and persists the rotation.
	async fn refresh_access_token(&self, epoch: u64) -> Result<TokenSecret, ApiError> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "refresh_access_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result: Result<TokenSecret, ApiError> = span
			.instrument(async move {
				let now = OffsetDateTime::now_utc();
				let refresh_token = self
					.store
					.fetch()
					.await
					.map_err(|e| ApiError::storage(&e))?
					.and_then(|record| record.refresh_token_at(now).cloned())
					.ok_or_else(ApiError::missing_refresh_token)?;
				let delay = self.config.refresh.jittered_delay();

				if !delay.is_zero() {
					tokio::time::sleep(delay).await;
				}

				let response = self.post_refresh(&refresh_token, epoch).await?;
				let access_token = response
					.access_token
					.and_then(TokenSecret::non_empty)
					.ok_or_else(|| {
						ApiError::new(
							ApiErrorKind::Decode,
							200,
							"Refresh response did not include an access token",
						)
					})?;
				let rotated = response.refresh_token.and_then(TokenSecret::non_empty);

				self.persist_rotation(epoch, access_token.clone(), rotated).await?;

				Ok(access_token)
			})
			.await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		obs::record_result(KIND, &result);

		result
	}

	async fn post_refresh(
		&self,
		refresh_token: &TokenSecret,
		epoch: u64,
	) -> Result<RefreshResponse, ApiError> {
		let url = self.config.refresh_endpoint().map_err(|e| {
			ApiError::invalid_request(format!("Refresh endpoint could not be resolved: {e}"))
		})?;
		let body = serde_json::to_vec(&RefreshRequest { token: refresh_token.expose() })
			.map_err(|e| {
				ApiError::invalid_request(format!("Refresh body could not be encoded: {e}"))
			})?;
		let mut request = OutboundRequest::new(Method::Post, url, self.config.timeout);

		attach_auth::apply(&mut request, None);
		request.body = Some(body);

		let response = self.send_bounded(request).await?;

		if response.is_success() {
			return normalize::decode_json(&response);
		}

		let error = normalize::from_response(&response);

		if (400..500).contains(&response.status) {
			self.revoke_refresh_token(epoch).await;
		}

		Err(error)
	}

	async fn revoke_refresh_token(&self, epoch: u64) {
		let _session = self.session_guard.lock().await;

		if self.refresh.epoch() != epoch {
			return;
		}
		if let Err(e) = self.store.revoke_refresh().await {
			obs::warn_absorbed(OpKind::Refresh, "Failed to revoke a rejected refresh token.", &e);
		}
	}

	async fn persist_rotation(
		&self,
		epoch: u64,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
	) -> Result<(), ApiError> {
		let _session = self.session_guard.lock().await;

		if self.refresh.epoch() != epoch {
			return Err(ApiError::session_ended());
		}

		let policy = &self.config.cookies;
		let now = OffsetDateTime::now_utc();
		let access = Stored::issue(access_token, now, policy.access_ttl, policy);
		let refresh =
			refresh_token.map(|secret| Stored::issue(secret, now, policy.refresh_ttl, policy));

		self.store.rotate_access(access, refresh).await.map_err(|e| ApiError::storage(&e))
	}
}
