//! Session lifecycle: login, registration, current user, and logout.
//!
//! Login and logout are the only operations that create or destroy stored credentials. Both run
//! under the client's session lock and start a new session epoch, so a refresh that was in
//! flight when the session changed cannot write its token into the new session.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, TokenSecret, UserProfile, UserRole},
	client::{ApiClient, RequestOptions},
	http::{HttpTransport, Method},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Reason reported when the backend rejects a login without a message.
pub const LOGIN_FAILED: &str = "Login failed";
/// Reason reported when a successful login carries no access token.
pub const MISSING_ACCESS_TOKEN: &str = "Invalid login response - no access token received";

/// Credentials posted to `/auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
	/// Account email.
	pub email: &'a str,
	/// Account password.
	pub password: &'a str,
}
impl Debug for LoginRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[derive(Deserialize)]
struct LoginResponse {
	#[serde(default, alias = "Success")]
	success: bool,
	#[serde(default, alias = "Message")]
	message: Option<String>,
	#[serde(default, alias = "Data")]
	data: Option<LoginData>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
	#[serde(default, alias = "UserId")]
	user_id: Option<String>,
	#[serde(default, alias = "UserName")]
	user_name: Option<String>,
	#[serde(default, alias = "Email")]
	email: Option<String>,
	#[serde(default, alias = "AccessToken")]
	access_token: Option<String>,
	#[serde(default, alias = "RefreshToken")]
	refresh_token: Option<String>,
	#[serde(default, alias = "UserRole")]
	user_role: Option<String>,
	#[serde(default, alias = "ProfileImageUrl")]
	profile_image_url: Option<String>,
	#[serde(default, alias = "IsProfileComplete")]
	is_profile_complete: Option<bool>,
	#[serde(default, alias = "CreatedAt")]
	created_at: Option<String>,
}
impl LoginData {
	fn profile(&self, now: OffsetDateTime) -> UserProfile {
		let id = match non_blank(&self.user_id) {
			Some(id) => id,
			None => {
				obs::warn_absorbed(
					OpKind::Login,
					"No user id received from the backend, using a temporary id.",
					&"missing userId",
				);

				format!("temp-{}", now.unix_timestamp_nanos() / 1_000_000)
			},
		};

		UserProfile {
			id,
			name: non_blank(&self.user_name).unwrap_or_else(|| "Unknown".into()),
			email: non_blank(&self.email).unwrap_or_default(),
			role: non_blank(&self.user_role).unwrap_or_else(|| "user".into()),
			profile_image_url: non_blank(&self.profile_image_url),
			is_profile_complete: self.is_profile_complete.unwrap_or(false),
			created_at: non_blank(&self.created_at)
				.unwrap_or_else(|| now.format(&Rfc3339).unwrap_or_default()),
		}
	}
}

/// Account details posted to `/auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
	/// Display name.
	pub user_name: String,
	/// Account email.
	pub email: String,
	/// Chosen password.
	pub password: String,
	/// Password confirmation, checked by the backend.
	pub confirm_password: String,
	/// Requested role, sent as its numeric code.
	pub role: UserRole,
}
impl Debug for RegisterRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegisterRequest")
			.field("user_name", &self.user_name)
			.field("email", &self.email)
			.field("role", &self.role)
			.finish_non_exhaustive()
	}
}

/// Backend answer to a registration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
	/// Whether the account was created.
	#[serde(default)]
	pub success: bool,
	/// Registered display name.
	#[serde(default)]
	pub user_name: String,
	/// Registered email.
	#[serde(default)]
	pub email: String,
	/// Human-readable outcome.
	#[serde(default)]
	pub message: String,
	/// Email verification token, when the backend issues one.
	#[serde(default)]
	pub verification_token: Option<String>,
}

/// Session opened by [`ApiClient::login`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
	/// Profile stored for the session.
	pub user: UserProfile,
	/// Bearer attached to subsequent requests.
	pub access_token: TokenSecret,
	/// Token used to mint new access tokens, when the backend issued one.
	pub refresh_token: Option<TokenSecret>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest<'a> {
	user_id: &'a str,
	refresh_token: &'a str,
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Signs in and stores the access token, refresh token, and profile.
	///
	/// The call opts out of 401 recovery so wrong credentials surface the backend's message.
	pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result: Result<Session> = span
			.instrument(async move {
				let response: LoginResponse = self
					.request(
						Method::Post,
						"/auth/login",
						Some(&LoginRequest { email, password }),
						RequestOptions::default().without_refresh(),
					)
					.await?;

				if !response.success {
					return Err(Error::Login {
						reason: non_blank(&response.message).unwrap_or_else(|| LOGIN_FAILED.into()),
					});
				}

				let data = response.data.unwrap_or_default();
				let access_token = data
					.access_token
					.clone()
					.and_then(TokenSecret::non_empty)
					.ok_or_else(|| Error::Login { reason: MISSING_ACCESS_TOKEN.into() })?;
				let refresh_token = data.refresh_token.clone().and_then(TokenSecret::non_empty);
				let now = OffsetDateTime::now_utc();
				let user = data.profile(now);
				let record = CredentialRecord::issue(
					&self.config.cookies,
					now,
					access_token.clone(),
					refresh_token.clone(),
					Some(user.clone()),
				);

				{
					let _session = self.session_guard.lock().await;

					self.store.save(record).await?;
					self.refresh.begin_session(access_token.clone());
				}

				Ok(Session { user, access_token, refresh_token })
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Creates an account. Field validation failures surface as [`ApiError::errors`].
	pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
		let response = self
			.request(
				Method::Post,
				"/auth/register",
				Some(request),
				RequestOptions::default().without_refresh(),
			)
			.await?;

		Ok(response)
	}

	/// `GET /auth/me`
	pub async fn current_user<R>(&self) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.get("/auth/me").await
	}

	/// Returns the stored profile while it is live.
	pub async fn session(&self) -> Result<Option<UserProfile>> {
		let record = self.store.fetch().await?;
		let now = OffsetDateTime::now_utc();

		Ok(record.and_then(|record| record.user_at(now).cloned()))
	}

	/// Ends the session locally, then tells the backend on a best-effort basis.
	///
	/// Local credentials are cleared in a single store write before any network call. The
	/// server notification is only sent when both a user id and a refresh token were stored,
	/// and its failure is logged instead of returned.
	pub async fn logout(&self) -> Result<()> {
		const KIND: OpKind = OpKind::Logout;

		let span = OpSpan::new(KIND, "logout");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async move {
				let previous = {
					let _session = self.session_guard.lock().await;
					let record = self.store.fetch().await?;

					self.store.clear().await?;
					self.refresh.end_session();

					record
				};
				let now = OffsetDateTime::now_utc();
				let Some(record) = previous else {
					return Ok(());
				};
				let user_id = record.user_at(now).map(|user| user.id.clone());
				let refresh_token = record.refresh_token_at(now).cloned();

				if let (Some(user_id), Some(refresh_token)) = (user_id, refresh_token) {
					let body =
						LogoutRequest { user_id: &user_id, refresh_token: refresh_token.expose() };

					if let Err(e) = self
						.send(
							Method::Post,
							"/auth/logout",
							Some(&body),
							RequestOptions::default().without_refresh(),
						)
						.await
					{
						obs::warn_absorbed(KIND, "Server logout failed.", &e);
					}
				}

				Ok(())
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}

fn non_blank(value: &Option<String>) -> Option<String> {
	value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned)
}
