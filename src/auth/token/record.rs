//! Stored credential values with cookie-style expiry and transport-security flags.

// self
use crate::{
	_prelude::*,
	auth::{UserProfile, token::secret::TokenSecret},
	config::{CookiePolicy, SameSite},
};

/// Value persisted with an explicit expiry and the flags it was written with.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stored<V> {
	/// Persisted value.
	pub value: V,
	/// Instant after which the value reads as absent.
	pub expires_at: OffsetDateTime,
	/// Whether the value may only travel over secure transports.
	pub secure: bool,
	/// Same-site policy recorded alongside the value.
	pub same_site: SameSite,
}
impl<V> Stored<V> {
	/// Stamps `value` with `now + ttl` and the policy's transport flags.
	pub fn issue(value: V, now: OffsetDateTime, ttl: Duration, policy: &CookiePolicy) -> Self {
		Self { value, expires_at: now + ttl, secure: policy.secure, same_site: policy.same_site }
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns the value when it is still live at `instant`.
	pub fn live_at(&self, instant: OffsetDateTime) -> Option<&V> {
		if self.is_expired_at(instant) { None } else { Some(&self.value) }
	}
}
impl<V> Debug for Stored<V> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Stored")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("secure", &self.secure)
			.field("same_site", &self.same_site)
			.finish()
	}
}

/// Stored bearer or refresh token.
pub type StoredToken = Stored<TokenSecret>;

/// The three client-side values owned by a session: access token, refresh token, user profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
	/// Short-lived bearer token attached to outgoing requests.
	pub access_token: StoredToken,
	/// Longer-lived token used to mint new access tokens.
	pub refresh_token: Option<StoredToken>,
	/// Profile captured at login.
	pub user: Option<Stored<UserProfile>>,
}
impl CredentialRecord {
	/// Builds a record for a fresh login using the TTLs and flags from `policy`.
	pub fn issue(
		policy: &CookiePolicy,
		now: OffsetDateTime,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
		user: Option<UserProfile>,
	) -> Self {
		Self {
			access_token: Stored::issue(access_token, now, policy.access_ttl, policy),
			refresh_token: refresh_token
				.map(|secret| Stored::issue(secret, now, policy.refresh_ttl, policy)),
			user: user.map(|profile| Stored::issue(profile, now, policy.user_ttl, policy)),
		}
	}

	/// Returns the access token when it is live at `instant`.
	pub fn access_token_at(&self, instant: OffsetDateTime) -> Option<&TokenSecret> {
		self.access_token.live_at(instant)
	}

	/// Returns the refresh token when it is present and live at `instant`.
	pub fn refresh_token_at(&self, instant: OffsetDateTime) -> Option<&TokenSecret> {
		self.refresh_token.as_ref().and_then(|stored| stored.live_at(instant))
	}

	/// Returns the user profile when it is present and live at `instant`.
	pub fn user_at(&self, instant: OffsetDateTime) -> Option<&UserProfile> {
		self.user.as_ref().and_then(|stored| stored.live_at(instant))
	}
}
