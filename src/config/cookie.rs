//! Expiry and transport-security policy for persisted credentials.

// self
use crate::_prelude::*;

/// Same-site policy recorded with every stored credential.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SameSite {
	/// Never sent on cross-site requests.
	#[default]
	Strict,
	/// Sent on top-level cross-site navigations.
	Lax,
	/// Sent on all requests; requires `secure`.
	None,
}
impl SameSite {
	/// Returns the attribute value as it would appear in a cookie header.
	pub const fn as_str(self) -> &'static str {
		match self {
			SameSite::Strict => "Strict",
			SameSite::Lax => "Lax",
			SameSite::None => "None",
		}
	}
}
impl Display for SameSite {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Lifetimes and flags applied when credentials are written to a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CookiePolicy {
	/// Lifetime of the access token.
	pub access_ttl: Duration,
	/// Lifetime of the refresh token.
	pub refresh_ttl: Duration,
	/// Lifetime of the stored user profile.
	pub user_ttl: Duration,
	/// Restrict values to secure transports.
	pub secure: bool,
	/// Same-site policy.
	pub same_site: SameSite,
}
impl CookiePolicy {
	/// Checks that every TTL is positive and that `SameSite=None` is paired with `secure`.
	pub fn validate(&self) -> Result<(), CookiePolicyError> {
		for (name, ttl) in [
			("access", self.access_ttl),
			("refresh", self.refresh_ttl),
			("user", self.user_ttl),
		] {
			if !ttl.is_positive() {
				return Err(CookiePolicyError::NonPositiveTtl { value: name });
			}
		}
		if self.same_site == SameSite::None && !self.secure {
			return Err(CookiePolicyError::InsecureSameSiteNone);
		}

		Ok(())
	}
}
impl Default for CookiePolicy {
	fn default() -> Self {
		Self {
			access_ttl: Duration::days(1),
			refresh_ttl: Duration::days(7),
			user_ttl: Duration::days(7),
			secure: true,
			same_site: SameSite::Strict,
		}
	}
}

/// Validation failures for [`CookiePolicy`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CookiePolicyError {
	/// A stored value would expire immediately.
	#[error("The {value} lifetime must be positive.")]
	NonPositiveTtl {
		/// Which stored value failed validation.
		value: &'static str,
	},
	/// `SameSite=None` without the secure flag.
	#[error("SameSite=None requires the secure flag.")]
	InsecureSameSiteNone,
}
