//! The request pipeline as an ordered set of named stages.
//!
//! Every call issued through [`ApiClient`](crate::client::ApiClient) flows through, in order:
//!
//! 1. [`Stage::AttachAuth`]: [`attach_auth::apply`] sets the JSON headers and the bearer token.
//! 2. [`Stage::TrackInFlight`]: an [`InFlightGuard`] holds the in-flight counter up until the
//!    exchange finishes, whichever way it finishes.
//! 3. [`Stage::HandleUnauthorized`]: the [`RefreshCoordinator`] decides whether a 401 leads a
//!    refresh, joins one, or replays with an already refreshed token.
//! 4. [`Stage::NormalizeError`]: [`normalize`] turns every failure into an
//!    [`ApiError`](crate::error::ApiError).
//!
//! Each stage is usable without a transport so its contract can be tested on its own.

pub mod attach_auth;
pub mod inflight;
pub mod normalize;
pub mod refresh;

pub use inflight::*;
pub use refresh::*;

// self
use crate::_prelude::*;

/// Named pipeline stages, used as span and event labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Header preparation and bearer attachment.
	AttachAuth,
	/// In-flight accounting around the transport call.
	TrackInFlight,
	/// One-shot 401 recovery.
	HandleUnauthorized,
	/// Failure normalization.
	NormalizeError,
}
impl Stage {
	/// Returns a stable label suitable for span or event fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::AttachAuth => "attach_auth",
			Stage::TrackInFlight => "track_in_flight",
			Stage::HandleUnauthorized => "handle_unauthorized",
			Stage::NormalizeError => "normalize_error",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
