//! Typed wrappers for the backend resources, layered on [`ApiClient`](crate::client::ApiClient).
//!
//! Payloads stay opaque: every wrapper is generic over the caller's response type, and the
//! backend's standard envelopes are provided as [`ApiResponse`] and [`PaginatedResponse`].

pub mod analytics;
pub mod auth;
pub mod problems;
pub mod submissions;

pub use analytics::CsvDownload;
pub use auth::*;

// self
use crate::{_prelude::*, error::FieldErrors};

/// Standard response envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
	/// Whether the backend considers the call successful.
	#[serde(default)]
	pub success: bool,
	/// Human-readable outcome.
	#[serde(default)]
	pub message: String,
	/// Status code echoed by the backend.
	#[serde(default)]
	pub status_code: u16,
	/// Payload, when the call produced one.
	#[serde(default = "Option::default")]
	pub data: Option<T>,
	/// Field-keyed validation messages.
	#[serde(default)]
	pub errors: Option<FieldErrors>,
}
impl<T> ApiResponse<T> {
	/// Returns the payload of a successful envelope.
	pub fn into_data(self) -> Option<T> {
		if self.success { self.data } else { None }
	}
}

/// Page of results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
	/// Items on this page.
	pub items: Vec<T>,
	/// One-based page index.
	pub page_number: u32,
	/// Number of pages.
	pub total_pages: u32,
	/// Number of items across all pages.
	pub total_count: u64,
	/// Whether an earlier page exists.
	pub has_previous_page: bool,
	/// Whether a later page exists.
	pub has_next_page: bool,
}
