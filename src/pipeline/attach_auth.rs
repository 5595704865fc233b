//! Header preparation: JSON content negotiation plus the bearer token, when one is stored.

// self
use crate::{auth::TokenSecret, http::OutboundRequest};

/// Header carrying the bearer token.
pub const AUTHORIZATION: &str = "authorization";
/// Header declaring the request body type.
pub const CONTENT_TYPE: &str = "content-type";
/// Header declaring the accepted response type.
pub const ACCEPT: &str = "accept";
/// Media type used for every request body.
pub const JSON: &str = "application/json";

/// Applies the default headers and attaches `Authorization: Bearer <token>` when `token` is
/// present.
///
/// A missing token is not an error: the request proceeds anonymously and any stale
/// `Authorization` header is removed.
pub fn apply(request: &mut OutboundRequest, token: Option<&TokenSecret>) {
	if request.header(CONTENT_TYPE).is_none() {
		request.set_header(CONTENT_TYPE, JSON);
	}
	if request.header(ACCEPT).is_none() {
		request.set_header(ACCEPT, JSON);
	}

	match token {
		Some(secret) => request.set_header(AUTHORIZATION, secret.bearer()),
		None => {
			request.remove_header(AUTHORIZATION);
		},
	}
}
