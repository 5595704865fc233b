//! Failure normalization: every transport failure, non-2xx response, and undecodable body
//! becomes an [`ApiError`].

// self
use crate::{
	_prelude::*,
	error::FieldErrors,
	http::{RawResponse, TransportError},
};

/// Normalizes a failure that produced no response.
pub fn from_transport(err: &TransportError) -> ApiError {
	match err {
		TransportError::Timeout => ApiError::timeout(),
		TransportError::Network { .. } => ApiError::network(),
		TransportError::InvalidRequest { message } => ApiError::invalid_request(message.clone()),
	}
}

/// Normalizes a non-2xx response.
///
/// The message prefers the body's `message` field when it is a non-empty string, and the
/// `errors` field is kept when it is a map of field names to message lists (a single string is
/// accepted as a one-element list).
pub fn from_response(response: &RawResponse) -> ApiError {
	let body = serde_json::from_slice::<serde_json::Value>(&response.body).ok();
	let message = body
		.as_ref()
		.and_then(|value| value.get("message"))
		.and_then(serde_json::Value::as_str)
		.map(str::trim)
		.filter(|message| !message.is_empty())
		.unwrap_or(ApiError::HTTP_FALLBACK);
	let mut error = ApiError::new(ApiErrorKind::Http, response.status, message);

	if let Some(errors) = body.as_ref().and_then(|value| value.get("errors")).and_then(field_errors)
	{
		error = error.with_errors(errors);
	}

	error
}

/// Decodes a successful JSON body, treating an empty body as `null`.
pub fn decode_json<R>(response: &RawResponse) -> Result<R, ApiError>
where
	R: DeserializeOwned,
{
	let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
		b"null"
	} else {
		&response.body
	};
	let de = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(de).map_err(|err| {
		ApiError::new(
			ApiErrorKind::Decode,
			response.status,
			format!("Response body could not be decoded at `{}`: {}", err.path(), err.inner()),
		)
	})
}

fn field_errors(value: &serde_json::Value) -> Option<FieldErrors> {
	let object = value.as_object()?;
	let mut errors = FieldErrors::new();

	for (field, messages) in object {
		let messages = match messages {
			serde_json::Value::Array(items) =>
				items.iter().filter_map(|item| item.as_str().map(str::to_owned)).collect(),
			serde_json::Value::String(single) => vec![single.clone()],
			_ => continue,
		};

		errors.insert(field.clone(), messages);
	}

	if errors.is_empty() { None } else { Some(errors) }
}
