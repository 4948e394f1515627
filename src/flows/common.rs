//! Shared failure classification for the acquisition, refresh, and bootstrap flows.

// crates.io
use reqwest::StatusCode;
// self
use crate::{_prelude::*, error::TransientError, http::ApiError};

/// `message` body value that marks a 403 as an expired credential.
pub const EXPIRED_CREDENTIAL_MESSAGE: &str = "Unauthorized";

/// Returns `true` when `error` signals an expired access credential.
///
/// That is any 401, or a 403 whose JSON body carries `"message": "Unauthorized"`.
pub fn is_expired_credential(error: &ApiError) -> bool {
	match error.status {
		StatusCode::UNAUTHORIZED => true,
		StatusCode::FORBIDDEN => error.message.as_deref() == Some(EXPIRED_CREDENTIAL_MESSAGE),
		_ => false,
	}
}

/// Maps a failed login/refresh exchange onto the acquisition taxonomy.
///
/// 401 and 403 reject the credential; every other status is transient. Non-API errors keep
/// their own classification.
pub(crate) fn classify_exchange_failure(error: Error) -> Error {
	let Error::Api(api) = error else {
		return error;
	};
	let status = api.status.as_u16();
	let message = api
		.message
		.clone()
		.unwrap_or_else(|| api.status.canonical_reason().unwrap_or("unknown status").to_owned());

	match api.status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
			Error::AuthRejected { status: Some(status), reason: message },
		_ => TransientError::Endpoint { message, status: Some(status) }.into(),
	}
}

/// Failure reported when no refresh credential is stored.
pub(crate) fn missing_refresh_credential() -> Error {
	Error::AuthRejected { status: None, reason: "no refresh credential is stored".into() }
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderMap;
	// self
	use super::*;
	use crate::http::{ApiRequest, ApiResponse};

	fn api_error(status: u16, body: &str) -> ApiError {
		ApiError::from_response(
			ApiRequest::get("/api/FileEntry/all-private"),
			ApiResponse {
				status: StatusCode::from_u16(status).expect("Status fixture should be valid."),
				headers: HeaderMap::new(),
				body: body.as_bytes().to_vec(),
			},
		)
	}

	#[test]
	fn forbidden_only_expires_with_the_unauthorized_message() {
		assert!(is_expired_credential(&api_error(401, "")));
		assert!(is_expired_credential(&api_error(403, r#"{"message":"Unauthorized"}"#)));
		assert!(!is_expired_credential(&api_error(403, r#"{"message":"Forbidden"}"#)));
		assert!(!is_expired_credential(&api_error(403, "")));
		assert!(!is_expired_credential(&api_error(500, r#"{"message":"Unauthorized"}"#)));
	}

	#[test]
	fn exchange_failures_split_into_rejected_and_transient() {
		let rejected = classify_exchange_failure(api_error(403, "").into());

		assert_eq!(rejected.kind(), ErrorKind::AuthRejected);
		assert_eq!(rejected.status(), Some(403));

		let transient = classify_exchange_failure(api_error(502, r#"{"message":"upstream"}"#).into());

		assert_eq!(transient.kind(), ErrorKind::Transient);
		assert!(transient.to_string().contains("upstream"));
		assert_eq!(missing_refresh_credential().kind(), ErrorKind::AuthRejected);
	}
}
