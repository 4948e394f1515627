//! Interceptor contracts and the request authenticator.
//!
//! [`Authenticator`] is a value built from an explicit credential snapshot. The session manager
//! ejects the old instance and registers a fresh one whenever the access credential changes, so
//! the interceptor never reads shared mutable state while a request is being prepared.

// self
use crate::{
	_prelude::*,
	auth::CredentialSecret,
	config::AuthEndpoints,
	http::{ApiClient, ApiFuture, ApiRequest, ApiResponse},
};

/// Hook that runs on every request before it reaches the transport.
pub trait RequestInterceptor
where
	Self: Send + Sync,
{
	/// Mutates `request` in place; an error aborts the send.
	fn intercept(&self, request: &mut ApiRequest) -> Result<()>;
}

/// Hook that observes every failed request.
///
/// Implementations either resolve the failure (typically by replaying the request through
/// `client`) or hand back an error, which may be the original one.
pub trait ResponseInterceptor
where
	Self: Send + Sync,
{
	/// Handles `error`, which was raised while sending a request through `client`.
	fn on_error<'a>(&'a self, client: &'a ApiClient, error: Error) -> ApiFuture<'a, ApiResponse>;
}

/// Attaches the current access credential to every non-authentication request.
#[derive(Clone, Debug)]
pub struct Authenticator {
	endpoints: AuthEndpoints,
	access: Option<CredentialSecret>,
}
impl Authenticator {
	/// Creates an authenticator over a credential snapshot.
	pub fn new(endpoints: AuthEndpoints, access: Option<CredentialSecret>) -> Self {
		Self { endpoints, access }
	}

	/// Credential snapshot applied by this authenticator.
	pub fn access(&self) -> Option<&CredentialSecret> {
		self.access.as_ref()
	}
}
impl RequestInterceptor for Authenticator {
	fn intercept(&self, request: &mut ApiRequest) -> Result<()> {
		if self.endpoints.is_exempt(&request.path) {
			return Ok(());
		}

		match &self.access {
			Some(access) => request.set_bearer(access),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::{AUTHORIZATION, HeaderValue};
	// self
	use super::*;

	fn bearer(request: &ApiRequest) -> Option<&str> {
		request.authorization().and_then(|value| value.to_str().ok())
	}

	#[test]
	fn authentication_endpoints_are_left_untouched() {
		let authenticator =
			Authenticator::new(AuthEndpoints::default(), Some(CredentialSecret::new("access")));

		for path in ["/login", "/refresh-token", "/refresh-token?x=1"] {
			let mut request = ApiRequest::post(path);

			authenticator.intercept(&mut request).expect("Exempt requests should pass through.");

			assert_eq!(bearer(&request), None, "{path}");
		}
	}

	#[test]
	fn ordinary_requests_receive_the_snapshot_credential() {
		let authenticator =
			Authenticator::new(AuthEndpoints::default(), Some(CredentialSecret::new("access")));
		let mut request = ApiRequest::get("/api/FileEntry/all-private");

		authenticator.intercept(&mut request).expect("Bearer should be applied.");

		assert_eq!(bearer(&request), Some("Bearer access"));
	}

	#[test]
	fn missing_credential_keeps_existing_headers() {
		let authenticator = Authenticator::new(AuthEndpoints::default(), None);
		let mut request = ApiRequest::get("/api/FileEntry/all-public");

		request.headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
		authenticator.intercept(&mut request).expect("Anonymous requests should pass through.");

		assert_eq!(bearer(&request), Some("Basic abc"));
	}
}
