//! Token acquisition: the refresh and password login exchanges.
//!
//! Both endpoints accept a small JSON document and answer with
//! `{"accessToken": "...", "refreshToken": "..."}`. Failures are classified so callers only need
//! [`Error::kind`]: 401/403 is [`ErrorKind::AuthRejected`], everything else (network errors,
//! other statuses, malformed or incomplete bodies) is [`ErrorKind::Transient`].

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, CredentialSecret, Username},
	config::AuthEndpoints,
	error::TransientError,
	flows::common,
	http::{ApiClient, ApiFuture, ApiRequest},
};

/// Capability that exchanges credentials for a fresh access/refresh pair.
pub trait TokenAcquirer
where
	Self: Send + Sync,
{
	/// Exchanges a stored refresh credential for a new pair.
	fn acquire<'a>(&'a self, refresh: &'a CredentialSecret) -> ApiFuture<'a, CredentialPair>;

	/// Exchanges a username and password for a new pair.
	fn login<'a>(
		&'a self,
		username: &'a Username,
		password: &'a str,
	) -> ApiFuture<'a, CredentialPair>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequestDto<'a> {
	refresh_token: &'a str,
}

#[derive(Serialize)]
struct LoginRequestDto<'a> {
	username: &'a str,
	password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponseDto {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
}

/// [`TokenAcquirer`] that talks to the file server's authentication endpoints.
#[derive(Clone, Debug)]
pub struct HttpTokenService {
	client: Arc<ApiClient>,
	endpoints: AuthEndpoints,
}
impl HttpTokenService {
	/// Creates a service that sends exchanges through `client`.
	pub fn new(client: Arc<ApiClient>, endpoints: AuthEndpoints) -> Self {
		Self { client, endpoints }
	}

	async fn exchange(&self, request: ApiRequest) -> Result<CredentialPair> {
		let response =
			self.client.send(request).await.map_err(common::classify_exchange_failure)?;
		let status = Some(response.status.as_u16());
		let dto = response.json::<TokenResponseDto>()?;
		let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

		match (non_empty(dto.access_token), non_empty(dto.refresh_token)) {
			(Some(access), Some(refresh)) => Ok(CredentialPair::new(access, refresh)),
			_ => Err(TransientError::InvalidTokenResponse { status }.into()),
		}
	}
}
impl TokenAcquirer for HttpTokenService {
	fn acquire<'a>(&'a self, refresh: &'a CredentialSecret) -> ApiFuture<'a, CredentialPair> {
		Box::pin(async move {
			let request = ApiRequest::post(self.endpoints.refresh.as_str())
				.json(&RefreshRequestDto { refresh_token: refresh.expose() })?;

			self.exchange(request).await
		})
	}

	fn login<'a>(
		&'a self,
		username: &'a Username,
		password: &'a str,
	) -> ApiFuture<'a, CredentialPair> {
		Box::pin(async move {
			let request = ApiRequest::post(self.endpoints.login.as_str())
				.json(&LoginRequestDto { username: username.as_ref(), password })?;

			self.exchange(request).await
		})
	}
}
