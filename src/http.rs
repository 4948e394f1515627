//! Request/response model and the transport seam of the network layer.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack: it executes one
//! [`ApiRequest`] and returns the raw [`ApiResponse`] whatever its status. Interception,
//! status classification, and replay live one level up in [`client::ApiClient`], so custom
//! transports (and test doubles) stay trivial. [`ReqwestTransport`] is the default
//! implementation.

pub mod client;

pub use client::{ApiClient, ApiFuture, InterceptorId};

// crates.io
use reqwest::{
	Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
	multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::CredentialSecret,
	error::{ConfigError, TransientError, TransportError},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Executes API requests against the file server.
///
/// Implementations must return every response they receive, success or not, and only fail for
/// transport-level problems (DNS, TCP, TLS, malformed URLs).
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and collects the full response body.
	fn execute<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a, ApiResponse>;
}

/// Body of an [`ApiRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ApiBody {
	/// No body.
	#[default]
	Empty,
	/// Pre-serialized JSON document.
	Json(Vec<u8>),
	/// `multipart/form-data` fields, encoded by the transport at send time.
	Multipart(Vec<MultipartField>),
}

/// A single `multipart/form-data` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartField {
	/// Form field name.
	pub name: String,
	/// Field payload.
	pub value: MultipartValue,
}
impl MultipartField {
	/// Builds a plain text field.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: MultipartValue::Text(value.into()) }
	}

	/// Builds a file field.
	pub fn file(
		name: impl Into<String>,
		file_name: impl Into<String>,
		content_type: Option<String>,
		bytes: Vec<u8>,
	) -> Self {
		Self {
			name: name.into(),
			value: MultipartValue::File { file_name: file_name.into(), content_type, bytes },
		}
	}
}

/// Payload of a [`MultipartField`].
#[derive(Clone, PartialEq, Eq)]
pub enum MultipartValue {
	/// Plain text value.
	Text(String),
	/// File upload.
	File {
		/// File name reported to the server.
		file_name: String,
		/// MIME type, if known.
		content_type: Option<String>,
		/// Raw file contents.
		bytes: Vec<u8>,
	},
}
impl Debug for MultipartValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
			Self::File { file_name, content_type, bytes } => f
				.debug_struct("File")
				.field("file_name", file_name)
				.field("content_type", content_type)
				.field("len", &bytes.len())
				.finish(),
		}
	}
}

/// Outgoing request, relative to the transport's base URL.
///
/// Requests are cheap to clone so a failed call can be replayed after a credential refresh.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path (and optional query) appended to the base URL; must start with `/`.
	pub path: String,
	/// Extra request headers.
	pub headers: HeaderMap,
	/// Request body.
	pub body: ApiBody,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: ApiBody::Empty,
			retried: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let bytes =
			serde_json::to_vec(body).map_err(|source| ConfigError::RequestBody { source })?;

		self.body = ApiBody::Json(bytes);

		Ok(self)
	}

	/// Replaces the body with multipart fields.
	pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
		self.body = ApiBody::Multipart(fields);

		self
	}

	/// Sets `Authorization: Bearer <credential>`, replacing any previous value.
	pub fn set_bearer(&mut self, credential: &CredentialSecret) -> Result<()> {
		let mut value = HeaderValue::from_str(&credential.bearer())
			.map_err(|_| ConfigError::InvalidHeaderValue { header: "Authorization" })?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(())
	}

	/// Returns the current `Authorization` header, if any.
	pub fn authorization(&self) -> Option<&HeaderValue> {
		self.headers.get(AUTHORIZATION)
	}

	/// Returns `true` once the request has been replayed after a credential refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

/// Fully buffered response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Deserializes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, TransientError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			TransientError::MalformedResponse { source, status: Some(self.status.as_u16()) }
		})
	}
}

/// Non-success response to an [`ApiRequest`].
///
/// Carries the originating request so interceptors can replay it.
#[derive(Debug, ThisError)]
#[error("Request to `{}` failed with status {}.", .request.path, .status)]
pub struct ApiError {
	/// Request that produced the failure.
	pub request: ApiRequest,
	/// HTTP status.
	pub status: StatusCode,
	/// `message` field of a JSON error body, when present.
	pub message: Option<String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiError {
	/// Builds an error from a non-success response.
	pub fn from_response(request: ApiRequest, response: ApiResponse) -> Self {
		let message = serde_json::from_slice::<serde_json::Value>(&response.body)
			.ok()
			.and_then(|value| value.get("message")?.as_str().map(str::to_owned));

		Self { request, status: response.status, message, body: response.body }
	}
}

/// Default [`HttpTransport`] backed by [`ReqwestClient`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
impl ReqwestTransport {
	/// Creates a transport with a default reqwest client.
	pub fn new(base_url: Url) -> Self {
		Self::with_client(ReqwestClient::default(), base_url)
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url }
	}

	/// Base URL that request paths are appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn url_for(&self, path: &str) -> Result<Url, TransportError> {
		let raw = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));

		Url::parse(&raw).map_err(|source| TransportError::InvalidUrl { url: raw, source })
	}

	fn form(fields: &[MultipartField]) -> Result<Form, TransportError> {
		let mut form = Form::new();

		for field in fields {
			form = match &field.value {
				MultipartValue::Text(value) => form.text(field.name.clone(), value.clone()),
				MultipartValue::File { file_name, content_type, bytes } => {
					let mut part = Part::bytes(bytes.clone()).file_name(file_name.clone());

					if let Some(content_type) = content_type {
						part = part.mime_str(content_type)?;
					}

					form.part(field.name.clone(), part)
				},
			};
		}

		Ok(form)
	}
}
impl HttpTransport for ReqwestTransport {
	fn execute<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a, ApiResponse> {
		Box::pin(async move {
			let url = self.url_for(&request.path)?;
			let mut builder =
				self.client.request(request.method.clone(), url).headers(request.headers.clone());

			builder = match &request.body {
				ApiBody::Empty => builder,
				ApiBody::Json(bytes) => builder
					.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
					.body(bytes.clone()),
				ApiBody::Multipart(fields) => builder.multipart(Self::form(fields)?),
			};

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}
