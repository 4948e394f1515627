//! Crate-level error types shared across flows, stores, and the network layer.

// self
use crate::{_prelude::*, http::ApiError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; safe to retry.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The service rejected the refresh credential (or the login credentials) outright.
	#[error("Service rejected the credential: {reason}.")]
	AuthRejected {
		/// HTTP status code, when the rejection came from a response.
		status: Option<u16>,
		/// Service- or client-supplied reason string.
		reason: String,
	},
	/// An expired-credential failure hit a request that was already replayed once.
	#[error("Request to `{}` failed again after a credential refresh.", .0.request.path)]
	AlreadyRetried(Box<ApiError>),
	/// Failure fanned out to requests that waited behind another caller's refresh.
	#[error(transparent)]
	Refresh(#[from] RefreshFailure),
	/// Non-success response for an ordinary API request.
	#[error(transparent)]
	Api(Box<ApiError>),
}
impl Error {
	/// Classifies the error into the taxonomy that drives logout and retry decisions.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Storage(_) => ErrorKind::Storage,
			Self::Config(_) => ErrorKind::Config,
			Self::Transient(_) | Self::Transport(_) => ErrorKind::Transient,
			Self::AuthRejected { .. } => ErrorKind::AuthRejected,
			Self::AlreadyRetried(_) => ErrorKind::AlreadyRetried,
			Self::Refresh(failure) => failure.kind,
			Self::Api(_) => ErrorKind::Api,
		}
	}

	/// Returns the HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthRejected { status, .. } => *status,
			Self::Transient(err) => err.status(),
			Self::AlreadyRetried(api) | Self::Api(api) => Some(api.status.as_u16()),
			_ => None,
		}
	}
}
impl From<ApiError> for Error {
	fn from(e: ApiError) -> Self {
		Self::Api(Box::new(e))
	}
}

/// Failure taxonomy used by the session state machine and the refresh policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
	/// Credential is invalid; terminal, forces logout, never retried.
	AuthRejected,
	/// Network or server hiccup (malformed responses included); retryable.
	Transient,
	/// Expired-credential failure on a request that was already replayed; forces logout.
	AlreadyRetried,
	/// Ordinary API request failed with a non-success status.
	Api,
	/// Credential store failure.
	Storage,
	/// Local configuration problem.
	Config,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AuthRejected => "auth_rejected",
			Self::Transient => "transient",
			Self::AlreadyRetried => "already_retried",
			Self::Api => "api",
			Self::Storage => "storage",
			Self::Config => "config",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Clonable summary of a failed refresh, delivered to every queued waiter.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Credential refresh failed: {message}")]
pub struct RefreshFailure {
	/// Classification of the underlying failure.
	pub kind: ErrorKind,
	/// Rendered message of the underlying failure.
	pub message: String,
}
impl RefreshFailure {
	/// Summarizes an error so it can be shared with every waiter.
	pub fn from_error(err: &Error) -> Self {
		Self { kind: err.kind(), message: err.to_string() }
	}

	/// Failure delivered when the refreshing caller went away before finishing.
	pub fn abandoned() -> Self {
		Self {
			kind: ErrorKind::Transient,
			message: "the refreshing request was dropped before it completed".into(),
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Service configuration failed validation.
	#[error(transparent)]
	Service(#[from] crate::config::ServiceConfigError),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// A credential contains characters that are not valid in an HTTP header.
	#[error("Credential cannot be used as an `{header}` header value.")]
	InvalidHeaderValue {
		/// Header that was being populated.
		header: &'static str,
	},
	/// Identifier validation failed.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Service returned an unexpected but non-fatal response.
	#[error("Service returned an unexpected response: {message}.")]
	Endpoint {
		/// Service- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Service responded with JSON that could not be parsed.
	#[error("Service returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint omitted the access or refresh credential.
	#[error("Service returned an invalid token response.")]
	InvalidTokenResponse {
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransientError {
	/// Returns the HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Endpoint { status, .. }
			| Self::MalformedResponse { status, .. }
			| Self::InvalidTokenResponse { status } => *status,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the file server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// URL that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the file server.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn transport_and_transient_errors_share_a_kind() {
		let transport: Error = TransportError::Io(std::io::Error::other("reset")).into();
		let transient: Error =
			TransientError::InvalidTokenResponse { status: Some(200) }.into();

		assert_eq!(transport.kind(), ErrorKind::Transient);
		assert_eq!(transient.kind(), ErrorKind::Transient);
		assert_eq!(transient.status(), Some(200));
	}

	#[test]
	fn refresh_failure_keeps_the_original_classification() {
		let err = Error::AuthRejected { status: Some(401), reason: "expired".into() };
		let failure = RefreshFailure::from_error(&err);
		let fanned_out: Error = failure.clone().into();

		assert_eq!(failure.kind, ErrorKind::AuthRejected);
		assert_eq!(fanned_out.kind(), ErrorKind::AuthRejected);
		assert!(fanned_out.to_string().contains("expired"));
	}
}
