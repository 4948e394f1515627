//! Service configuration: base URL, authentication endpoints, storage key, and bootstrap policy.
//!
//! [`ServiceConfig`] is immutable once built; [`ServiceConfigBuilder`] validates every field so
//! the flows can rely on well-formed paths and a non-degenerate retry policy.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating a [`ServiceConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ServiceConfigError {
	/// Base URL must use HTTP or HTTPS.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL must be able to carry request paths.
	#[error("The base URL cannot be used as a base: {url}.")]
	CannotBeBase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be absolute.
	#[error("The {endpoint} path must start with `/`: {path}.")]
	RelativePath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Login and refresh endpoints must differ.
	#[error("The login and refresh paths must differ.")]
	DuplicateEndpoints,
	/// Storage key must not be blank.
	#[error("The refresh credential storage key cannot be empty.")]
	EmptyStorageKey,
	/// Bootstrap needs at least one attempt.
	#[error("Bootstrap must attempt at least once.")]
	NoBootstrapAttempts,
	/// Backoff unit must be positive.
	#[error("The bootstrap backoff unit must be positive.")]
	NonPositiveBackoff,
}

/// Paths of the two authentication endpoints.
///
/// Both are exempt from bearer injection and from refresh interception.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// Password login endpoint.
	pub login: String,
	/// Refresh-credential exchange endpoint.
	pub refresh: String,
}
impl AuthEndpoints {
	/// Returns `true` when `path` targets the login or refresh endpoint.
	///
	/// Query strings and trailing slashes are ignored.
	pub fn is_exempt(&self, path: &str) -> bool {
		let path = normalize_path(path);

		path == normalize_path(&self.login) || path == normalize_path(&self.refresh)
	}
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self { login: "/login".into(), refresh: "/refresh-token".into() }
	}
}

/// Retry policy for the startup rehydration pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPolicy {
	/// Maximum number of acquisition attempts.
	pub max_attempts: u32,
	/// Unit of the linear backoff; the delay after attempt `n` is `n × backoff_unit`.
	pub backoff_unit: Duration,
}
impl BootstrapPolicy {
	/// Delay to wait after the given (1-based) failed attempt.
	pub fn delay_after(&self, attempt: u32) -> Duration {
		self.backoff_unit.saturating_mul(i32::try_from(attempt).unwrap_or(i32::MAX))
	}
}
impl Default for BootstrapPolicy {
	fn default() -> Self {
		Self { max_attempts: 3, backoff_unit: Duration::seconds(1) }
	}
}

/// Immutable configuration consumed by the session manager and the file API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
	/// Base URL every request path is appended to.
	pub base_url: Url,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Credential store key holding the refresh credential.
	pub refresh_key: String,
	/// Startup rehydration policy.
	pub bootstrap: BootstrapPolicy,
}
impl ServiceConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ServiceConfigBuilder {
		ServiceConfigBuilder::new(base_url)
	}

	fn validate(&self) -> Result<(), ServiceConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ServiceConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ServiceConfigError::CannotBeBase { url: self.base_url.to_string() });
		}

		validate_path("login", &self.endpoints.login)?;
		validate_path("refresh", &self.endpoints.refresh)?;

		if normalize_path(&self.endpoints.login) == normalize_path(&self.endpoints.refresh) {
			return Err(ServiceConfigError::DuplicateEndpoints);
		}
		if self.refresh_key.trim().is_empty() {
			return Err(ServiceConfigError::EmptyStorageKey);
		}
		if self.bootstrap.max_attempts == 0 {
			return Err(ServiceConfigError::NoBootstrapAttempts);
		}
		if !self.bootstrap.backoff_unit.is_positive() {
			return Err(ServiceConfigError::NonPositiveBackoff);
		}

		Ok(())
	}
}

/// Builder for [`ServiceConfig`] values.
#[derive(Debug)]
pub struct ServiceConfigBuilder {
	/// Base URL of the file server.
	pub base_url: Url,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Credential store key holding the refresh credential.
	pub refresh_key: String,
	/// Startup rehydration policy.
	pub bootstrap: BootstrapPolicy,
}
impl ServiceConfigBuilder {
	const DEFAULT_REFRESH_KEY: &'static str = "refreshToken";

	/// Creates a new builder seeded with defaults for the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: AuthEndpoints::default(),
			refresh_key: Self::DEFAULT_REFRESH_KEY.into(),
			bootstrap: BootstrapPolicy::default(),
		}
	}

	/// Overrides the login endpoint path (defaults to `/login`).
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the refresh endpoint path (defaults to `/refresh-token`).
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the credential store key (defaults to `refreshToken`).
	pub fn refresh_key(mut self, key: impl Into<String>) -> Self {
		self.refresh_key = key.into();

		self
	}

	/// Overrides the number of bootstrap attempts (defaults to 3).
	pub fn bootstrap_attempts(mut self, attempts: u32) -> Self {
		self.bootstrap.max_attempts = attempts;

		self
	}

	/// Overrides the bootstrap backoff unit (defaults to one second).
	pub fn backoff_unit(mut self, unit: Duration) -> Self {
		self.bootstrap.backoff_unit = unit;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ServiceConfig, ServiceConfigError> {
		let config = ServiceConfig {
			base_url: self.base_url,
			endpoints: self.endpoints,
			refresh_key: self.refresh_key,
			bootstrap: self.bootstrap,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ServiceConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ServiceConfigError::RelativePath { endpoint, path: path.to_owned() })
	}
}

fn normalize_path(path: &str) -> &str {
	let path = path.split(['?', '#']).next().unwrap_or(path);
	let trimmed = path.trim_end_matches('/');

	if trimmed.is_empty() { "/" } else { trimmed }
}
