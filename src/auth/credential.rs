//! Credential wrappers that keep bearer material out of logs.

// self
use crate::_prelude::*;

/// Redacted credential wrapper for access and refresh tokens.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialSecret(String);
impl CredentialSecret {
	/// Wraps a new credential string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner credential. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Renders the credential as an `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for CredentialSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for CredentialSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CredentialSecret").field(&"<redacted>").finish()
	}
}
impl Display for CredentialSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access and refresh credentials issued together by the login and refresh endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialPair {
	/// Short-lived bearer credential.
	pub access: CredentialSecret,
	/// Longer-lived credential used solely to mint a new access credential.
	pub refresh: CredentialSecret,
}
impl CredentialPair {
	/// Pairs an access credential with its refresh credential.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self { access: CredentialSecret::new(access), refresh: CredentialSecret::new(refresh) }
	}
}
