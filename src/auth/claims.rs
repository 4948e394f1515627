//! Identity extraction from access-credential claims.
//!
//! The session only needs a display name, so decoding is deliberately lenient: the payload is read
//! without signature verification and every malformed input yields `None` instead of an error.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::CredentialSecret};

/// Name claim emitted by ASP.NET Core identity servers.
pub const WS_IDENTITY_NAME_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";

/// Capability that turns an access credential into a display identity.
///
/// Implementations must never panic on malformed input; they return `None` instead.
pub trait IdentityDecoder
where
	Self: Send + Sync,
{
	/// Extracts the identity embedded in `access`, if any.
	fn decode_identity(&self, access: &CredentialSecret) -> Option<String>;
}

/// Decoder for JWT access credentials that looks up the first present claim from a list.
#[derive(Clone, Debug)]
pub struct JwtIdentityDecoder {
	claims: Vec<String>,
}
impl JwtIdentityDecoder {
	/// Creates a decoder that checks `claims` in order.
	pub fn with_claims<I, S>(claims: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { claims: claims.into_iter().map(Into::into).collect() }
	}

	/// Claims consulted, in priority order.
	pub fn claims(&self) -> &[String] {
		&self.claims
	}
}
impl Default for JwtIdentityDecoder {
	fn default() -> Self {
		Self::with_claims([WS_IDENTITY_NAME_CLAIM, "name", "unique_name"])
	}
}
impl IdentityDecoder for JwtIdentityDecoder {
	fn decode_identity(&self, access: &CredentialSecret) -> Option<String> {
		let claims = decode_payload(access.expose())?;

		self.claims.iter().find_map(|claim| match claims.get(claim) {
			Some(Value::String(value)) if !value.is_empty() => Some(value.clone()),
			_ => None,
		})
	}
}

/// Decodes the (unverified) JSON payload segment of a compact JWT.
pub fn decode_payload(token: &str) -> Option<Map<String, Value>> {
	let mut segments = token.split('.');
	let _header = segments.next()?;
	let payload = segments.next()?;
	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;

	match serde_json::from_slice(&bytes).ok()? {
		Value::Object(map) => Some(map),
		_ => None,
	}
}
