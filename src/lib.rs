//! Session-token lifecycle manager for file-server clients: single-flight refresh, an
//! interceptor-aware transport, and bootstrap rehydration in one crate.
//!
//! The [`flows::SessionManager`] owns the in-memory session, mirrors the refresh credential into a
//! [`store::CredentialStore`], attaches bearer credentials to outgoing requests through
//! [`intercept::Authenticator`], and recovers from expired credentials with exactly one refresh
//! call in flight at a time. [`files::FileApi`] is the thin data layer riding on top of it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod flows;
pub mod http;
pub mod intercept;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::ServiceConfig,
		flows::SessionManager,
		http::ReqwestTransport,
		store::MemoryStore,
	};

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport(base_url: Url) -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client, base_url)
	}

	/// Builds a service configuration pointing at the provided mock server base URL.
	///
	/// Bootstrap backoff is shortened to a millisecond so retry tests stay fast.
	pub fn test_config(base_url: &str) -> ServiceConfig {
		ServiceConfig::builder(Url::parse(base_url).expect("Mock server URL should parse."))
			.backoff_unit(Duration::milliseconds(1))
			.build()
			.expect("Test service configuration should be valid.")
	}

	/// Constructs a [`SessionManager`] backed by an in-memory credential store and the reqwest
	/// transport used across tests. The returned store shares state with the manager's.
	pub fn build_test_manager(base_url: &str) -> (Arc<SessionManager>, MemoryStore) {
		let config = test_config(base_url);
		let store = MemoryStore::default();
		let transport = Arc::new(test_reqwest_transport(config.base_url.clone()));
		let manager =
			SessionManager::builder(config).store(Arc::new(store.clone())).transport(transport).build();

		(manager, store)
	}

	/// Encodes an unsigned JWT whose payload carries the provided JSON claims.
	pub fn unsigned_jwt(claims: &serde_json::Value) -> String {
		// crates.io
		use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

		format!("{header}.{payload}.")
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::{Arc, Weak},
	};

	pub use async_lock::OnceCell as AsyncOnceCell;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, ErrorKind, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, fileserver_session as _, httpmock as _};
