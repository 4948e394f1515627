//! Shared fixtures for the integration suites.

#![allow(dead_code)]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use reqwest::{StatusCode, header::HeaderMap};
// self
pub use fileserver_session::_preludet::*;
use fileserver_session::{
	auth::{CredentialPair, CredentialSecret, Username},
	error::{TransientError, TransportError},
	flows::{SleepFuture, Sleeper, TokenAcquirer},
	http::{ApiFuture, ApiRequest, ApiResponse, HttpTransport, TransportFuture},
};

pub const REFRESH_KEY: &str = "refreshToken";

/// Token endpoint response body.
pub fn token_body(access: &str, refresh: &str) -> String {
	serde_json::json!({ "accessToken": access, "refreshToken": refresh }).to_string()
}

pub fn username(value: &str) -> Username {
	Username::new(value).expect("Username fixture should be valid.")
}

pub fn rejected() -> Error {
	Error::AuthRejected { status: Some(401), reason: "refresh credential revoked".into() }
}

pub fn transient() -> Error {
	TransientError::Endpoint { message: "service unavailable".into(), status: Some(503) }.into()
}

/// Acquirer that replays scripted outcomes and counts calls.
#[derive(Default)]
pub struct ScriptedAcquirer {
	outcomes: Mutex<VecDeque<Result<CredentialPair>>>,
	seen: Mutex<Vec<CredentialSecret>>,
	calls: AtomicUsize,
}
impl ScriptedAcquirer {
	pub fn new(outcomes: impl IntoIterator<Item = Result<CredentialPair>>) -> Arc<Self> {
		Arc::new(Self { outcomes: Mutex::new(outcomes.into_iter().collect()), ..Default::default() })
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn seen(&self) -> Vec<CredentialSecret> {
		self.seen.lock().clone()
	}

	fn next(&self) -> Result<CredentialPair> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.outcomes.lock().pop_front().unwrap_or_else(|| Err(transient()))
	}
}
impl TokenAcquirer for ScriptedAcquirer {
	fn acquire<'a>(&'a self, refresh: &'a CredentialSecret) -> ApiFuture<'a, CredentialPair> {
		self.seen.lock().push(refresh.clone());

		let outcome = self.next();

		Box::pin(async move { outcome })
	}

	fn login<'a>(
		&'a self,
		_username: &'a Username,
		_password: &'a str,
	) -> ApiFuture<'a, CredentialPair> {
		let outcome = self.next();

		Box::pin(async move { outcome })
	}
}

/// Sleeper that records requested delays without waiting.
#[derive(Default)]
pub struct RecordingSleeper {
	delays: Mutex<Vec<Duration>>,
}
impl RecordingSleeper {
	pub fn delays(&self) -> Vec<Duration> {
		self.delays.lock().clone()
	}
}
impl Sleeper for RecordingSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		self.delays.lock().push(duration);

		Box::pin(async {})
	}
}

/// Transport that records every request and answers with a fixed status.
pub struct RecordingTransport {
	status: StatusCode,
	requests: Mutex<Vec<ApiRequest>>,
}
impl RecordingTransport {
	pub fn new(status: StatusCode) -> Arc<Self> {
		Arc::new(Self { status, requests: Mutex::new(Vec::new()) })
	}

	pub fn requests(&self) -> Vec<ApiRequest> {
		self.requests.lock().clone()
	}
}
impl HttpTransport for RecordingTransport {
	fn execute<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a, ApiResponse> {
		self.requests.lock().push(request.clone());

		let status = self.status;

		Box::pin(async move {
			Ok::<_, TransportError>(ApiResponse {
				status,
				headers: HeaderMap::new(),
				body: token_body("access", "refresh").into_bytes(),
			})
		})
	}
}
