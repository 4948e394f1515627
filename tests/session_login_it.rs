mod common;

// crates.io
use httpmock::prelude::*;
use reqwest::StatusCode;
// self
use common::*;
use fileserver_session::{
	auth::SessionStatus,
	config::ServiceConfig,
	error::ErrorKind,
	flows::SessionManager,
	http::ApiRequest,
	store::{CredentialStore, MemoryStore},
};

#[tokio::test]
async fn login_persists_the_refresh_credential_and_authenticates_requests() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/login")
				.json_body(serde_json::json!({ "username": "alice", "password": "hunter2" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-1", "refresh-1"));
		})
		.await;
	let listing = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/FileEntry/all-private")
				.header("authorization", "Bearer access-1");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let (manager, store) = build_test_manager(&server.base_url());

	manager.bootstrap().await.expect("Bootstrap without a stored credential should succeed.");

	let session =
		manager.login(&username("alice"), "hunter2").await.expect("Login should succeed.");

	login.assert_async().await;

	assert_eq!(session.status(), SessionStatus::Authenticated);
	assert_eq!(session.identity(), Some("alice"));
	assert!(session.authenticated_at().is_some());
	assert_eq!(
		store.get(REFRESH_KEY).expect("Store read should succeed."),
		Some("refresh-1".into())
	);

	let entries = manager.files().list_private().await.expect("Listing should succeed.");

	listing.assert_async().await;

	assert!(entries.is_empty());
	assert_eq!(manager.refresh_metrics().attempts(), 0);
}

#[tokio::test]
async fn rejected_login_records_the_failure_until_acknowledged() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/login");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"message":"Invalid username or password"}"#);
		})
		.await;
	let (manager, store) = build_test_manager(&server.base_url());

	manager.bootstrap().await.expect("Bootstrap without a stored credential should succeed.");

	let err = manager
		.login(&username("alice"), "wrong")
		.await
		.expect_err("Login with bad credentials should fail.");

	login.assert_async().await;

	assert_eq!(err.kind(), ErrorKind::AuthRejected);
	assert_eq!(err.status(), Some(401));

	let session = manager.session();

	assert_eq!(session.status(), SessionStatus::AuthError);
	assert_eq!(session.last_error(), Some(ErrorKind::AuthRejected));
	assert!(store.is_empty());
	assert_eq!(manager.client().request_interceptor_count(), 0);

	let session = manager.acknowledge_error().expect("Acknowledging should succeed.");

	assert_eq!(session.status(), SessionStatus::Unauthenticated);
	assert_eq!(session.last_error(), None);
}

#[tokio::test]
async fn unreachable_login_is_transient() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/login");
			then.status(503).body("maintenance");
		})
		.await;

	let (manager, _store) = build_test_manager(&server.base_url());

	manager.bootstrap().await.expect("Bootstrap without a stored credential should succeed.");

	let err = manager
		.login(&username("alice"), "hunter2")
		.await
		.expect_err("Login against an unavailable service should fail.");

	assert_eq!(err.kind(), ErrorKind::Transient);
	assert_eq!(manager.session().last_error(), Some(ErrorKind::Transient));
}

#[tokio::test]
async fn exchange_endpoints_never_carry_a_bearer() {
	let transport = RecordingTransport::new(StatusCode::OK);
	let store = MemoryStore::default();
	let manager = SessionManager::builder(test_config("http://127.0.0.1:9"))
		.store(std::sync::Arc::new(store))
		.transport(transport.clone())
		.build();

	manager.bootstrap().await.expect("Bootstrap without a stored credential should succeed.");
	manager.login(&username("alice"), "hunter2").await.expect("Login should succeed.");

	let client = manager.client();

	client.send(ApiRequest::post("/refresh-token")).await.expect("Refresh call should succeed.");
	client.send(ApiRequest::post("/login/")).await.expect("Login call should succeed.");
	client
		.send(ApiRequest::get("/api/FileEntry/all-public"))
		.await
		.expect("Listing should succeed.");

	let bearers: Vec<_> = transport
		.requests()
		.iter()
		.map(|request| {
			request.authorization().and_then(|value| value.to_str().ok()).map(str::to_owned)
		})
		.collect();

	assert_eq!(bearers, [None, None, None, Some("Bearer access".to_owned())]);
}

#[tokio::test]
async fn logout_drops_the_bearer_and_clears_the_store() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-1", "refresh-1"));
		})
		.await;

	let public = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/all-public");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let (manager, store) = build_test_manager(&server.base_url());

	manager.bootstrap().await.expect("Bootstrap without a stored credential should succeed.");
	manager.login(&username("alice"), "hunter2").await.expect("Login should succeed.");

	let session = manager.logout().expect("Logout should succeed.");

	assert_eq!(session.status(), SessionStatus::Unauthenticated);
	assert_eq!(session.access_credential(), None);
	assert!(store.is_empty());
	assert_eq!(manager.client().request_interceptor_count(), 0);

	manager.files().list_public().await.expect("Public listing should not need a bearer.");
	public.assert_async().await;
}

#[test]
fn custom_endpoints_are_honoured_by_the_config() {
	let config = ServiceConfig::builder(
		url::Url::parse("https://files.example.com/").expect("Base URL fixture should parse."),
	)
	.login_path("/api/Auth/login")
	.refresh_path("/api/Auth/refresh")
	.refresh_key("session.refresh")
	.build()
	.expect("Custom configuration should be valid.");

	assert!(config.endpoints.is_exempt("/api/Auth/login"));
	assert!(!config.endpoints.is_exempt("/login"));
	assert_eq!(config.refresh_key, "session.refresh");
}
