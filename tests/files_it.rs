mod common;

// crates.io
use httpmock::prelude::*;
// self
use common::*;
use fileserver_session::{
	auth::{CredentialSecret, FileId, SessionEvent},
	error::ErrorKind,
	files::{FileUpload, Visibility},
	flows::SessionManager,
};

fn sign_in(manager: &SessionManager) {
	manager
		.dispatch(SessionEvent::Login {
			identity: "alice".into(),
			access: CredentialSecret::new("access-1"),
			refresh: CredentialSecret::new("refresh-1"),
		})
		.expect("Seeding the session should succeed.");
}

fn file_id(value: &str) -> FileId {
	FileId::new(value).expect("File identifier fixture should be valid.")
}

#[tokio::test]
async fn list_all_returns_private_entries_first() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/all-private");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":1,"fileName":"diary.txt","size":12,"visibility":true}]"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/all-public");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":"2","fileName":"readme.md","visibility":false}]"#);
		})
		.await;

	let (manager, _store) = build_test_manager(&server.base_url());

	sign_in(&manager);

	let entries = manager.files().list_all().await.expect("Listing should succeed.");
	let names: Vec<_> = entries.iter().map(|entry| entry.file_name.as_str()).collect();

	assert_eq!(names, ["diary.txt", "readme.md"]);
	assert_eq!(entries[0].visibility, Some(Visibility::Private));
	assert_eq!(entries[1].visibility, Some(Visibility::Public));
}

#[tokio::test]
async fn upload_sends_a_multipart_form_with_the_bearer() {
	let server = MockServer::start_async().await;
	let upload = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/FileEntry")
				.header("authorization", "Bearer access-1")
				.header_exists("content-type");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					r#"{"id":9,"fileName":"hello.txt","size":11,"contentType":"text/plain","visibility":"Public"}"#,
				);
		})
		.await;
	let (manager, _store) = build_test_manager(&server.base_url());

	sign_in(&manager);

	let created = manager
		.files()
		.upload(
			FileUpload::new("hello.txt", "text/plain", b"hello world".to_vec())
				.visibility(Visibility::Public),
		)
		.await
		.expect("Upload should succeed.")
		.expect("The server echoed the created entry.");

	upload.assert_async().await;

	assert_eq!(created.id, file_id("9"));
	assert_eq!(created.size, 11);
	assert_eq!(created.visibility, Some(Visibility::Public));
}

#[tokio::test]
async fn upload_tolerates_an_empty_response() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/FileEntry");
			then.status(201);
		})
		.await;

	let (manager, _store) = build_test_manager(&server.base_url());

	sign_in(&manager);

	let created = manager
		.files()
		.upload(FileUpload::new("a.bin", "application/octet-stream", vec![0, 1, 2]))
		.await
		.expect("Upload should succeed.");

	assert_eq!(created, None);
}

#[tokio::test]
async fn download_prefers_the_content_disposition_name() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/4");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"id":4,"fileName":"stored-4","originalName":"report.pdf"}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/4/download");
			then.status(200)
				.header("content-type", "application/pdf")
				.header("content-disposition", r#"attachment; filename="Q3 report.pdf""#)
				.body("%PDF-1.7");
		})
		.await;

	let (manager, _store) = build_test_manager(&server.base_url());

	sign_in(&manager);

	let file = manager.files().download(&file_id("4")).await.expect("Download should succeed.");

	assert_eq!(file.file_name, "Q3 report.pdf");
	assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
	assert_eq!(file.bytes, b"%PDF-1.7");
}

#[tokio::test]
async fn download_falls_back_to_the_original_name() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/5");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"id":5,"fileName":"stored-5","originalName":"photo.png"}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/5/download");
			then.status(200).header("content-type", "image/png").body("png");
		})
		.await;

	let (manager, _store) = build_test_manager(&server.base_url());

	sign_in(&manager);

	let file = manager.files().download(&file_id("5")).await.expect("Download should succeed.");

	assert_eq!(file.file_name, "photo.png");
}

#[tokio::test]
async fn delete_and_metadata_surface_api_failures() {
	let server = MockServer::start_async().await;
	let deleted = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/FileEntry/3").header("authorization", "Bearer access-1");
			then.status(204);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/FileEntry/404");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"message":"File not found"}"#);
		})
		.await;

	let (manager, _store) = build_test_manager(&server.base_url());

	sign_in(&manager);

	manager.files().delete(&file_id("3")).await.expect("Delete should succeed.");
	deleted.assert_async().await;

	let err = manager
		.files()
		.metadata(&file_id("404"))
		.await
		.expect_err("A missing file should surface as an API error.");

	assert_eq!(err.kind(), ErrorKind::Api);
	assert_eq!(err.status(), Some(404));
	assert!(manager.is_authenticated());
}
