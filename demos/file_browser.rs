//! Walks a session through login, listing, upload, download, and a transparent refresh against
//! an in-process fake file server.
//!
//! 1. Implement [`HttpTransport`] so the fake server answers every [`ApiRequest`] locally.
//! 2. Build a [`SessionManager`] over the transport and run [`SessionManager::bootstrap`].
//! 3. Log in, then use [`SessionManager::files`] for the data calls.
//! 4. Expire the access credential on the server side and watch the next call refresh and
//!    replay without surfacing an error.

// std
use std::sync::{
	Arc,
	atomic::{AtomicU32, Ordering},
};
// crates.io
use color_eyre::Result;
use parking_lot::Mutex;
use reqwest::{
	StatusCode,
	header::{CONTENT_DISPOSITION, HeaderMap, HeaderValue},
};
use url::Url;
// self
use fileserver_session::{
	auth::Username,
	config::ServiceConfig,
	files::{FileUpload, Visibility},
	flows::SessionManager,
	http::{ApiBody, ApiRequest, ApiResponse, HttpTransport, MultipartValue, TransportFuture},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = Arc::new(FakeFileServer::default());
	let config = ServiceConfig::builder(Url::parse("https://files.example.com")?).build()?;
	let manager = SessionManager::builder(config)
		.store(Arc::new(MemoryStore::default()))
		.transport(server.clone())
		.build();
	let session = manager.bootstrap().await?;

	println!("After bootstrap the session is {}.", session.status());

	let session = manager.login(&Username::new("alice")?, "correct horse").await?;

	println!("Logged in as {}.", session.identity().unwrap_or("<unknown>"));

	let files = manager.files();

	files
		.upload(
			FileUpload::new("notes.txt", "text/plain", b"remember the milk".to_vec())
				.visibility(Visibility::Public),
		)
		.await?;

	for entry in files.list_all().await? {
		println!("Listed {} ({} bytes, id {}).", entry.file_name, entry.size, entry.id);
	}

	server.expire_access();

	let entries = files.list_public().await?;
	let download = files.download(&entries[0].id).await?;

	println!(
		"Downloaded {} after {} refresh exchange(s): {:?}.",
		download.file_name,
		manager.refresh_metrics().attempts(),
		String::from_utf8_lossy(&download.bytes),
	);

	manager.logout()?;

	println!("Logged out; the session is {}.", manager.session().status());

	Ok(())
}

#[derive(Default)]
struct FakeFileServer {
	generation: AtomicU32,
	files: Mutex<Vec<(String, Vec<u8>)>>,
}
impl FakeFileServer {
	fn expire_access(&self) {
		self.generation.fetch_add(1, Ordering::SeqCst);
	}

	fn current_access(&self) -> String {
		format!("access-{}", self.generation.load(Ordering::SeqCst))
	}

	fn tokens(&self) -> ApiResponse {
		let body = serde_json::json!({
			"accessToken": self.current_access(),
			"refreshToken": "refresh-demo",
		});

		respond(StatusCode::OK, body.to_string().into_bytes())
	}

	fn is_authorized(&self, request: &ApiRequest) -> bool {
		let expected = format!("Bearer {}", self.current_access());

		request.authorization().and_then(|value| value.to_str().ok()) == Some(expected.as_str())
	}

	fn handle(&self, request: &ApiRequest) -> ApiResponse {
		match request.path.as_str() {
			"/login" | "/refresh-token" => return self.tokens(),
			_ if !self.is_authorized(request) =>
				return respond(StatusCode::UNAUTHORIZED, Vec::new()),
			_ => {},
		}

		let mut files = self.files.lock();

		match request.path.trim_start_matches("/api/FileEntry") {
			"" => {
				let ApiBody::Multipart(fields) = &request.body else {
					return respond(StatusCode::BAD_REQUEST, Vec::new());
				};

				for field in fields {
					if let MultipartValue::File { file_name, bytes, .. } = &field.value {
						files.push((file_name.clone(), bytes.clone()));
					}
				}

				respond(StatusCode::CREATED, Vec::new())
			},
			"/all-private" => respond(StatusCode::OK, b"[]".to_vec()),
			"/all-public" => {
				let entries: Vec<_> = files
					.iter()
					.enumerate()
					.map(|(id, (name, bytes))| {
						serde_json::json!({
							"id": id,
							"fileName": name,
							"size": bytes.len(),
							"visibility": false,
						})
					})
					.collect();

				respond(StatusCode::OK, serde_json::to_vec(&entries).unwrap_or_default())
			},
			rest => {
				let (id, download) = match rest.trim_start_matches('/').split_once('/') {
					Some((id, "download")) => (id, true),
					_ => (rest.trim_start_matches('/'), false),
				};
				let Some((name, bytes)) = id.parse::<usize>().ok().and_then(|id| files.get(id))
				else {
					return respond(StatusCode::NOT_FOUND, Vec::new());
				};

				if !download {
					let entry = serde_json::json!({ "id": id, "fileName": name, "size": bytes.len() });

					return respond(StatusCode::OK, entry.to_string().into_bytes());
				}

				let mut response = respond(StatusCode::OK, bytes.clone());

				if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
				{
					response.headers.insert(CONTENT_DISPOSITION, value);
				}

				response
			},
		}
	}
}
impl HttpTransport for FakeFileServer {
	fn execute<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a, ApiResponse> {
		Box::pin(async move { Ok(self.handle(request)) })
	}
}

fn respond(status: StatusCode, body: Vec<u8>) -> ApiResponse {
	ApiResponse { status, headers: HeaderMap::new(), body }
}
