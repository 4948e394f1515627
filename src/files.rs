//! File data layer: listing, upload, download, and deletion of file-server entries.
//!
//! [`FileApi`] only knows the `/api/FileEntry` routes. Authentication is entirely the business
//! of the client's interceptors, so every call here transparently benefits from bearer injection
//! and single-flight refresh.

// crates.io
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::{Deserializer, Serializer, de::Error as _};
// self
use crate::{
	_prelude::*,
	auth::FileId,
	http::{ApiClient, ApiRequest, MultipartField},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

const FILE_ENTRY_PATH: &str = "/api/FileEntry";

/// Who may see a stored file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
	/// Only the owner.
	Private,
	/// Everyone.
	Public,
}
impl Visibility {
	/// Wire label used by the upload form.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Private => "Private",
			Self::Public => "Public",
		}
	}
}
impl Display for Visibility {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl Serialize for Visibility {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}
impl<'de> Deserialize<'de> for Visibility {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		// Listings report a private flag; the upload form uses labels.
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Private(bool),
			Label(String),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Private(true) => Ok(Self::Private),
			Raw::Private(false) => Ok(Self::Public),
			Raw::Label(label) if label.eq_ignore_ascii_case("private") => Ok(Self::Private),
			Raw::Label(label) if label.eq_ignore_ascii_case("public") => Ok(Self::Public),
			Raw::Label(label) => Err(D::Error::custom(format!("unknown visibility `{label}`"))),
		}
	}
}

/// Metadata of a stored file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
	/// Server-assigned identifier.
	#[serde(deserialize_with = "deserialize_file_id")]
	pub id: FileId,
	/// Display file name.
	#[serde(default)]
	pub file_name: String,
	/// Name of the file as originally uploaded.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub original_name: Option<String>,
	/// Size in bytes.
	#[serde(default)]
	pub size: u64,
	/// MIME type.
	#[serde(default)]
	pub content_type: String,
	/// Visibility, when reported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub visibility: Option<Visibility>,
}

/// File to upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
	/// File name reported to the server.
	pub file_name: String,
	/// MIME type.
	pub content_type: String,
	/// Who may see the file.
	pub visibility: Visibility,
	/// Raw file contents.
	pub bytes: Vec<u8>,
}
impl FileUpload {
	/// Creates a private upload.
	pub fn new(
		file_name: impl Into<String>,
		content_type: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		Self {
			file_name: file_name.into(),
			content_type: content_type.into(),
			visibility: Visibility::Private,
			bytes: bytes.into(),
		}
	}

	/// Overrides the visibility.
	pub fn visibility(mut self, visibility: Visibility) -> Self {
		self.visibility = visibility;

		self
	}

	fn into_fields(self) -> Vec<MultipartField> {
		let size = self.bytes.len().to_string();

		vec![
			MultipartField::file(
				"File",
				self.file_name.clone(),
				Some(self.content_type.clone()),
				self.bytes,
			),
			MultipartField::text("FileName", self.file_name),
			MultipartField::text("Size", size),
			MultipartField::text("ContentType", self.content_type),
			MultipartField::text("Visibility", self.visibility.as_str()),
		]
	}
}

/// Downloaded file contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedFile {
	/// Resolved file name.
	pub file_name: String,
	/// MIME type reported by the download response, if any.
	pub content_type: Option<String>,
	/// Raw file contents.
	pub bytes: Vec<u8>,
}

/// File-server data layer over an authenticated [`ApiClient`].
#[derive(Clone, Debug)]
pub struct FileApi {
	client: Arc<ApiClient>,
}
impl FileApi {
	/// Creates a data layer over `client`.
	pub fn new(client: Arc<ApiClient>) -> Self {
		Self { client }
	}

	/// Lists every public file.
	pub async fn list_public(&self) -> Result<Vec<FileEntry>> {
		self.observe("list_public", self.list("all-public")).await
	}

	/// Lists the caller's private files.
	pub async fn list_private(&self) -> Result<Vec<FileEntry>> {
		self.observe("list_private", self.list("all-private")).await
	}

	/// Lists private files followed by public files.
	pub async fn list_all(&self) -> Result<Vec<FileEntry>> {
		self.observe("list_all", async {
			let mut entries = self.list("all-private").await?;

			entries.extend(self.list("all-public").await?);

			Ok(entries)
		})
		.await
	}

	/// Uploads a file; returns the created entry when the server echoes it back.
	pub async fn upload(&self, upload: FileUpload) -> Result<Option<FileEntry>> {
		self.observe("upload", async move {
			let request = ApiRequest::post(FILE_ENTRY_PATH).multipart(upload.into_fields());
			let response = self.client.send(request).await?;

			if response.body.iter().all(u8::is_ascii_whitespace) {
				return Ok(None);
			}

			Ok(Some(response.json()?))
		})
		.await
	}

	/// Deletes a file.
	pub async fn delete(&self, id: &FileId) -> Result<()> {
		self.observe("delete", async {
			self.client.send(ApiRequest::delete(entry_path(id))).await?;

			Ok(())
		})
		.await
	}

	/// Fetches a file's metadata.
	pub async fn metadata(&self, id: &FileId) -> Result<FileEntry> {
		self.observe("metadata", self.fetch_metadata(id)).await
	}

	/// Downloads a file.
	///
	/// The name comes from the `Content-Disposition` header when present, otherwise from the
	/// entry's original (or display) name.
	pub async fn download(&self, id: &FileId) -> Result<DownloadedFile> {
		self.observe("download", async {
			let entry = self.fetch_metadata(id).await?;
			let response =
				self.client.send(ApiRequest::get(format!("{}/download", entry_path(id)))).await?;
			let file_name = response
				.headers
				.get(CONTENT_DISPOSITION)
				.and_then(|value| value.to_str().ok())
				.and_then(disposition_file_name)
				.or(entry.original_name)
				.unwrap_or(entry.file_name);
			let content_type = response
				.headers
				.get(CONTENT_TYPE)
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned);

			Ok(DownloadedFile { file_name, content_type, bytes: response.body })
		})
		.await
	}

	async fn list(&self, scope: &str) -> Result<Vec<FileEntry>> {
		let request = ApiRequest::get(format!("{FILE_ENTRY_PATH}/{scope}"));
		let response = self.client.send(request).await?;

		Ok(response.json()?)
	}

	async fn fetch_metadata(&self, id: &FileId) -> Result<FileEntry> {
		let response = self.client.send(ApiRequest::get(entry_path(id))).await?;

		Ok(response.json()?)
	}

	async fn observe<T, Fut>(&self, stage: &'static str, fut: Fut) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		const KIND: OpKind = OpKind::Transfer;

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = OpSpan::new(KIND, stage).instrument(fut).await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}
}

fn entry_path(id: &FileId) -> String {
	format!("{FILE_ENTRY_PATH}/{id}")
}

fn deserialize_file_id<'de, D>(deserializer: D) -> Result<FileId, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(u64),
		Text(String),
	}

	let raw = match Raw::deserialize(deserializer)? {
		Raw::Number(number) => number.to_string(),
		Raw::Text(text) => text,
	};

	FileId::new(raw).map_err(D::Error::custom)
}

/// Extracts the first `filename` parameter of a `Content-Disposition` header.
///
/// Quotes are stripped, and so is the `UTF-8''` charset prefix of extended (`filename*`) values.
fn disposition_file_name(header: &str) -> Option<String> {
	header.split(';').find_map(|param| {
		let (key, value) = param.split_once('=')?;

		if !key.trim().to_ascii_lowercase().starts_with("filename") {
			return None;
		}

		let value = value.trim();
		let value = value.strip_prefix("UTF-8''").unwrap_or(value);
		let value = value.replace(['"', '\''], "");

		(!value.is_empty()).then_some(value)
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn disposition_parsing_prefers_the_first_filename() {
		assert_eq!(
			disposition_file_name(r#"attachment; filename="report.pdf"; filename*=UTF-8''r.pdf"#),
			Some("report.pdf".into())
		);
		assert_eq!(
			disposition_file_name("attachment; filename*=UTF-8''notes.txt"),
			Some("notes.txt".into())
		);
		assert_eq!(disposition_file_name("inline"), None);
		assert_eq!(disposition_file_name(r#"attachment; filename="""#), None);
	}

	#[test]
	fn entries_accept_flags_labels_and_numeric_ids() {
		let entries: Vec<FileEntry> = serde_json::from_str(
			r#"[
				{"id":7,"fileName":"a.txt","size":3,"contentType":"text/plain","visibility":true},
				{"id":"b-2","fileName":"b.txt","originalName":"B.txt","visibility":"Public"}
			]"#,
		)
		.expect("File entries should deserialize.");

		assert_eq!(entries[0].id.as_ref(), "7");
		assert_eq!(entries[0].visibility, Some(Visibility::Private));
		assert_eq!(entries[1].original_name.as_deref(), Some("B.txt"));
		assert_eq!(entries[1].visibility, Some(Visibility::Public));
		assert_eq!(entries[1].size, 0);
	}

	#[test]
	fn uploads_carry_every_form_field() {
		let fields = FileUpload::new("a.txt", "text/plain", b"abc".to_vec())
			.visibility(Visibility::Public)
			.into_fields();
		let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();

		assert_eq!(names, ["File", "FileName", "Size", "ContentType", "Visibility"]);
		assert_eq!(fields[2], MultipartField::text("Size", "3"));
		assert_eq!(fields[4], MultipartField::text("Visibility", "Public"));
	}
}
