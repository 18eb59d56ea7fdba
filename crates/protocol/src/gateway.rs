//! Request and response bodies of the remote gateway.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
	pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
	pub access_token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
}

/// Result of a token verification. Google reports `email`, Canva `userId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
	pub valid: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mime_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail_link: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub web_content_link: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub web_view_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFolder {
	pub id: String,
	pub name: String,
}

/// A page of drive files. The gateway answers either with a bare array or
/// with a `{files, nextPageToken}` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DriveListing {
	Page {
		files: Vec<DriveFile>,
		#[serde(default, rename = "nextPageToken", skip_serializing_if = "Option::is_none")]
		next_page_token: Option<String>,
	},
	Bare(Vec<DriveFile>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrivePage {
	pub files: Vec<DriveFile>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next_page_token: Option<String>,
}

impl From<DriveListing> for DrivePage {
	fn from(listing: DriveListing) -> Self {
		match listing {
			DriveListing::Page { files, next_page_token } => DrivePage { files, next_page_token },
			DriveListing::Bare(files) => DrivePage { files, next_page_token: None },
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocContent {
	pub content: String,
}

/// Body of a single design generation job. `patron` holds one image index
/// (or `-1`) per slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
	pub image_urls: Vec<String>,
	pub patron: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
	pub url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
	pub name: String,
	pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
	pub data: Vec<ExportRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
	pub url: String,
}
