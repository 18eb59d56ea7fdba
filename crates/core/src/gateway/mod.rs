//! Remote gateway contract.
//!
//! The gateway fronts both providers: it verifies and refreshes tokens,
//! lists Drive content, generates designs and exports results. Everything is
//! bearer-token authenticated with the token of the provider involved.

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use slidebatch_protocol::{DriveFolder, DrivePage, ExportRow, GenerateRequest, GenerateResponse, Provider, RefreshResponse, VerifyResponse};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
	#[error("gateway returned {status}: {message}")]
	Status { status: u16, message: String },

	#[error("gateway request failed: {0}")]
	Transport(String),

	#[error("failed to decode gateway response: {0}")]
	Decode(String),
}

impl GatewayError {
	/// `true` for 401/403, i.e. the credential itself was rejected.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, GatewayError::Status { status: 401 | 403, .. })
	}
}

/// Drive listing parameters. Unset fields are left to the gateway's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveQuery {
	pub folder_id: Option<String>,
	pub page_token: Option<String>,
	pub page_size: Option<u32>,
}

impl DriveQuery {
	pub fn folder(folder_id: impl Into<String>) -> Self {
		Self {
			folder_id: Some(folder_id.into()),
			..Self::default()
		}
	}

	pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = Vec::new();
		if let Some(folder) = &self.folder_id {
			pairs.push(("folderId", folder.clone()));
		}
		if let Some(token) = &self.page_token {
			pairs.push(("pageToken", token.clone()));
		}
		if let Some(size) = self.page_size {
			pairs.push(("pageSize", size.to_string()));
		}
		pairs
	}
}

#[async_trait]
pub trait Gateway: Send + Sync {
	async fn verify_token(&self, provider: Provider, access_token: &str) -> Result<VerifyResponse, GatewayError>;

	async fn refresh_token(&self, provider: Provider, refresh_token: &str) -> Result<RefreshResponse, GatewayError>;

	async fn list_folders(&self, google_token: &str, query: &DriveQuery) -> Result<Vec<DriveFolder>, GatewayError>;

	async fn list_images(&self, google_token: &str, query: &DriveQuery) -> Result<DrivePage, GatewayError>;

	async fn list_docs(&self, google_token: &str, query: &DriveQuery) -> Result<DrivePage, GatewayError>;

	async fn doc_content(&self, google_token: &str, doc_id: &str) -> Result<String, GatewayError>;

	/// Submits one generation job.
	async fn generate_design(&self, canva_token: &str, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError>;

	/// Writes `rows` to a new spreadsheet and returns its URL.
	async fn export_results(&self, google_token: &str, rows: &[ExportRow]) -> Result<String, GatewayError>;
}
