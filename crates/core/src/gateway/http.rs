use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use slidebatch_protocol::{
	DocContent, DriveFolder, DriveListing, DrivePage, ExportRequest, ExportResponse, ExportRow, GenerateRequest, GenerateResponse, Provider, RefreshRequest,
	RefreshResponse, VerifyResponse,
};
use tracing::debug;
use url::Url;

use super::{DriveQuery, Gateway, GatewayError};
use crate::config::ClientConfig;

/// [`Gateway`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
	base_url: String,
	http: reqwest::Client,
}

impl HttpGateway {
	pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
		Self::with_timeout(&config.api_url, config.request_timeout)
	}

	pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|err| GatewayError::Transport(err.to_string()))?;
		Ok(Self {
			base_url: base_url.trim().trim_end_matches('/').to_string(),
			http,
		})
	}

	pub fn endpoint(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}

	/// Like [`endpoint`](Self::endpoint) with `segments` appended, each
	/// percent-encoded so it stays a single path segment.
	fn endpoint_with_segments(&self, path: &str, segments: &[&str]) -> Result<String, GatewayError> {
		let mut url = Url::parse(&self.endpoint(path)).map_err(|err| GatewayError::Transport(format!("invalid gateway url: {err}")))?;
		url.path_segments_mut()
			.map_err(|()| GatewayError::Transport(format!("gateway url cannot take path segments: {}", self.base_url)))?
			.extend(segments);
		Ok(url.to_string())
	}

	async fn get_json<T>(&self, path: &str, token: Option<&str>, query: &[(&str, String)]) -> Result<T, GatewayError>
	where
		T: DeserializeOwned,
	{
		self.get_json_at(self.endpoint(path), token, query).await
	}

	async fn get_json_at<T>(&self, url: String, token: Option<&str>, query: &[(&str, String)]) -> Result<T, GatewayError>
	where
		T: DeserializeOwned,
	{
		debug!(target = "slidebatch.gateway", %url, "GET");
		let mut request = self.http.get(&url).query(query);
		if let Some(token) = token {
			request = request.bearer_auth(token);
		}
		let response = request.send().await.map_err(|err| GatewayError::Transport(err.to_string()))?;
		decode_json_response(response).await
	}

	async fn post_json<Req, Res>(&self, path: &str, token: Option<&str>, body: &Req) -> Result<Res, GatewayError>
	where
		Req: Serialize + ?Sized,
		Res: DeserializeOwned,
	{
		let url = self.endpoint(path);
		debug!(target = "slidebatch.gateway", %url, "POST");
		let mut request = self.http.post(&url).json(body);
		if let Some(token) = token {
			request = request.bearer_auth(token);
		}
		let response = request.send().await.map_err(|err| GatewayError::Transport(err.to_string()))?;
		decode_json_response(response).await
	}
}

#[async_trait]
impl Gateway for HttpGateway {
	async fn verify_token(&self, provider: Provider, access_token: &str) -> Result<VerifyResponse, GatewayError> {
		self.get_json(&format!("{provider}/auth/verify"), Some(access_token), &[]).await
	}

	async fn refresh_token(&self, provider: Provider, refresh_token: &str) -> Result<RefreshResponse, GatewayError> {
		let body = RefreshRequest {
			refresh_token: refresh_token.to_string(),
		};
		self.post_json(&format!("{provider}/auth/refresh"), None, &body).await
	}

	async fn list_folders(&self, google_token: &str, query: &DriveQuery) -> Result<Vec<DriveFolder>, GatewayError> {
		self.get_json("google/drive/folders", Some(google_token), &query.pairs()).await
	}

	async fn list_images(&self, google_token: &str, query: &DriveQuery) -> Result<DrivePage, GatewayError> {
		let listing: DriveListing = self.get_json("google/drive/images", Some(google_token), &query.pairs()).await?;
		Ok(listing.into())
	}

	async fn list_docs(&self, google_token: &str, query: &DriveQuery) -> Result<DrivePage, GatewayError> {
		let listing: DriveListing = self.get_json("google/drive/docs", Some(google_token), &query.pairs()).await?;
		Ok(listing.into())
	}

	async fn doc_content(&self, google_token: &str, doc_id: &str) -> Result<String, GatewayError> {
		let url = self.endpoint_with_segments("google/drive/docs", &[doc_id, "content"])?;
		let doc: DocContent = self.get_json_at(url, Some(google_token), &[]).await?;
		Ok(doc.content)
	}

	async fn generate_design(&self, canva_token: &str, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
		self.post_json("canva/generate", Some(canva_token), request).await
	}

	async fn export_results(&self, google_token: &str, rows: &[ExportRow]) -> Result<String, GatewayError> {
		let body = ExportRequest { data: rows.to_vec() };
		let response: ExportResponse = self.post_json("canva/export", Some(google_token), &body).await?;
		Ok(response.url)
	}
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, GatewayError>
where
	T: DeserializeOwned,
{
	let status = response.status();
	let bytes = response.bytes().await.map_err(|err| GatewayError::Transport(err.to_string()))?;

	if !status.is_success() {
		return Err(format_http_error(status, &bytes));
	}

	serde_json::from_slice::<T>(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

/// Prefers the `message` or `error` field of a JSON error body.
fn format_http_error(status: StatusCode, body: &[u8]) -> GatewayError {
	let text = String::from_utf8_lossy(body).trim().to_string();
	let message = serde_json::from_slice::<serde_json::Value>(body)
		.ok()
		.and_then(|value| {
			["message", "error"]
				.iter()
				.find_map(|key| value.get(key).and_then(|field| field.as_str()).map(str::to_string))
		})
		.or_else(|| (!text.is_empty()).then_some(text))
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("<empty>").to_string());
	GatewayError::Status {
		status: status.as_u16(),
		message,
	}
}
