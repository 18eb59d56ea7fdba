//! Pattern inference from a slide script.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{AbstractPattern, PATTERN_LENGTH, Template};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
	#[error("no Gemini API key configured; run `slidebatch key set` first")]
	MissingApiKey,

	#[error("inference request failed: {0}")]
	Request(String),

	#[error("inference service returned {status}: {message}")]
	Status { status: u16, message: String },

	#[error("inference service returned no text")]
	EmptyReply,
}

/// Turns free text into an abstract pattern.
#[async_trait]
pub trait PatternInference: Send + Sync {
	async fn infer(&self, text: &str, template: Template) -> Result<AbstractPattern, InferenceError>;
}

/// [`PatternInference`] backed by the Gemini `generateContent` REST API.
#[derive(Debug, Clone)]
pub struct GeminiInference {
	http: reqwest::Client,
	api_key: String,
	base_url: String,
	model: String,
}

impl GeminiInference {
	pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
	pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

	/// Fails before any request when `api_key` is missing or blank.
	pub fn new(api_key: Option<&str>) -> Result<Self, InferenceError> {
		let api_key = api_key.map(str::trim).filter(|key| !key.is_empty()).ok_or(InferenceError::MissingApiKey)?;
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(60))
			.build()
			.map_err(|err| InferenceError::Request(err.to_string()))?;
		Ok(Self {
			http,
			api_key: api_key.to_string(),
			base_url: Self::DEFAULT_BASE_URL.to_string(),
			model: Self::DEFAULT_MODEL.to_string(),
		})
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into().trim_end_matches('/').to_string();
		self
	}

	fn endpoint(&self) -> String {
		format!("{}/models/{}:generateContent", self.base_url, self.model)
	}
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
	contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
	role: &'static str,
	parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
	text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
	#[serde(default)]
	candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
	content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
	#[serde(default)]
	parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
	#[serde(default)]
	text: Option<String>,
}

#[async_trait]
impl PatternInference for GeminiInference {
	async fn infer(&self, text: &str, template: Template) -> Result<AbstractPattern, InferenceError> {
		let prompt = prompt_for(text, template);
		let body = GenerateContentRequest {
			contents: [Content {
				role: "user",
				parts: [Part { text: &prompt }],
			}],
		};

		let response = self
			.http
			.post(self.endpoint())
			.header("x-goog-api-key", &self.api_key)
			.json(&body)
			.send()
			.await
			.map_err(|err| InferenceError::Request(err.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(InferenceError::Status {
				status: status.as_u16(),
				message: message.trim().to_string(),
			});
		}

		let reply: GenerateContentResponse = response.json().await.map_err(|err| InferenceError::Request(err.to_string()))?;
		let text: String = reply
			.candidates
			.into_iter()
			.filter_map(|candidate| candidate.content)
			.flat_map(|content| content.parts)
			.filter_map(|part| part.text)
			.collect();
		if text.trim().is_empty() {
			return Err(InferenceError::EmptyReply);
		}
		debug!(target = "slidebatch.inference", reply = %text, "inference reply");
		Ok(extract_pattern(&text, template))
	}
}

/// Pulls the first integer array out of `reply` and fits it to
/// [`PATTERN_LENGTH`] with `template`'s sentinel.
///
/// Values the template does not accept become the sentinel. A reply without
/// any array yields a blank pattern.
pub fn extract_pattern(reply: &str, template: Template) -> AbstractPattern {
	static ARRAY: OnceLock<Option<Regex>> = OnceLock::new();
	let sentinel = template.sentinel();
	let array = ARRAY.get_or_init(|| Regex::new(r"\[\s*(\d+\s*,\s*)*\d+\s*\]").ok());

	let Some(found) = array.as_ref().and_then(|re| re.find(reply)) else {
		warn!(target = "slidebatch.inference", "no pattern array in inference reply, using a blank pattern");
		return AbstractPattern::blank(template, PATTERN_LENGTH);
	};

	let mut values: Vec<i64> = found
		.as_str()
		.trim_matches(|c| c == '[' || c == ']')
		.split(',')
		.map(|field| field.trim().parse::<i64>().ok().filter(|value| template.accepts(*value)).unwrap_or(sentinel))
		.collect();
	values.truncate(PATTERN_LENGTH);
	values.resize(PATTERN_LENGTH, sentinel);
	AbstractPattern::new(values)
}

fn prompt_for(text: &str, template: Template) -> String {
	let rules = match template {
		Template::Single => {
			"Count the numbered slides (1., 2., 3., ...) in the script below.\n\
			 Rules:\n\
			 1. Output 0 for every slide found (show the image).\n\
			 2. If the script has several versions, only use the first complete one.\n\
			 3. Fill the remaining positions up to 35 with 2 (empty).\n\
			 4. Output ONLY the JSON array, e.g. [0, 0, 0, 0, 0, 2, 2, ...]."
		}
		Template::Double => {
			"Extract the character pattern of the numbered slides in the script below as a JSON array of numbers.\n\
			 Rules:\n\
			 1. Identify numbered slides such as \"1. (HER)\" or \"2. (HIM)\".\n\
			 2. Use 0 for male characters (HIM, he, man, male names).\n\
			 3. Use 1 for female characters (HER, she, woman, female names).\n\
			 4. Use 2 for BOTH, neutral narration or empty slides.\n\
			 5. If the script has several versions, only use the first complete one.\n\
			 6. The array must have exactly 35 entries; pad with 2.\n\
			 7. Output ONLY the JSON array, e.g. [0, 0, 1, 0, 1, 2, 2, ...]."
		}
		Template::Triple => {
			"Extract the character pattern of the numbered slides in the script below as a JSON array of numbers.\n\
			 Rules:\n\
			 1. Identify numbered slides and the character each one features.\n\
			 2. Use 0 for the first character, 1 for the second and 2 for the third, in order of first appearance.\n\
			 3. Use 3 for slides with several characters, neutral narration or nothing.\n\
			 4. If the script has several versions, only use the first complete one.\n\
			 5. The array must have exactly 35 entries; pad with 3.\n\
			 6. Output ONLY the JSON array."
		}
	};
	format!("{rules}\n\nScript:\n{text}")
}

#[cfg(test)]
mod tests {
	use axum::http::{HeaderMap, Uri};
	use axum::{Json, Router};
	use serde_json::{Value, json};
	use tokio::net::TcpListener;

	use super::*;

	#[test]
	fn extracts_array_surrounded_by_noise() {
		let pattern = extract_pattern("Sure! Here it is:\n```json\n[0, 1, 1, 0]\n```", Template::Double);
		assert_eq!(pattern.len(), PATTERN_LENGTH);
		assert_eq!(&pattern.values()[..5], &[0, 1, 1, 0, 2]);
	}

	#[test]
	fn long_arrays_are_truncated() {
		let reply = format!("[{}]", vec!["1"; 50].join(","));
		let pattern = extract_pattern(&reply, Template::Double);
		assert_eq!(pattern.len(), PATTERN_LENGTH);
		assert!(pattern.values().iter().all(|v| *v == 1));
	}

	#[test]
	fn missing_array_yields_blank_pattern() {
		let pattern = extract_pattern("I could not find any slides.", Template::Triple);
		assert!(pattern.is_empty(3));
		assert_eq!(pattern.len(), PATTERN_LENGTH);
	}

	#[test]
	fn values_above_sentinel_are_clamped() {
		let pattern = extract_pattern("[0, 7, 2]", Template::Double);
		assert_eq!(&pattern.values()[..3], &[0, 2, 2]);
	}

	#[test]
	fn single_replies_keep_only_the_first_slot() {
		let pattern = extract_pattern("[0, 1, 2, 0]", Template::Single);
		assert_eq!(&pattern.values()[..4], &[0, 2, 2, 0]);
		assert!(pattern.check_values(Template::Single).is_ok());
	}

	#[test]
	fn missing_key_fails_before_any_request() {
		assert_eq!(GeminiInference::new(None).unwrap_err(), InferenceError::MissingApiKey);
		assert_eq!(GeminiInference::new(Some("  ")).unwrap_err(), InferenceError::MissingApiKey);
	}

	#[tokio::test]
	async fn infer_posts_prompt_with_api_key() {
		let app = Router::new().fallback(|uri: Uri, headers: HeaderMap, Json(body): Json<Value>| async move {
			assert_eq!(uri.path(), "/v1beta/models/gemini-2.0-flash:generateContent");
			assert_eq!(headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()), Some("k1"));
			let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default().to_string();
			assert!(prompt.contains("1. (HER)"));
			Json(json!({ "candidates": [{ "content": { "parts": [{ "text": "[1, 0]" }] } }] }))
		});
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let _ = axum::serve(listener, app).await;
		});

		let inference = GeminiInference::new(Some("k1")).unwrap().with_base_url(format!("http://{addr}/v1beta"));
		let pattern = inference.infer("1. (HER) hello\n2. (HIM) hi", Template::Double).await.unwrap();
		assert_eq!(&pattern.values()[..3], &[1, 0, 2]);
	}
}
