use std::path::PathBuf;

use serde_json::json;
use slidebatch::pattern::{GeminiInference, PatternInference};
use slidebatch::{AbstractPattern, DesignSet, Template};

use super::CommandOutput;
use super::drive::Drive;
use crate::context::CommandContext;
use crate::error::{CliError, Result};

/// Where the free-text layout description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferSource {
	Doc(String),
	File(PathBuf),
	Text(String),
}

impl InferSource {
	pub fn from_args(doc: Option<String>, file: Option<PathBuf>, text: Option<String>) -> Result<Self> {
		match (doc, file, text) {
			(Some(id), None, None) => Ok(InferSource::Doc(id)),
			(None, Some(path), None) => Ok(InferSource::File(path)),
			(None, None, Some(text)) => Ok(InferSource::Text(text)),
			_ => Err(CliError::InvalidInput("give exactly one of --doc, --file or --text".into())),
		}
	}
}

pub async fn infer(ctx: &CommandContext, source: InferSource, template: Template, gemini_url: Option<String>) -> Result<CommandOutput> {
	let store = ctx.open_store()?;
	let session = store.reload().await?;
	let mut inference = GeminiInference::new(session.as_ref().and_then(|session| session.gemini_api_key()))?;
	if let Some(url) = gemini_url {
		inference = inference.with_base_url(url);
	}

	let text = match source {
		InferSource::Doc(id) => Drive::connect(ctx).await?.doc_text(&id).await?,
		InferSource::File(path) => tokio::fs::read_to_string(&path).await?,
		InferSource::Text(text) => text,
	};
	if text.trim().is_empty() {
		return Err(CliError::InvalidInput("the description is empty".into()));
	}

	let pattern = inference.infer(&text, template).await?;
	let output = CommandOutput::new(json!({
		"template": template,
		"pattern": pattern.values(),
	}))?;
	Ok(if pattern.is_empty(template.sentinel()) { output.warn("no usable pattern found in the description") } else { output })
}

/// Expands one design set without contacting the gateway.
pub fn encode(template: Template, pattern: &str, set: &str) -> Result<CommandOutput> {
	let pattern = AbstractPattern::parse(pattern, template)?;
	let set = DesignSet::parse(set)?;
	let slides = slidebatch::pattern::encode(template, pattern.values(), &set);
	CommandOutput::new(json!({
		"template": template,
		"slides": slides,
	}))
}
