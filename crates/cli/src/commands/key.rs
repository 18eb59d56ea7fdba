use serde_json::json;

use super::CommandOutput;
use crate::context::CommandContext;
use crate::error::{CliError, Result};

pub async fn set(ctx: &CommandContext, key: &str) -> Result<CommandOutput> {
	let key = key.trim();
	if key.is_empty() {
		return Err(CliError::InvalidInput("API key must not be empty".into()));
	}

	let store = ctx.open_store()?;
	// The key lives inside the session, so there must be one to attach it to.
	if store.set_gemini_api_key(key).await?.is_none() {
		return Err(CliError::Auth("no session; log in to a provider before storing an API key".into()));
	}
	CommandOutput::new(json!({ "stored": true, "key": mask(key) }))
}

pub async fn show(ctx: &CommandContext) -> Result<CommandOutput> {
	let store = ctx.open_store()?;
	let key = store.get().and_then(|session| session.gemini_api_key().map(mask));
	CommandOutput::new(json!({ "stored": key.is_some(), "key": key }))
}

fn mask(key: &str) -> String {
	let chars: Vec<char> = key.chars().collect();
	if chars.len() <= 8 {
		return "*".repeat(chars.len());
	}
	let head: String = chars[..4].iter().collect();
	let tail: String = chars[chars.len() - 4..].iter().collect();
	format!("{head}...{tail}")
}
