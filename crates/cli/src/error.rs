//! Command-level errors and their mapping onto output error codes.

use slidebatch::config::ConfigError;
use slidebatch::gateway::GatewayError;
use slidebatch::handshake::HandshakeError;
use slidebatch::pattern::{InferenceError, ValidationError};
use slidebatch::session::SessionError;
use serde_json::{Value, json};
use thiserror::Error;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Core(#[from] slidebatch::Error),

	#[error("{0}")]
	InvalidInput(String),

	#[error("{0}")]
	Auth(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

macro_rules! via_core {
	($($source:ty),* $(,)?) => {
		$(
			impl From<$source> for CliError {
				fn from(err: $source) -> Self {
					CliError::Core(err.into())
				}
			}
		)*
	};
}

via_core!(SessionError, HandshakeError, GatewayError, ValidationError, InferenceError, ConfigError);

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Core(err) => core_code(err),
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Auth(_) => ErrorCode::AuthError,
			CliError::Io(_) => ErrorCode::IoError,
			CliError::Other(_) => ErrorCode::InternalError,
		}
	}

	/// Structured context for the envelope's `error.details`.
	pub fn details(&self) -> Option<Value> {
		use slidebatch::Error;

		match self {
			CliError::Core(Error::Gateway(GatewayError::Status { status, .. })) => Some(json!({ "status": status })),
			CliError::Core(Error::Validation(ValidationError::PatternValue { position, value, template })) => {
				Some(json!({ "position": position, "value": value, "template": template }))
			}
			CliError::Core(Error::Validation(ValidationError::MissingCredential(provider))) => Some(json!({ "provider": provider })),
			_ => None,
		}
	}
}

fn core_code(err: &slidebatch::Error) -> ErrorCode {
	use slidebatch::Error;

	match err {
		Error::Handshake(HandshakeError::Timeout) => ErrorCode::Timeout,
		Error::Handshake(HandshakeError::Cancelled) => ErrorCode::AuthCancelled,
		Error::Handshake(_) => ErrorCode::AuthError,
		Error::Gateway(gateway) if gateway.is_auth_failure() => ErrorCode::AuthError,
		Error::Gateway(_) => ErrorCode::GatewayError,
		Error::Validation(ValidationError::MissingCredential(_)) => ErrorCode::AuthError,
		Error::Validation(_) => ErrorCode::InvalidInput,
		Error::Inference(InferenceError::MissingApiKey) => ErrorCode::InvalidInput,
		Error::Inference(_) => ErrorCode::InferenceFailed,
		Error::Session(_) => ErrorCode::SessionError,
		Error::Config(_) => ErrorCode::InvalidInput,
	}
}

pub type Result<T> = std::result::Result<T, CliError>;
