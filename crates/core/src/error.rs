//! Crate-level error type.
//!
//! Each component reports its own error enum; [`Error`] wraps them so callers
//! that drive several components can use a single `?`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::handshake::HandshakeError;
use crate::pattern::{InferenceError, ValidationError};
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Session(#[from] SessionError),

	#[error(transparent)]
	Handshake(#[from] HandshakeError),

	#[error(transparent)]
	Gateway(#[from] GatewayError),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Inference(#[from] InferenceError),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl Error {
	/// `true` when the failure means a stored credential was rejected.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Error::Gateway(err) if err.is_auth_failure())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
