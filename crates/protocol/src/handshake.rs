//! Messages posted by the authentication window once a provider flow ends.

use serde::{Deserialize, Serialize};

use crate::Provider;

/// Completion message for an interactive handshake.
///
/// `data` stays untyped here; the receiver knows which provider it asked
/// for and decodes it into the matching credential type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HandshakeMessage {
	OauthSuccess {
		provider: Provider,
		#[serde(default)]
		data: serde_json::Value,
	},
	OauthError {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		provider: Option<Provider>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
}
