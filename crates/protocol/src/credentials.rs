use serde::{Deserialize, Serialize};

use crate::Provider;

/// Credentials delivered by a successful Google handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCredentials {
	pub google_token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub google_refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub google_email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub google_pic: Option<String>,
}

/// Credentials delivered by a successful Canva handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvaCredentials {
	pub canva_token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub canva_refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub canva_name: Option<String>,
}

/// Provider-specific credential payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderCredentials {
	Google(GoogleCredentials),
	Canva(CanvaCredentials),
}

impl ProviderCredentials {
	pub fn provider(&self) -> Provider {
		match self {
			ProviderCredentials::Google(_) => Provider::Google,
			ProviderCredentials::Canva(_) => Provider::Canva,
		}
	}

	pub fn access_token(&self) -> &str {
		match self {
			ProviderCredentials::Google(c) => &c.google_token,
			ProviderCredentials::Canva(c) => &c.canva_token,
		}
	}
}
