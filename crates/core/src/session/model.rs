use serde::{Deserialize, Serialize};
use slidebatch_protocol::{CanvaCredentials, GoogleCredentials, Provider, ProviderCredentials};

/// Credentials for every provider plus user-supplied secrets.
///
/// Provider fields are independent: updating one provider never touches the
/// other's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub google_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub google_refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub google_email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub google_pic: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub canva_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub canva_refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub canva_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gemini_api_key: Option<String>,
}

impl Session {
	/// Access token for `provider`, ignoring empty strings.
	pub fn token(&self, provider: Provider) -> Option<&str> {
		let token = match provider {
			Provider::Google => &self.google_token,
			Provider::Canva => &self.canva_token,
		};
		non_empty(token)
	}

	/// Refresh token for `provider`. An empty string counts as absent.
	pub fn refresh_token(&self, provider: Provider) -> Option<&str> {
		let token = match provider {
			Provider::Google => &self.google_refresh_token,
			Provider::Canva => &self.canva_refresh_token,
		};
		non_empty(token)
	}

	pub fn is_authenticated(&self, provider: Provider) -> bool {
		self.token(provider).is_some()
	}

	pub fn gemini_api_key(&self) -> Option<&str> {
		non_empty(&self.gemini_api_key)
	}

	/// Display identity for `provider`: the Google email or the Canva name.
	pub fn identity(&self, provider: Provider) -> Option<&str> {
		match provider {
			Provider::Google => non_empty(&self.google_email),
			Provider::Canva => non_empty(&self.canva_name),
		}
	}

	/// Replaces the access token and, when one was issued, the refresh token.
	pub fn set_tokens(&mut self, provider: Provider, access_token: String, refresh_token: Option<String>) {
		let refresh_token = refresh_token.filter(|token| !token.is_empty());
		let (access, refresh) = match provider {
			Provider::Google => (&mut self.google_token, &mut self.google_refresh_token),
			Provider::Canva => (&mut self.canva_token, &mut self.canva_refresh_token),
		};
		*access = Some(access_token);
		if let Some(token) = refresh_token {
			*refresh = Some(token);
		}
	}

	/// Writes the fields a handshake produced for one provider.
	pub fn apply_credentials(&mut self, credentials: &ProviderCredentials) {
		match credentials {
			ProviderCredentials::Google(GoogleCredentials {
				google_token,
				google_refresh_token,
				google_email,
				google_pic,
			}) => {
				self.google_token = Some(google_token.clone());
				self.google_refresh_token = google_refresh_token.clone();
				self.google_email = google_email.clone();
				self.google_pic = google_pic.clone();
			}
			ProviderCredentials::Canva(CanvaCredentials {
				canva_token,
				canva_refresh_token,
				canva_name,
			}) => {
				self.canva_token = Some(canva_token.clone());
				self.canva_refresh_token = canva_refresh_token.clone();
				self.canva_name = canva_name.clone();
			}
		}
	}

	/// Drops every field of `provider`.
	pub fn forget(&mut self, provider: Provider) {
		match provider {
			Provider::Google => {
				self.google_token = None;
				self.google_refresh_token = None;
				self.google_email = None;
				self.google_pic = None;
			}
			Provider::Canva => {
				self.canva_token = None;
				self.canva_refresh_token = None;
				self.canva_name = None;
			}
		}
	}
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_refresh_token_counts_as_absent() {
		let session = Session {
			google_refresh_token: Some(String::new()),
			canva_refresh_token: Some("r".into()),
			..Session::default()
		};
		assert_eq!(session.refresh_token(Provider::Google), None);
		assert_eq!(session.refresh_token(Provider::Canva), Some("r"));
	}

	#[test]
	fn set_tokens_keeps_refresh_token_when_none_issued() {
		let mut session = Session {
			canva_token: Some("old".into()),
			canva_refresh_token: Some("keep".into()),
			..Session::default()
		};
		session.set_tokens(Provider::Canva, "new".into(), None);
		assert_eq!(session.canva_token.as_deref(), Some("new"));
		assert_eq!(session.canva_refresh_token.as_deref(), Some("keep"));

		session.set_tokens(Provider::Canva, "newer".into(), Some(String::new()));
		assert_eq!(session.canva_refresh_token.as_deref(), Some("keep"));

		session.set_tokens(Provider::Canva, "newest".into(), Some("rotated".into()));
		assert_eq!(session.canva_refresh_token.as_deref(), Some("rotated"));
	}

	#[test]
	fn apply_credentials_leaves_other_provider_alone() {
		let mut session = Session {
			canva_token: Some("c".into()),
			..Session::default()
		};
		session.apply_credentials(&ProviderCredentials::Google(GoogleCredentials {
			google_token: "g".into(),
			google_email: Some("a@b.c".into()),
			..GoogleCredentials::default()
		}));
		assert_eq!(session.token(Provider::Google), Some("g"));
		assert_eq!(session.token(Provider::Canva), Some("c"));
		assert_eq!(session.identity(Provider::Google), Some("a@b.c"));
	}

	#[test]
	fn serializes_with_camel_case_keys() {
		let session = Session {
			google_refresh_token: Some("r".into()),
			..Session::default()
		};
		let value = serde_json::to_value(&session).unwrap();
		assert_eq!(value, serde_json::json!({ "googleRefreshToken": "r" }));
	}
}
