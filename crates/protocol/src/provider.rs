use serde::{Deserialize, Serialize};

/// Third-party identity provider a session can hold credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
	Google,
	Canva,
}

impl Provider {
	pub const ALL: [Provider; 2] = [Provider::Google, Provider::Canva];

	pub fn as_str(self) -> &'static str {
		match self {
			Provider::Google => "google",
			Provider::Canva => "canva",
		}
	}
}

impl std::fmt::Display for Provider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Provider {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"google" => Ok(Provider::Google),
			"canva" => Ok(Provider::Canva),
			_ => Err(format!("unknown provider: {s}")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn provider_serializes_lowercase() {
		assert_eq!(serde_json::to_string(&Provider::Canva).unwrap(), "\"canva\"");
		let parsed: Provider = serde_json::from_str("\"google\"").unwrap();
		assert_eq!(parsed, Provider::Google);
	}

	#[test]
	fn provider_parses_case_insensitively() {
		assert_eq!("Google".parse::<Provider>().unwrap(), Provider::Google);
		assert!("dropbox".parse::<Provider>().is_err());
	}
}
