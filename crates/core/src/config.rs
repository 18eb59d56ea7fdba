//! Client configuration resolved from flags, environment and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_APP_URL: &str = "http://localhost:4200";
pub const ENV_API_URL: &str = "SLIDEBATCH_API_URL";
pub const ENV_APP_URL: &str = "SLIDEBATCH_APP_URL";
pub const ENV_HOME: &str = "SLIDEBATCH_HOME";

/// File name of the persisted store inside the state directory.
pub const STORE_FILE: &str = "store.json";

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CLOSE_POLL: Duration = Duration::from_millis(500);
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_millis(100);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	#[error("base url must not be empty")]
	EmptyBaseUrl,
	#[error("base url must use http:// or https:// and include a host: {0}")]
	InvalidBaseUrl(String),
}

/// Endpoints and timings shared by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL of the remote gateway, without a trailing slash.
	pub api_url: String,
	/// Origin of the web application that hosts the handshake pages.
	pub app_url: String,
	pub handshake_timeout: Duration,
	pub close_poll: Duration,
	pub close_grace: Duration,
	pub refresh_interval: Duration,
	pub request_timeout: Duration,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			app_url: DEFAULT_APP_URL.to_string(),
			handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
			close_poll: DEFAULT_CLOSE_POLL,
			close_grace: DEFAULT_CLOSE_GRACE,
			refresh_interval: DEFAULT_REFRESH_INTERVAL,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}
}

impl ClientConfig {
	/// Resolves URLs with precedence: explicit value, environment, default.
	pub fn resolve(api_url: Option<&str>, app_url: Option<&str>) -> Result<Self, ConfigError> {
		let api_url = pick(api_url, ENV_API_URL, DEFAULT_API_URL);
		let app_url = pick(app_url, ENV_APP_URL, DEFAULT_APP_URL);
		Ok(Self {
			api_url: normalize_base_url(&api_url)?,
			app_url: normalize_base_url(&app_url)?,
			..Self::default()
		})
	}

	pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = interval;
		self
	}
}

fn pick(explicit: Option<&str>, env_key: &str, default: &str) -> String {
	explicit
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
		.or_else(|| env_non_empty(env_key))
		.unwrap_or_else(|| default.to_string())
}

/// Trims whitespace and trailing slashes and checks for an http(s) URL with a
/// host.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
	let trimmed = raw.trim().trim_end_matches('/');
	if trimmed.is_empty() {
		return Err(ConfigError::EmptyBaseUrl);
	}
	let parsed = url::Url::parse(trimmed).map_err(|_| ConfigError::InvalidBaseUrl(trimmed.to_string()))?;
	if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none_or(str::is_empty) {
		return Err(ConfigError::InvalidBaseUrl(trimmed.to_string()));
	}
	Ok(trimmed.to_string())
}

/// Directory holding the persisted store: `$SLIDEBATCH_HOME`, else
/// `<config dir>/slidebatch` under `config_root`.
pub fn state_dir(config_root: Option<&Path>) -> Option<PathBuf> {
	if let Some(home) = env_non_empty(ENV_HOME) {
		return Some(PathBuf::from(home));
	}
	config_root.map(|root| root.join("slidebatch"))
}

fn env_non_empty(key: &str) -> Option<String> {
	std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Mutex, OnceLock};

	static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

	fn with_env<T>(vars: &[(&str, Option<&str>)], test: impl FnOnce() -> T) -> T {
		let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
		let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

		let previous: Vec<(String, Option<String>)> = vars.iter().map(|(key, _)| (key.to_string(), std::env::var(key).ok())).collect();
		for (key, value) in vars {
			match value {
				Some(value) => unsafe { std::env::set_var(key, value) },
				None => unsafe { std::env::remove_var(key) },
			}
		}

		let result = test();

		for (key, value) in previous {
			match value {
				Some(value) => unsafe { std::env::set_var(&key, value) },
				None => unsafe { std::env::remove_var(&key) },
			}
		}
		result
	}

	#[test]
	fn normalize_base_url_trims_and_drops_trailing_slash() {
		assert_eq!(normalize_base_url(" https://api.example.com/v1/ ").unwrap(), "https://api.example.com/v1");
	}

	#[test]
	fn normalize_base_url_requires_http_scheme_and_host() {
		assert!(matches!(normalize_base_url("api.example.com"), Err(ConfigError::InvalidBaseUrl(_))));
		assert!(matches!(normalize_base_url("ftp://api.example.com"), Err(ConfigError::InvalidBaseUrl(_))));
		assert_eq!(normalize_base_url("  "), Err(ConfigError::EmptyBaseUrl));
	}

	#[test]
	fn resolve_prefers_explicit_then_env_then_default() {
		with_env(&[(ENV_API_URL, Some("https://env.example.com/api/")), (ENV_APP_URL, None)], || {
			let config = ClientConfig::resolve(None, None).unwrap();
			assert_eq!(config.api_url, "https://env.example.com/api");
			assert_eq!(config.app_url, DEFAULT_APP_URL);

			let config = ClientConfig::resolve(Some("http://127.0.0.1:9000"), None).unwrap();
			assert_eq!(config.api_url, "http://127.0.0.1:9000");
		});
	}

	#[test]
	fn state_dir_honours_home_override() {
		with_env(&[(ENV_HOME, Some("/tmp/slidebatch-home"))], || {
			assert_eq!(state_dir(None), Some(PathBuf::from("/tmp/slidebatch-home")));
		});
		with_env(&[(ENV_HOME, None)], || {
			assert_eq!(state_dir(Some(Path::new("/cfg"))), Some(PathBuf::from("/cfg/slidebatch")));
			assert_eq!(state_dir(None), None);
		});
	}

	#[test]
	fn defaults_match_documented_timings() {
		let config = ClientConfig::default();
		assert_eq!(config.handshake_timeout, Duration::from_secs(300));
		assert_eq!(config.close_poll, Duration::from_millis(500));
		assert_eq!(config.refresh_interval, Duration::from_secs(180));
	}
}
