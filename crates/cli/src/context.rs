use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidebatch::config::{self, STORE_FILE};
use slidebatch::{ClientConfig, CredentialGuard, HttpGateway, SessionStore};

use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

/// Resolved settings shared by every command of one invocation.
#[derive(Debug, Clone)]
pub struct CommandContext {
	pub config: ClientConfig,
	pub format: OutputFormat,
	store_path: PathBuf,
}

impl CommandContext {
	pub fn new(api_url: Option<&str>, app_url: Option<&str>, store: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
		let config = ClientConfig::resolve(api_url, app_url)?;
		let store_path = match store {
			Some(path) => path,
			None => config::state_dir(dirs::config_dir().as_deref())
				.map(|dir| dir.join(STORE_FILE))
				.ok_or_else(|| CliError::InvalidInput("cannot determine a config directory; pass --store".into()))?,
		};
		Ok(Self { config, format, store_path })
	}

	pub fn from_cli(cli: &Cli) -> Result<Self> {
		Self::new(cli.api_url.as_deref(), cli.app_url.as_deref(), cli.store.clone(), cli.format)
	}

	pub fn store_path(&self) -> &Path {
		&self.store_path
	}

	/// Directory next to the store used for scratch state such as browser
	/// profiles.
	pub fn state_dir(&self) -> PathBuf {
		self.store_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
	}

	pub fn open_store(&self) -> Result<Arc<SessionStore>> {
		Ok(Arc::new(SessionStore::open(&self.store_path)?))
	}

	pub fn gateway(&self) -> Result<Arc<HttpGateway>> {
		Ok(Arc::new(HttpGateway::new(&self.config)?))
	}

	pub fn guard(&self, store: Arc<SessionStore>) -> Result<CredentialGuard> {
		Ok(CredentialGuard::new(store, self.gateway()?))
	}
}
