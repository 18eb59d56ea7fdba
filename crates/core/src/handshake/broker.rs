use std::sync::Arc;
use std::time::Duration;

use slidebatch_protocol::{CanvaCredentials, GoogleCredentials, HandshakeMessage, Provider, ProviderCredentials};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{AuthWindow, HandshakeError, InboundMessage, MessageHub, OriginAllowList, WindowOpener};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::{Session, SessionStore};

const UNKNOWN_ERROR: &str = "unknown authentication error";

/// Runs interactive handshakes, one window and one pending listener each.
///
/// A call to [`begin`](Self::begin) settles exactly once: with the first
/// valid completion message for the requested provider, on timeout, or when
/// the window is closed. The listener, deadline and close poll all belong to
/// that call and are dropped with it, so messages arriving afterwards reach
/// nobody.
#[derive(Clone)]
pub struct HandshakeBroker {
	hub: MessageHub,
	opener: Arc<dyn WindowOpener>,
	allow_list: OriginAllowList,
	api_url: String,
	callback_url: Option<String>,
	timeout: Duration,
	close_poll: Duration,
	close_grace: Duration,
}

impl std::fmt::Debug for HandshakeBroker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HandshakeBroker")
			.field("api_url", &self.api_url)
			.field("allow_list", &self.allow_list)
			.field("callback_url", &self.callback_url)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

impl HandshakeBroker {
	/// Accepts messages from the application and gateway origins of `config`.
	pub fn new(config: &ClientConfig, hub: MessageHub, opener: Arc<dyn WindowOpener>) -> Self {
		Self {
			hub,
			opener,
			allow_list: OriginAllowList::new([config.app_url.as_str(), config.api_url.as_str()]),
			api_url: config.api_url.clone(),
			callback_url: None,
			timeout: config.handshake_timeout,
			close_poll: config.close_poll,
			close_grace: config.close_grace,
		}
	}

	/// Asks the auth page to post its completion message to `url`.
	pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
		self.callback_url = Some(url.into());
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn allow_list(&self) -> &OriginAllowList {
		&self.allow_list
	}

	/// `{api_url}/{provider}/auth`, plus the callback when one is configured.
	pub fn authorization_url(&self, provider: Provider) -> String {
		let base = format!("{}/{}/auth", self.api_url, provider);
		let Some(callback) = self.callback_url.as_deref() else {
			return base;
		};
		match url::Url::parse_with_params(&base, [("callback", callback)]) {
			Ok(url) => url.to_string(),
			Err(_) => base,
		}
	}

	/// Runs one handshake for `provider` and returns the credentials the
	/// auth page posted.
	pub async fn begin(&self, provider: Provider) -> std::result::Result<ProviderCredentials, HandshakeError> {
		// Subscribe before the window exists so a fast page cannot post into
		// the void.
		let mut listener = self.hub.subscribe();
		let url = self.authorization_url(provider);
		let mut window = self.opener.open(&url)?;
		info!(target = "slidebatch.handshake", %provider, %url, "authentication window opened");

		let deadline = tokio::time::sleep(self.timeout);
		tokio::pin!(deadline);
		let mut poll = tokio::time::interval_at(Instant::now() + self.close_poll, self.close_poll);
		poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				biased;

				message = listener.recv() => {
					let Some(message) = message else {
						window.close();
						return Err(HandshakeError::Failed("message channel closed".into()));
					};
					match self.evaluate(provider, &message) {
						Verdict::Ignore => continue,
						Verdict::Success(credentials) => {
							info!(target = "slidebatch.handshake", %provider, "authentication completed");
							self.close_after_grace(window);
							return Ok(credentials);
						}
						Verdict::Failure(reason) => {
							warn!(target = "slidebatch.handshake", %provider, %reason, "provider reported an authentication error");
							self.close_after_grace(window);
							return Err(HandshakeError::Failed(reason));
						}
					}
				}
				_ = &mut deadline => {
					warn!(target = "slidebatch.handshake", %provider, timeout_secs = self.timeout.as_secs(), "authentication timed out");
					window.close();
					return Err(HandshakeError::Timeout);
				}
				_ = poll.tick() => {
					if window.is_closed() {
						info!(target = "slidebatch.handshake", %provider, "authentication window closed by user");
						return Err(HandshakeError::Cancelled);
					}
				}
			}
		}
	}

	/// Runs a handshake and stores its credentials.
	pub async fn login(&self, provider: Provider, store: &SessionStore) -> Result<Session> {
		let credentials = self.begin(provider).await?;
		Ok(store.set_credentials(&credentials).await?)
	}

	fn evaluate(&self, provider: Provider, message: &InboundMessage) -> Verdict {
		let Some(origin) = message.origin.as_deref() else {
			debug!(target = "slidebatch.handshake", "dropping message without origin");
			return Verdict::Ignore;
		};
		if !self.allow_list.allows(origin) {
			debug!(target = "slidebatch.handshake", %origin, "dropping message from untrusted origin");
			return Verdict::Ignore;
		}
		let Ok(parsed) = serde_json::from_value::<HandshakeMessage>(message.payload.clone()) else {
			debug!(target = "slidebatch.handshake", %origin, "dropping unrecognised message");
			return Verdict::Ignore;
		};

		match parsed {
			HandshakeMessage::OauthSuccess { provider: from, data } if from == provider => match decode_credentials(provider, data) {
				Ok(credentials) => Verdict::Success(credentials),
				Err(err) => Verdict::Failure(format!("malformed {provider} credentials: {err}")),
			},
			HandshakeMessage::OauthError { provider: from, error } if from.is_none_or(|from| from == provider) => {
				Verdict::Failure(error.filter(|e| !e.trim().is_empty()).unwrap_or_else(|| UNKNOWN_ERROR.to_string()))
			}
			_ => Verdict::Ignore,
		}
	}

	fn close_after_grace(&self, mut window: Box<dyn AuthWindow>) {
		let grace = self.close_grace;
		tokio::spawn(async move {
			tokio::time::sleep(grace).await;
			window.close();
		});
	}
}

enum Verdict {
	Ignore,
	Success(ProviderCredentials),
	Failure(String),
}

fn decode_credentials(provider: Provider, data: serde_json::Value) -> serde_json::Result<ProviderCredentials> {
	Ok(match provider {
		Provider::Google => ProviderCredentials::Google(serde_json::from_value::<GoogleCredentials>(data)?),
		Provider::Canva => ProviderCredentials::Canva(serde_json::from_value::<CanvaCredentials>(data)?),
	})
}
