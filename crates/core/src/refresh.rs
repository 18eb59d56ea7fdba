//! Background refresh of provider access tokens.
//!
//! Each tick reads the session and, for every provider that holds a refresh
//! token, exchanges it for a new access token. Providers are handled
//! independently; a failure for one is logged and never touches the other or
//! clears the session.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use slidebatch_protocol::Provider;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::gateway::Gateway;
use crate::session::{Session, SessionStore};

/// What happened to one provider during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum ProviderRefresh {
	/// No session or no refresh token.
	Skipped,
	Refreshed,
	Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
	pub google: ProviderRefresh,
	pub canva: ProviderRefresh,
}

impl RefreshReport {
	pub fn get(&self, provider: Provider) -> &ProviderRefresh {
		match provider {
			Provider::Google => &self.google,
			Provider::Canva => &self.canva,
		}
	}
}

/// Periodically refreshes every provider's access token.
#[derive(Clone)]
pub struct RefreshScheduler {
	store: Arc<SessionStore>,
	gateway: Arc<dyn Gateway>,
	interval: Duration,
}

impl RefreshScheduler {
	pub fn new(store: Arc<SessionStore>, gateway: Arc<dyn Gateway>, interval: Duration) -> Self {
		Self { store, gateway, interval }
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Runs one refresh pass over both providers.
	pub async fn tick(&self) -> RefreshReport {
		let session = match self.store.reload().await {
			Ok(session) => session,
			Err(err) => {
				warn!(target = "slidebatch.refresh", error = %err, "could not re-read session, using cached copy");
				self.store.get()
			}
		};

		let Some(session) = session else {
			debug!(target = "slidebatch.refresh", "no session, nothing to refresh");
			return RefreshReport {
				google: ProviderRefresh::Skipped,
				canva: ProviderRefresh::Skipped,
			};
		};

		let (google, canva) = futures_util::join!(self.refresh_provider(Provider::Google, &session), self.refresh_provider(Provider::Canva, &session));
		RefreshReport { google, canva }
	}

	async fn refresh_provider(&self, provider: Provider, session: &Session) -> ProviderRefresh {
		let Some(refresh_token) = session.refresh_token(provider) else {
			return ProviderRefresh::Skipped;
		};

		let response = match self.gateway.refresh_token(provider, refresh_token).await {
			Ok(response) => response,
			Err(err) => {
				warn!(target = "slidebatch.refresh", %provider, error = %err, "token refresh failed");
				return ProviderRefresh::Failed(err.to_string());
			}
		};

		match self.store.replace_token(provider, response.access_token, response.refresh_token).await {
			Ok(Some(_)) => {
				info!(target = "slidebatch.refresh", %provider, "access token refreshed");
				ProviderRefresh::Refreshed
			}
			Ok(None) => {
				debug!(target = "slidebatch.refresh", %provider, "session cleared while refreshing, discarding token");
				ProviderRefresh::Skipped
			}
			Err(err) => {
				warn!(target = "slidebatch.refresh", %provider, error = %err, "failed to store refreshed token");
				ProviderRefresh::Failed(err.to_string())
			}
		}
	}

	/// Starts the timer task. The first tick fires one interval from now.
	pub fn spawn(self) -> RefreshHandle {
		self.spawn_with(|_| {})
	}

	/// Like [`spawn`](Self::spawn), calling `on_tick` with every report.
	pub fn spawn_with<F>(self, mut on_tick: F) -> RefreshHandle
	where
		F: FnMut(&RefreshReport) + Send + 'static,
	{
		let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
		let interval = self.interval;
		let task = tokio::spawn(async move {
			let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			loop {
				tokio::select! {
					_ = &mut shutdown_rx => break,
					_ = ticker.tick() => {
						let report = self.tick().await;
						on_tick(&report);
					}
				}
			}
			debug!(target = "slidebatch.refresh", "refresh task stopped");
		});
		RefreshHandle {
			shutdown: Some(shutdown_tx),
			task: Some(task),
		}
	}
}

/// Owner of a running refresh task. Dropping it aborts the task.
#[derive(Debug)]
pub struct RefreshHandle {
	shutdown: Option<oneshot::Sender<()>>,
	task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
	pub fn is_running(&self) -> bool {
		self.task.as_ref().is_some_and(|task| !task.is_finished())
	}

	/// Stops the timer and waits for an in-progress tick to finish.
	pub async fn stop(mut self) {
		if let Some(shutdown) = self.shutdown.take() {
			let _ = shutdown.send(());
		}
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

impl Drop for RefreshHandle {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use slidebatch_protocol::RefreshResponse;

	use super::*;
	use crate::gateway::GatewayError;
	use crate::testing::{FakeGateway, GatewayCall};

	fn session(google_refresh: Option<&str>, canva_refresh: Option<&str>) -> Session {
		Session {
			google_token: Some("g-old".into()),
			google_refresh_token: google_refresh.map(str::to_string),
			canva_token: Some("c-old".into()),
			canva_refresh_token: canva_refresh.map(str::to_string),
			..Session::default()
		}
	}

	fn refreshed(token: &str, refresh: Option<&str>) -> Result<RefreshResponse, GatewayError> {
		Ok(RefreshResponse {
			access_token: token.into(),
			refresh_token: refresh.map(str::to_string),
		})
	}

	fn scheduler(store: &Arc<SessionStore>, gateway: &FakeGateway) -> RefreshScheduler {
		RefreshScheduler::new(store.clone(), Arc::new(gateway.clone()), Duration::from_secs(180))
	}

	#[tokio::test]
	async fn provider_without_refresh_token_is_skipped_other_still_refreshes() {
		let store = Arc::new(SessionStore::in_memory(Some(session(None, Some("c-ref")))));
		let gateway = FakeGateway::new().with_refresh(Provider::Canva, refreshed("c-new", None));

		let report = scheduler(&store, &gateway).tick().await;

		assert_eq!(report.google, ProviderRefresh::Skipped);
		assert_eq!(report.canva, ProviderRefresh::Refreshed);
		let session = store.get().unwrap();
		assert_eq!(session.token(Provider::Canva), Some("c-new"));
		assert_eq!(session.refresh_token(Provider::Canva), Some("c-ref"));
		assert_eq!(session.token(Provider::Google), Some("g-old"));
		assert!(
			!gateway.calls().iter().any(|call| matches!(call, GatewayCall::Refresh { provider: Provider::Google, .. })),
			"google refresh must not be attempted"
		);
	}

	#[tokio::test]
	async fn empty_refresh_token_counts_as_absent() {
		let store = Arc::new(SessionStore::in_memory(Some(session(Some(""), None))));
		let gateway = FakeGateway::new();

		let report = scheduler(&store, &gateway).tick().await;
		assert_eq!(report.get(Provider::Google), &ProviderRefresh::Skipped);
		assert!(gateway.calls().is_empty());
	}

	#[tokio::test]
	async fn failure_for_one_provider_leaves_session_intact() {
		let store = Arc::new(SessionStore::in_memory(Some(session(Some("g-ref"), Some("c-ref")))));
		let gateway = FakeGateway::new()
			.with_refresh(
				Provider::Google,
				Err(GatewayError::Status {
					status: 401,
					message: "revoked".into(),
				}),
			)
			.with_refresh(Provider::Canva, refreshed("c-new", Some("c-rotated")));

		let report = scheduler(&store, &gateway).tick().await;

		assert!(matches!(report.google, ProviderRefresh::Failed(_)));
		assert_eq!(report.canva, ProviderRefresh::Refreshed);
		let session = store.get().unwrap();
		assert_eq!(session.token(Provider::Google), Some("g-old"));
		assert_eq!(session.refresh_token(Provider::Google), Some("g-ref"));
		assert_eq!(session.refresh_token(Provider::Canva), Some("c-rotated"));
	}

	#[tokio::test]
	async fn no_session_skips_everything() {
		let store = Arc::new(SessionStore::in_memory(None));
		let report = scheduler(&store, &FakeGateway::new()).tick().await;
		assert_eq!(report.google, ProviderRefresh::Skipped);
		assert_eq!(report.canva, ProviderRefresh::Skipped);
		assert!(store.get().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn spawned_task_ticks_on_interval_until_stopped() {
		let store = Arc::new(SessionStore::in_memory(Some(session(None, Some("c-ref")))));
		let gateway = FakeGateway::new().with_refresh(Provider::Canva, refreshed("c-new", None));
		let ticks = Arc::new(AtomicUsize::new(0));

		let handle = {
			let ticks = ticks.clone();
			scheduler(&store, &gateway).spawn_with(move |_| {
				ticks.fetch_add(1, Ordering::SeqCst);
			})
		};

		tokio::time::sleep(Duration::from_secs(179)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 0, "first tick waits a full interval");

		tokio::time::sleep(Duration::from_secs(2 * 180)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 2);
		assert!(handle.is_running());

		handle.stop().await;
		tokio::time::sleep(Duration::from_secs(600)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 2);
	}
}
