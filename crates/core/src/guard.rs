//! Validation of stored credentials before they are used.

use std::sync::Arc;

use serde::Serialize;
use slidebatch_protocol::Provider;
use tracing::{info, warn};

use crate::gateway::{Gateway, GatewayError};
use crate::session::{SessionError, SessionStore};

/// Result of checking one provider's credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardOutcome {
	/// The gateway accepted the stored token.
	Valid,
	/// The token was rejected but a refresh produced a new one.
	Refreshed,
	/// No token is stored for the provider.
	Missing,
	/// The credential could not be recovered and the session was cleared.
	Cleared,
}

impl GuardOutcome {
	pub fn is_usable(self) -> bool {
		matches!(self, GuardOutcome::Valid | GuardOutcome::Refreshed)
	}
}

/// Verifies a provider's token and recovers or discards it.
#[derive(Clone)]
pub struct CredentialGuard {
	store: Arc<SessionStore>,
	gateway: Arc<dyn Gateway>,
}

impl CredentialGuard {
	pub fn new(store: Arc<SessionStore>, gateway: Arc<dyn Gateway>) -> Self {
		Self { store, gateway }
	}

	/// Verifies the stored token; on rejection tries one refresh, and clears
	/// the session when that is impossible or fails.
	pub async fn check(&self, provider: Provider) -> Result<GuardOutcome, SessionError> {
		let Some(session) = self.store.get() else {
			return Ok(GuardOutcome::Missing);
		};
		let Some(token) = session.token(provider) else {
			return Ok(GuardOutcome::Missing);
		};

		match self.gateway.verify_token(provider, token).await {
			Ok(verified) if verified.valid => return Ok(GuardOutcome::Valid),
			Ok(_) => info!(target = "slidebatch.session", %provider, "stored token rejected"),
			Err(err) => warn!(target = "slidebatch.session", %provider, error = %err, "token verification failed"),
		}

		let Some(refresh_token) = session.refresh_token(provider) else {
			self.store.clear().await?;
			return Ok(GuardOutcome::Cleared);
		};

		match self.gateway.refresh_token(provider, refresh_token).await {
			Ok(response) => match self.store.replace_token(provider, response.access_token, response.refresh_token).await? {
				Some(_) => Ok(GuardOutcome::Refreshed),
				None => Ok(GuardOutcome::Missing),
			},
			Err(err) => {
				warn!(target = "slidebatch.session", %provider, error = %err, "refresh failed, clearing session");
				self.store.clear().await?;
				Ok(GuardOutcome::Cleared)
			}
		}
	}

	/// Clears the session when `err` says a credential was rejected. Returns
	/// whether it did.
	pub async fn invalidate_on_auth_failure(&self, err: &GatewayError) -> Result<bool, SessionError> {
		if !err.is_auth_failure() {
			return Ok(false);
		}
		warn!(target = "slidebatch.session", error = %err, "credential rejected by gateway, clearing session");
		self.store.clear().await?;
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use slidebatch_protocol::{RefreshResponse, VerifyResponse};

	use super::*;
	use crate::session::Session;
	use crate::testing::FakeGateway;

	fn canva_session(refresh: Option<&str>) -> Session {
		Session {
			canva_token: Some("c-old".into()),
			canva_refresh_token: refresh.map(str::to_string),
			google_token: Some("g".into()),
			..Session::default()
		}
	}

	fn invalid() -> Result<VerifyResponse, GatewayError> {
		Ok(VerifyResponse::default())
	}

	fn guard(session: Option<Session>, gateway: FakeGateway) -> (CredentialGuard, Arc<SessionStore>) {
		let store = Arc::new(SessionStore::in_memory(session));
		(CredentialGuard::new(store.clone(), Arc::new(gateway)), store)
	}

	#[tokio::test]
	async fn missing_token_is_reported_without_calls() {
		let gateway = FakeGateway::new();
		let (guard, _) = guard(None, gateway.clone());
		assert_eq!(guard.check(Provider::Canva).await.unwrap(), GuardOutcome::Missing);
		assert!(gateway.calls().is_empty());
	}

	#[tokio::test]
	async fn valid_token_passes() {
		let (guard, store) = guard(Some(canva_session(None)), FakeGateway::new());
		assert_eq!(guard.check(Provider::Canva).await.unwrap(), GuardOutcome::Valid);
		assert!(store.get().is_some());
	}

	#[tokio::test]
	async fn rejected_token_without_refresh_clears_session() {
		let gateway = FakeGateway::new().with_verify(Provider::Canva, invalid());
		let (guard, store) = guard(Some(canva_session(None)), gateway);

		assert_eq!(guard.check(Provider::Canva).await.unwrap(), GuardOutcome::Cleared);
		assert!(store.get().is_none());
	}

	#[tokio::test]
	async fn rejected_token_is_refreshed_keeping_refresh_token() {
		let gateway = FakeGateway::new().with_verify(Provider::Canva, invalid()).with_refresh(
			Provider::Canva,
			Ok(RefreshResponse {
				access_token: "c-new".into(),
				refresh_token: None,
			}),
		);
		let (guard, store) = guard(Some(canva_session(Some("c-ref"))), gateway);

		assert_eq!(guard.check(Provider::Canva).await.unwrap(), GuardOutcome::Refreshed);
		let session = store.get().unwrap();
		assert_eq!(session.token(Provider::Canva), Some("c-new"));
		assert_eq!(session.refresh_token(Provider::Canva), Some("c-ref"));
	}

	#[tokio::test]
	async fn failed_refresh_clears_session() {
		let gateway = FakeGateway::new().with_verify(Provider::Canva, Err(GatewayError::Transport("offline".into())));
		let (guard, store) = guard(Some(canva_session(Some("c-ref"))), gateway);

		assert_eq!(guard.check(Provider::Canva).await.unwrap(), GuardOutcome::Cleared);
		assert!(store.get().is_none());
	}

	#[tokio::test]
	async fn only_auth_failures_invalidate() {
		let (guard, store) = guard(Some(canva_session(None)), FakeGateway::new());

		let server_error = GatewayError::Status {
			status: 500,
			message: "boom".into(),
		};
		assert!(!guard.invalidate_on_auth_failure(&server_error).await.unwrap());
		assert!(store.get().is_some());

		let forbidden = GatewayError::Status {
			status: 403,
			message: "forbidden".into(),
		};
		assert!(guard.invalidate_on_auth_failure(&forbidden).await.unwrap());
		assert!(store.get().is_none());
	}
}
