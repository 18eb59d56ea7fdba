use std::path::PathBuf;
use std::sync::Arc;

use slidebatch_protocol::{Provider, ProviderCredentials};
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use super::{FileBackend, MemoryBackend, Session, SessionBackend, SessionError};

/// Owner of the persisted [`Session`].
///
/// Every write goes through [`update`](Self::update) or one of the helpers
/// built on it. Writers are serialized, and each write starts from the record
/// as it currently exists in the backend, so changes made by another process
/// or another provider's flow are merged instead of overwritten.
pub struct SessionStore {
	backend: Arc<dyn SessionBackend>,
	writer: Mutex<()>,
	snapshot: watch::Sender<Option<Session>>,
}

impl std::fmt::Debug for SessionStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionStore").field("session", &*self.snapshot.borrow()).finish()
	}
}

impl SessionStore {
	/// Opens a store over `backend`, discarding a corrupt record.
	pub fn new(backend: impl SessionBackend + 'static) -> Result<Self, SessionError> {
		let backend: Arc<dyn SessionBackend> = Arc::new(backend);
		let initial = read_or_discard(backend.as_ref())?;
		let (snapshot, _) = watch::channel(initial);
		Ok(Self {
			backend,
			writer: Mutex::new(()),
			snapshot,
		})
	}

	/// Opens a store persisted in the JSON file at `path`.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
		Self::new(FileBackend::new(path))
	}

	/// A store that lives only as long as the process.
	pub fn in_memory(session: Option<Session>) -> Self {
		let backend = session.clone().map(MemoryBackend::with_session).unwrap_or_default();
		let (snapshot, _) = watch::channel(session);
		Self {
			backend: Arc::new(backend),
			writer: Mutex::new(()),
			snapshot,
		}
	}

	/// Current snapshot.
	pub fn get(&self) -> Option<Session> {
		self.snapshot.borrow().clone()
	}

	pub fn is_authenticated(&self, provider: Provider) -> bool {
		self.snapshot.borrow().as_ref().is_some_and(|session| session.is_authenticated(provider))
	}

	/// Receives every published snapshot, including clears.
	pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
		self.snapshot.subscribe()
	}

	/// Re-reads the backend and publishes what it holds.
	pub async fn reload(&self) -> Result<Option<Session>, SessionError> {
		let _guard = self.writer.lock().await;
		let latest = read_or_discard(self.backend.as_ref())?;
		self.publish(latest.clone());
		Ok(latest)
	}

	/// Applies `mutator` to the latest record, persists and publishes it.
	///
	/// When no session exists the mutator starts from an empty one.
	pub async fn update<F>(&self, mutator: F) -> Result<Session, SessionError>
	where
		F: FnOnce(&mut Session),
	{
		let _guard = self.writer.lock().await;
		let mut session = read_or_discard(self.backend.as_ref())?.unwrap_or_default();
		mutator(&mut session);
		self.commit(session)
	}

	/// Like [`update`](Self::update), but does nothing when no session exists.
	pub async fn update_existing<F>(&self, mutator: F) -> Result<Option<Session>, SessionError>
	where
		F: FnOnce(&mut Session),
	{
		let _guard = self.writer.lock().await;
		let Some(mut session) = read_or_discard(self.backend.as_ref())? else {
			self.publish(None);
			return Ok(None);
		};
		mutator(&mut session);
		self.commit(session).map(Some)
	}

	/// Removes the session entirely.
	pub async fn clear(&self) -> Result<(), SessionError> {
		let _guard = self.writer.lock().await;
		self.backend.clear()?;
		self.publish(None);
		debug!(target = "slidebatch.session", "session cleared");
		Ok(())
	}

	/// Stores the credentials a handshake produced, creating the session if
	/// needed.
	pub async fn set_credentials(&self, credentials: &ProviderCredentials) -> Result<Session, SessionError> {
		let session = self.update(|session| session.apply_credentials(credentials)).await?;
		debug!(target = "slidebatch.session", provider = %credentials.provider(), "stored provider credentials");
		Ok(session)
	}

	/// Replaces one provider's access token, keeping its refresh token unless
	/// a new one is given. Does not create a session.
	pub async fn replace_token(&self, provider: Provider, access_token: String, refresh_token: Option<String>) -> Result<Option<Session>, SessionError> {
		self.update_existing(|session| session.set_tokens(provider, access_token, refresh_token)).await
	}

	/// Stores the inference API key on an existing session.
	pub async fn set_gemini_api_key(&self, key: impl Into<String>) -> Result<Option<Session>, SessionError> {
		let key = key.into();
		self.update_existing(|session| session.gemini_api_key = Some(key)).await
	}

	/// Drops one provider's fields, leaving the rest of the session.
	pub async fn forget(&self, provider: Provider) -> Result<Option<Session>, SessionError> {
		self.update_existing(|session| session.forget(provider)).await
	}

	fn commit(&self, session: Session) -> Result<Session, SessionError> {
		self.backend.save(&session)?;
		self.publish(Some(session.clone()));
		Ok(session)
	}

	fn publish(&self, value: Option<Session>) {
		self.snapshot.send_if_modified(|current| {
			if *current == value {
				return false;
			}
			*current = value;
			true
		});
	}
}

fn read_or_discard(backend: &dyn SessionBackend) -> Result<Option<Session>, SessionError> {
	match backend.load() {
		Ok(session) => Ok(session),
		Err(SessionError::Corrupt(reason)) => {
			warn!(target = "slidebatch.session", %reason, "discarding unreadable session record");
			backend.clear()?;
			Ok(None)
		}
		Err(err) => Err(err),
	}
}
