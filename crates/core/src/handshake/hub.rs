use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A message as received by a transport, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
	/// Origin the sender claimed, e.g. `https://app.example.com`.
	pub origin: Option<String>,
	pub payload: serde_json::Value,
}

impl InboundMessage {
	pub fn new(origin: Option<impl Into<String>>, payload: serde_json::Value) -> Self {
		Self {
			origin: origin.map(Into::into),
			payload,
		}
	}
}

type Senders = HashMap<u64, mpsc::UnboundedSender<InboundMessage>>;

/// Fan-out point between message transports and in-flight handshakes.
///
/// Each [`Listener`] gets its own copy of every dispatched message and
/// unregisters itself when dropped, so a settled handshake stops receiving
/// immediately.
#[derive(Debug, Clone, Default)]
pub struct MessageHub {
	inner: Arc<HubInner>,
}

#[derive(Debug, Default)]
struct HubInner {
	next_id: AtomicU64,
	listeners: Mutex<Senders>,
}

impl MessageHub {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self) -> Listener {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		let (tx, rx) = mpsc::unbounded_channel();
		self.inner.listeners.lock().insert(id, tx);
		Listener {
			id,
			hub: self.inner.clone(),
			rx,
		}
	}

	/// Delivers `message` to every live listener and returns how many got it.
	pub fn dispatch(&self, message: InboundMessage) -> usize {
		let mut listeners = self.inner.listeners.lock();
		listeners.retain(|_, tx| !tx.is_closed());
		listeners.values().filter(|tx| tx.send(message.clone()).is_ok()).count()
	}

	pub fn listener_count(&self) -> usize {
		self.inner.listeners.lock().len()
	}
}

/// Receiving end registered with a [`MessageHub`].
#[derive(Debug)]
pub struct Listener {
	id: u64,
	hub: Arc<HubInner>,
	rx: mpsc::UnboundedReceiver<InboundMessage>,
}

impl Listener {
	pub async fn recv(&mut self) -> Option<InboundMessage> {
		self.rx.recv().await
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		self.hub.listeners.lock().remove(&self.id);
	}
}
