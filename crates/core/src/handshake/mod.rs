//! Interactive provider handshakes.
//!
//! A handshake opens an authentication window at the gateway's
//! `/{provider}/auth` page and waits for the page to post a completion
//! message back. Messages reach the waiting broker through a [`MessageHub`];
//! whatever transport receives them (the CLI uses a local HTTP listener)
//! only needs to call [`MessageHub::dispatch`].

mod broker;
mod hub;
mod origin;
mod window;

pub use broker::HandshakeBroker;
pub use hub::{InboundMessage, Listener, MessageHub};
pub use origin::{OriginAllowList, normalize_origin};
pub use window::{AuthWindow, BrowserWindowOpener, UntrackedWindow, WindowOpener};

use thiserror::Error;

/// Terminal failure of a handshake. Exactly one outcome is produced per
/// [`HandshakeBroker::begin`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
	#[error("could not open the authentication window: {0}")]
	PopupBlocked(String),

	#[error("authentication timed out")]
	Timeout,

	#[error("authentication window was closed before completing")]
	Cancelled,

	#[error("authentication failed: {0}")]
	Failed(String),
}
