//! Persisted provider credentials.
//!
//! A [`Session`] is the only persisted entity. It is read and written
//! exclusively through [`SessionStore`], which serializes writers and merges
//! each change into the latest persisted record.

mod backend;
mod model;
mod store;

pub use backend::{FileBackend, MemoryBackend, SESSION_KEY, SessionBackend};
pub use model::Session;
pub use store::SessionStore;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("failed to access session store {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("session record is corrupt: {0}")]
	Corrupt(String),

	#[error("failed to encode session: {0}")]
	Encode(#[from] serde_json::Error),
}
