//! Storage backends for the session record.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{Session, SessionError};

/// Key under which the session lives inside the store file.
pub const SESSION_KEY: &str = "auth_session";

/// Durable home of the session record.
///
/// Implementations only move whole records; merging happens in
/// [`SessionStore`](super::SessionStore).
pub trait SessionBackend: Send + Sync {
	/// Reads the persisted record. `Ok(None)` means no session exists.
	fn load(&self) -> Result<Option<Session>, SessionError>;

	fn save(&self, session: &Session) -> Result<(), SessionError>;

	/// Removes the record. Removing an absent record succeeds.
	fn clear(&self) -> Result<(), SessionError>;
}

/// JSON object on disk shared with other keyed state.
///
/// The session is stored under [`SESSION_KEY`]; any other keys in the file
/// are preserved across writes.
#[derive(Debug, Clone)]
pub struct FileBackend {
	path: PathBuf,
}

impl FileBackend {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_object(&self) -> Result<Option<Map<String, Value>>, SessionError> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(source) => {
				return Err(SessionError::Io {
					path: self.path.clone(),
					source,
				});
			}
		};
		if content.trim().is_empty() {
			return Ok(None);
		}
		match serde_json::from_str::<Value>(&content) {
			Ok(Value::Object(map)) => Ok(Some(map)),
			Ok(_) => Err(SessionError::Corrupt(format!("{} is not a JSON object", self.path.display()))),
			Err(err) => Err(SessionError::Corrupt(format!("{}: {err}", self.path.display()))),
		}
	}

	/// Existing object, or a fresh one when the file is missing or unreadable
	/// as an object.
	fn object_for_write(&self) -> Result<Map<String, Value>, SessionError> {
		match self.read_object() {
			Ok(map) => Ok(map.unwrap_or_default()),
			Err(SessionError::Corrupt(_)) => Ok(Map::new()),
			Err(err) => Err(err),
		}
	}

	fn write_object(&self, map: &Map<String, Value>) -> Result<(), SessionError> {
		let io_err = |source: std::io::Error| SessionError::Io {
			path: self.path.clone(),
			source,
		};
		if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(io_err)?;
		}
		let content = serde_json::to_string_pretty(map)?;
		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, content).map_err(io_err)?;
		fs::rename(&tmp, &self.path).map_err(io_err)
	}
}

impl SessionBackend for FileBackend {
	fn load(&self) -> Result<Option<Session>, SessionError> {
		let Some(mut map) = self.read_object()? else {
			return Ok(None);
		};
		let Some(value) = map.remove(SESSION_KEY) else {
			return Ok(None);
		};
		if value.is_null() {
			return Ok(None);
		}
		serde_json::from_value(value)
			.map(Some)
			.map_err(|err| SessionError::Corrupt(format!("{SESSION_KEY}: {err}")))
	}

	fn save(&self, session: &Session) -> Result<(), SessionError> {
		let mut map = self.object_for_write()?;
		map.insert(SESSION_KEY.to_string(), serde_json::to_value(session)?);
		self.write_object(&map)
	}

	fn clear(&self) -> Result<(), SessionError> {
		let mut map = match self.read_object() {
			Ok(Some(map)) => map,
			Ok(None) => return Ok(()),
			Err(SessionError::Corrupt(_)) => Map::new(),
			Err(err) => return Err(err),
		};
		map.remove(SESSION_KEY);
		self.write_object(&map)
	}
}

/// Process-local backend for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryBackend {
	record: Mutex<Option<Session>>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session(session: Session) -> Self {
		Self {
			record: Mutex::new(Some(session)),
		}
	}
}

impl SessionBackend for MemoryBackend {
	fn load(&self) -> Result<Option<Session>, SessionError> {
		Ok(self.record.lock().clone())
	}

	fn save(&self, session: &Session) -> Result<(), SessionError> {
		*self.record.lock() = Some(session.clone());
		Ok(())
	}

	fn clear(&self) -> Result<(), SessionError> {
		*self.record.lock() = None;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn google_session() -> Session {
		Session {
			google_token: Some("g".into()),
			..Session::default()
		}
	}

	#[test]
	fn missing_file_means_no_session() {
		let temp = TempDir::new().unwrap();
		let backend = FileBackend::new(temp.path().join("store.json"));
		assert!(backend.load().unwrap().is_none());
		backend.clear().unwrap();
	}

	#[test]
	fn save_creates_parent_dirs_and_round_trips() {
		let temp = TempDir::new().unwrap();
		let backend = FileBackend::new(temp.path().join("nested/state/store.json"));
		backend.save(&google_session()).unwrap();
		assert_eq!(backend.load().unwrap(), Some(google_session()));
	}

	#[test]
	fn unrelated_keys_survive_save_and_clear() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("store.json");
		fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
		let backend = FileBackend::new(&path);

		backend.save(&google_session()).unwrap();
		backend.clear().unwrap();

		let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(value["theme"], "dark");
		assert!(value.get(SESSION_KEY).is_none());
	}

	#[test]
	fn malformed_record_reports_corrupt() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("store.json");
		fs::write(&path, r#"{"auth_session":"not an object"}"#).unwrap();
		let backend = FileBackend::new(&path);
		assert!(matches!(backend.load(), Err(SessionError::Corrupt(_))));

		fs::write(&path, "{ truncated").unwrap();
		assert!(matches!(backend.load(), Err(SessionError::Corrupt(_))));

		backend.save(&google_session()).unwrap();
		assert_eq!(backend.load().unwrap(), Some(google_session()));
	}
}
