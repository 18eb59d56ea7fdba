use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use slidebatch_runtime::{AppWindow, WindowError, launch_app_window, open_in_system_browser};
use tracing::{debug, warn};

use super::HandshakeError;

/// A window an interactive handshake runs in.
pub trait AuthWindow: Send {
	/// `true` once the user has closed the window.
	fn is_closed(&mut self) -> bool;

	fn close(&mut self);
}

/// Produces authentication windows.
pub trait WindowOpener: Send + Sync {
	/// Opens `url`. Failing to produce a window maps to
	/// [`HandshakeError::PopupBlocked`].
	fn open(&self, url: &str) -> Result<Box<dyn AuthWindow>, HandshakeError>;
}

/// A window we cannot observe, such as a tab in the user's default browser.
/// It never reports itself closed, so only the timeout ends an abandoned flow.
#[derive(Debug, Default)]
pub struct UntrackedWindow;

impl AuthWindow for UntrackedWindow {
	fn is_closed(&mut self) -> bool {
		false
	}

	fn close(&mut self) {}
}

/// Opens handshakes in a dedicated browser app window, falling back to the
/// system browser when no Chromium-family browser is installed.
#[derive(Debug)]
pub struct BrowserWindowOpener {
	profile_root: PathBuf,
	counter: AtomicU64,
}

impl BrowserWindowOpener {
	/// Throwaway browser profiles are created under `profile_root`.
	pub fn new(profile_root: impl Into<PathBuf>) -> Self {
		Self {
			profile_root: profile_root.into(),
			counter: AtomicU64::new(0),
		}
	}
}

impl WindowOpener for BrowserWindowOpener {
	fn open(&self, url: &str) -> Result<Box<dyn AuthWindow>, HandshakeError> {
		let seq = self.counter.fetch_add(1, Ordering::Relaxed);
		let profile = self.profile_root.join(format!("auth-{}-{seq}", std::process::id()));

		match launch_app_window(url, &profile) {
			Ok(window) => Ok(Box::new(BrowserWindow { window, profile })),
			Err(WindowError::BrowserNotFound) => {
				warn!(target = "slidebatch.handshake", "no app-capable browser found, using the system browser; closing the tab will not be detected");
				open_in_system_browser(url).map_err(|err| HandshakeError::PopupBlocked(err.to_string()))?;
				Ok(Box::new(UntrackedWindow))
			}
			Err(err) => Err(HandshakeError::PopupBlocked(err.to_string())),
		}
	}
}

struct BrowserWindow {
	window: AppWindow,
	profile: PathBuf,
}

impl AuthWindow for BrowserWindow {
	fn is_closed(&mut self) -> bool {
		self.window.is_closed()
	}

	fn close(&mut self) {
		self.window.close();
	}
}

impl Drop for BrowserWindow {
	fn drop(&mut self) {
		self.window.close();
		if let Err(err) = std::fs::remove_dir_all(&self.profile) {
			if err.kind() != std::io::ErrorKind::NotFound {
				debug!(target = "slidebatch.handshake", profile = %self.profile.display(), error = %err, "failed to remove auth profile");
			}
		}
	}
}
