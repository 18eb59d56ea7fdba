//! Standalone browser windows for interactive handshakes.
//!
//! A window launched with its own profile directory is owned by the child
//! process we spawn, so the process exiting means the user closed it. The
//! system-browser fallback gives no such signal.

use std::path::Path;
use std::process::{Child, Command, Stdio};

use thiserror::Error;

use crate::browser::find_browser_executable;

#[derive(Debug, Error)]
pub enum WindowError {
	#[error("no Chromium-family browser found; set SLIDEBATCH_BROWSER")]
	BrowserNotFound,
	#[error("failed to launch {program}: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},
}

/// A browser window running in a child process we own.
#[derive(Debug)]
pub struct AppWindow {
	child: Child,
}

impl AppWindow {
	pub fn pid(&self) -> u32 {
		self.child.id()
	}

	/// Returns `true` once the window process has exited.
	pub fn is_closed(&mut self) -> bool {
		!matches!(self.child.try_wait(), Ok(None))
	}

	/// Terminates the window process if it is still running.
	pub fn close(&mut self) {
		if self.is_closed() {
			return;
		}
		if let Err(err) = self.child.kill() {
			tracing::debug!(target = "slidebatch.runtime", pid = self.child.id(), error = %err, "failed to kill auth window");
		}
		let _ = self.child.wait();
	}
}

impl Drop for AppWindow {
	fn drop(&mut self) {
		self.close();
	}
}

/// Opens `url` in a dedicated app-mode window using `profile_dir` as the
/// browser profile.
pub fn launch_app_window(url: &str, profile_dir: &Path) -> Result<AppWindow, WindowError> {
	let program = find_browser_executable().ok_or(WindowError::BrowserNotFound)?;

	let mut cmd = Command::new(&program);
	cmd.arg(format!("--app={url}"))
		.arg("--new-window")
		.arg("--no-first-run")
		.arg("--no-default-browser-check")
		.arg(format!("--user-data-dir={}", profile_dir.display()))
		.arg("--window-size=520,640")
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null());

	#[cfg(unix)]
	std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

	let child = cmd.spawn().map_err(|source| WindowError::Spawn { program: program.clone(), source })?;
	tracing::debug!(target = "slidebatch.runtime", %program, pid = child.id(), "launched auth window");
	Ok(AppWindow { child })
}

/// Hands `url` to the platform's default browser. The resulting tab is not
/// tracked.
pub fn open_in_system_browser(url: &str) -> Result<(), WindowError> {
	let (program, args) = system_open_command(url);
	let mut cmd = Command::new(program);
	cmd.args(&args);
	spawn_reaped(cmd, program).map(|_| ())
}

/// The opener passes the URL as one argument. `cmd /C start` is avoided on
/// Windows since it splits at `&`.
fn system_open_command(url: &str) -> (&'static str, Vec<String>) {
	if cfg!(target_os = "macos") {
		("open", vec![url.to_string()])
	} else if cfg!(target_os = "windows") {
		("rundll32", vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()])
	} else {
		("xdg-open", vec![url.to_string()])
	}
}

/// Spawns `cmd` detached from our stdio and waits for it on a background
/// thread so the exited opener does not linger as a zombie.
fn spawn_reaped(mut cmd: Command, program: &str) -> Result<std::thread::JoinHandle<()>, WindowError> {
	let mut child = cmd
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.spawn()
		.map_err(|source| WindowError::Spawn { program: program.to_string(), source })?;
	let program = program.to_string();
	Ok(std::thread::spawn(move || match child.wait() {
		Ok(status) if !status.success() => tracing::debug!(target = "slidebatch.runtime", %program, %status, "system browser opener exited with failure"),
		Ok(_) => {}
		Err(err) => tracing::debug!(target = "slidebatch.runtime", %program, error = %err, "failed to wait for system browser opener"),
	}))
}
