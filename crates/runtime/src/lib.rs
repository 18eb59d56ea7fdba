//! Host process helpers for slidebatch.
//!
//! Everything here talks to the operating system rather than to a provider:
//! locating a Chromium-family browser, launching the standalone window an
//! interactive handshake runs in, and probing local ports for the callback
//! listener.

pub mod browser;
pub mod process;
pub mod window;

pub use browser::find_browser_executable;
pub use process::{pick_callback_port, port_available};
pub use window::{AppWindow, WindowError, launch_app_window, open_in_system_browser};
