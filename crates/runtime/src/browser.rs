//! Browser executable discovery for handshake windows.

use std::path::PathBuf;

/// Environment variable naming an explicit browser executable.
pub const BROWSER_ENV: &str = "SLIDEBATCH_BROWSER";

/// Finds a Chromium-family browser able to open a standalone app window.
///
/// `SLIDEBATCH_BROWSER` wins when set and resolvable; otherwise the usual
/// install locations and `PATH` entries are probed in order.
pub fn find_browser_executable() -> Option<String> {
	if let Ok(explicit) = std::env::var(BROWSER_ENV) {
		let explicit = explicit.trim().to_string();
		if !explicit.is_empty() && resolves(&explicit) {
			return Some(explicit);
		}
		tracing::warn!(target = "slidebatch.runtime", browser = %explicit, "configured browser not found, probing defaults");
	}

	browser_candidates().into_iter().find(|candidate| resolves(candidate))
}

fn resolves(candidate: &str) -> bool {
	if candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':') {
		std::path::Path::new(candidate).exists()
	} else {
		which::which(candidate).is_ok()
	}
}

fn browser_candidates() -> Vec<String> {
	if cfg!(target_os = "macos") {
		[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_browser_candidates()
	} else {
		[
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"microsoft-edge",
			"brave-browser",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	}
}

fn windows_browser_candidates() -> Vec<String> {
	let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
		.into_iter()
		.filter_map(|key| std::env::var(key).ok().map(PathBuf::from))
		.collect();
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[
		&["Google", "Chrome", "Application", "chrome.exe"],
		&["Microsoft", "Edge", "Application", "msedge.exe"],
		&["BraveSoftware", "Brave-Browser", "Application", "brave.exe"],
	];

	let mut candidates = Vec::new();
	for root in &roots {
		for suffix in suffixes {
			let path = suffix.iter().fold(root.clone(), |path, component| path.join(component));
			candidates.push(path.to_string_lossy().to_string());
		}
	}
	candidates.extend(["chrome.exe", "msedge.exe", "brave.exe"].map(str::to_string));
	candidates
}
