//! Port helpers for the local callback listener.

/// Returns `true` when `port` can be bound on localhost.
pub fn port_available(port: u16) -> bool {
	std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Returns `preferred` when it is free, otherwise a port the OS hands out.
///
/// The probe socket is released before returning, so a racing process can
/// still take the port; callers bind immediately afterwards.
pub fn pick_callback_port(preferred: Option<u16>) -> Option<u16> {
	if let Some(port) = preferred.filter(|port| *port != 0 && port_available(*port)) {
		return Some(port);
	}

	std::net::TcpListener::bind(("127.0.0.1", 0))
		.and_then(|listener| listener.local_addr())
		.map(|addr| addr.port())
		.ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bound_port_is_reported_unavailable() {
		let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
		let port = listener.local_addr().unwrap().port();
		assert!(!port_available(port));
		drop(listener);
		assert!(port_available(port));
	}

	#[test]
	fn busy_preferred_port_falls_back_to_ephemeral() {
		let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
		let busy = listener.local_addr().unwrap().port();

		let picked = pick_callback_port(Some(busy)).unwrap();
		assert_ne!(picked, busy);
	}

	#[test]
	fn zero_preferred_port_is_ignored() {
		assert!(pick_callback_port(Some(0)).is_some_and(|port| port != 0));
	}
}
