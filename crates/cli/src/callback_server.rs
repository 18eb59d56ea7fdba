//! Loopback endpoint the auth page posts its completion message to.
//!
//! The page runs on the application origin and calls
//! `fetch(callback, {method: "POST", body})`; the browser attaches the
//! `Origin` header, which is handed to the [`MessageHub`] untouched so the
//! handshake broker applies its own allow-list.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::json;
use slidebatch::handshake::{InboundMessage, MessageHub, OriginAllowList};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const MESSAGE_PATH: &str = "/message";

#[derive(Clone)]
struct CallbackState {
	hub: MessageHub,
	allow_list: Arc<OriginAllowList>,
}

/// Running callback listener. Dropping it stops the server.
#[derive(Debug)]
pub struct CallbackServer {
	addr: SocketAddr,
	shutdown: Option<oneshot::Sender<()>>,
	task: Option<JoinHandle<()>>,
}

impl CallbackServer {
	/// Binds `127.0.0.1:port` (`0` for any free port) and starts serving.
	pub async fn start(hub: MessageHub, allow_list: OriginAllowList, port: u16) -> std::io::Result<Self> {
		let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;
		let addr = listener.local_addr()?;
		let state = CallbackState {
			hub,
			allow_list: Arc::new(allow_list),
		};
		let app = Router::new()
			.route(MESSAGE_PATH, post(receive_message).options(preflight))
			.with_state(state);

		let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
		let task = tokio::spawn(async move {
			let server = axum::serve(listener, app).with_graceful_shutdown(async {
				let _ = shutdown_rx.await;
			});
			if let Err(err) = server.await {
				warn!(target = "slidebatch.cli", error = %err, "callback server stopped with an error");
			}
		});
		debug!(target = "slidebatch.cli", %addr, "callback server listening");

		Ok(Self {
			addr,
			shutdown: Some(shutdown_tx),
			task: Some(task),
		})
	}

	pub fn addr(&self) -> SocketAddr {
		self.addr
	}

	pub fn message_url(&self) -> String {
		format!("http://{}{MESSAGE_PATH}", self.addr)
	}

	/// Stops accepting connections and waits for in-flight requests.
	pub async fn shutdown(mut self) {
		if let Some(shutdown) = self.shutdown.take() {
			let _ = shutdown.send(());
		}
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

impl Drop for CallbackServer {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

fn request_origin(headers: &HeaderMap) -> Option<String> {
	headers.get(header::ORIGIN).and_then(|value| value.to_str().ok()).map(str::to_string)
}

/// CORS headers granting `origin` access, if it is allow-listed.
fn cors_headers(allow_list: &OriginAllowList, origin: Option<&str>) -> HeaderMap {
	let mut headers = HeaderMap::new();
	let Some(origin) = origin.filter(|origin| allow_list.allows(origin)) else {
		return headers;
	};
	if let Ok(value) = HeaderValue::from_str(origin) {
		headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
		headers.insert(header::VARY, HeaderValue::from_static("origin"));
	}
	headers
}

async fn receive_message(State(state): State<CallbackState>, headers: HeaderMap, body: String) -> Response {
	let origin = request_origin(&headers);
	let cors = cors_headers(&state.allow_list, origin.as_deref());

	let payload = match serde_json::from_str::<serde_json::Value>(&body) {
		Ok(payload) => payload,
		Err(err) => {
			debug!(target = "slidebatch.cli", error = %err, "rejecting non-JSON callback body");
			return (StatusCode::BAD_REQUEST, cors, axum::Json(json!({"error": "body must be JSON"}))).into_response();
		}
	};

	let delivered = state.hub.dispatch(InboundMessage { origin, payload });
	(StatusCode::ACCEPTED, cors, axum::Json(json!({"delivered": delivered}))).into_response()
}

async fn preflight(State(state): State<CallbackState>, headers: HeaderMap) -> Response {
	let origin = request_origin(&headers);
	let mut cors = cors_headers(&state.allow_list, origin.as_deref());
	if cors.is_empty() {
		return StatusCode::FORBIDDEN.into_response();
	}
	cors.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
	cors.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("content-type"));
	(StatusCode::NO_CONTENT, cors).into_response()
}
