//! In-process fakes for the gateway and for authentication windows.
//!
//! These let the scheduler, guard, broker and batch runner be exercised
//! without a network or a browser. Every fake is cheaply cloneable; clones
//! share state, so a test keeps one handle for scripting and assertions and
//! hands the other to the component under test.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use slidebatch_protocol::{DriveFolder, DrivePage, ExportRow, GenerateRequest, GenerateResponse, Provider, RefreshResponse, VerifyResponse};

use crate::gateway::{DriveQuery, Gateway, GatewayError};
use crate::handshake::{AuthWindow, HandshakeError, WindowOpener};

/// A call the fake gateway received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
	Verify { provider: Provider, token: String },
	Refresh { provider: Provider, refresh_token: String },
	ListFolders(DriveQuery),
	ListImages(DriveQuery),
	ListDocs(DriveQuery),
	DocContent(String),
	Generate { token: String, request: GenerateRequest },
	Export { token: String, rows: Vec<ExportRow> },
}

#[derive(Debug, Default)]
struct GatewayState {
	verify: HashMap<Provider, Result<VerifyResponse, GatewayError>>,
	refresh: HashMap<Provider, Result<RefreshResponse, GatewayError>>,
	generate: VecDeque<Result<GenerateResponse, GatewayError>>,
	generate_delay: Option<Duration>,
	export: Option<Result<String, GatewayError>>,
	folders: Vec<DriveFolder>,
	images: DrivePage,
	docs: DrivePage,
	doc_contents: HashMap<String, String>,
	calls: Vec<GatewayCall>,
	in_flight: usize,
	max_in_flight: usize,
	generated: usize,
}

/// Scriptable [`Gateway`].
///
/// Unscripted verifications succeed, unscripted refreshes fail with 400 and
/// unscripted generations succeed with a numbered URL.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
	state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_verify(self, provider: Provider, result: Result<VerifyResponse, GatewayError>) -> Self {
		self.state.lock().verify.insert(provider, result);
		self
	}

	pub fn with_refresh(self, provider: Provider, result: Result<RefreshResponse, GatewayError>) -> Self {
		self.state.lock().refresh.insert(provider, result);
		self
	}

	/// Queues the outcome of the next generation call.
	pub fn push_generate(self, result: Result<GenerateResponse, GatewayError>) -> Self {
		self.state.lock().generate.push_back(result);
		self
	}

	pub fn with_generate_delay(self, delay: Duration) -> Self {
		self.state.lock().generate_delay = Some(delay);
		self
	}

	pub fn with_export(self, result: Result<String, GatewayError>) -> Self {
		self.state.lock().export = Some(result);
		self
	}

	pub fn with_folders(self, folders: Vec<DriveFolder>) -> Self {
		self.state.lock().folders = folders;
		self
	}

	pub fn with_images(self, page: DrivePage) -> Self {
		self.state.lock().images = page;
		self
	}

	pub fn with_docs(self, page: DrivePage) -> Self {
		self.state.lock().docs = page;
		self
	}

	pub fn with_doc_content(self, doc_id: impl Into<String>, content: impl Into<String>) -> Self {
		self.state.lock().doc_contents.insert(doc_id.into(), content.into());
		self
	}

	pub fn calls(&self) -> Vec<GatewayCall> {
		self.state.lock().calls.clone()
	}

	pub fn generate_requests(&self) -> Vec<GenerateRequest> {
		self.state
			.lock()
			.calls
			.iter()
			.filter_map(|call| match call {
				GatewayCall::Generate { request, .. } => Some(request.clone()),
				_ => None,
			})
			.collect()
	}

	/// Highest number of generation calls that were in flight at once.
	pub fn max_concurrent_generates(&self) -> usize {
		self.state.lock().max_in_flight
	}

	fn record(&self, call: GatewayCall) {
		self.state.lock().calls.push(call);
	}
}

#[async_trait]
impl Gateway for FakeGateway {
	async fn verify_token(&self, provider: Provider, access_token: &str) -> Result<VerifyResponse, GatewayError> {
		self.record(GatewayCall::Verify {
			provider,
			token: access_token.to_string(),
		});
		self.state.lock().verify.get(&provider).cloned().unwrap_or_else(|| {
			Ok(VerifyResponse {
				valid: true,
				..VerifyResponse::default()
			})
		})
	}

	async fn refresh_token(&self, provider: Provider, refresh_token: &str) -> Result<RefreshResponse, GatewayError> {
		self.record(GatewayCall::Refresh {
			provider,
			refresh_token: refresh_token.to_string(),
		});
		self.state.lock().refresh.get(&provider).cloned().unwrap_or_else(|| {
			Err(GatewayError::Status {
				status: 400,
				message: "refresh not scripted".into(),
			})
		})
	}

	async fn list_folders(&self, _google_token: &str, query: &DriveQuery) -> Result<Vec<DriveFolder>, GatewayError> {
		self.record(GatewayCall::ListFolders(query.clone()));
		Ok(self.state.lock().folders.clone())
	}

	async fn list_images(&self, _google_token: &str, query: &DriveQuery) -> Result<DrivePage, GatewayError> {
		self.record(GatewayCall::ListImages(query.clone()));
		Ok(self.state.lock().images.clone())
	}

	async fn list_docs(&self, _google_token: &str, query: &DriveQuery) -> Result<DrivePage, GatewayError> {
		self.record(GatewayCall::ListDocs(query.clone()));
		Ok(self.state.lock().docs.clone())
	}

	async fn doc_content(&self, _google_token: &str, doc_id: &str) -> Result<String, GatewayError> {
		self.record(GatewayCall::DocContent(doc_id.to_string()));
		self.state.lock().doc_contents.get(doc_id).cloned().ok_or_else(|| GatewayError::Status {
			status: 404,
			message: format!("document {doc_id} not found"),
		})
	}

	async fn generate_design(&self, canva_token: &str, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
		let delay = {
			let mut state = self.state.lock();
			state.calls.push(GatewayCall::Generate {
				token: canva_token.to_string(),
				request: request.clone(),
			});
			state.in_flight += 1;
			state.max_in_flight = state.max_in_flight.max(state.in_flight);
			state.generate_delay
		};

		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let mut state = self.state.lock();
		state.in_flight -= 1;
		state.generated += 1;
		let n = state.generated;
		state.generate.pop_front().unwrap_or_else(|| {
			Ok(GenerateResponse {
				url: format!("https://canva.test/design/{n}"),
				thumbnail: None,
			})
		})
	}

	async fn export_results(&self, google_token: &str, rows: &[ExportRow]) -> Result<String, GatewayError> {
		self.record(GatewayCall::Export {
			token: google_token.to_string(),
			rows: rows.to_vec(),
		});
		self.state.lock().export.clone().unwrap_or_else(|| Ok("https://sheets.test/export".to_string()))
	}
}

#[derive(Debug, Default)]
struct WindowFlags {
	closed_by_user: AtomicBool,
	closed: AtomicBool,
}

#[derive(Debug, Default)]
struct OpenerState {
	blocked: bool,
	opened: Vec<String>,
	windows: Vec<Arc<WindowFlags>>,
}

/// [`WindowOpener`] that records URLs and hands out controllable windows.
#[derive(Debug, Clone, Default)]
pub struct FakeWindowOpener {
	state: Arc<Mutex<OpenerState>>,
}

impl FakeWindowOpener {
	pub fn new() -> Self {
		Self::default()
	}

	/// An opener whose every attempt fails, like a blocked popup.
	pub fn blocked() -> Self {
		let opener = Self::default();
		opener.state.lock().blocked = true;
		opener
	}

	pub fn opened_urls(&self) -> Vec<String> {
		self.state.lock().opened.clone()
	}

	/// Simulates the user closing the most recent window.
	pub fn close_last_window(&self) {
		if let Some(flags) = self.state.lock().windows.last() {
			flags.closed_by_user.store(true, Ordering::SeqCst);
		}
	}

	/// Whether the most recent window was closed by the code under test.
	pub fn last_window_closed(&self) -> bool {
		self.state.lock().windows.last().is_some_and(|flags| flags.closed.load(Ordering::SeqCst))
	}
}

impl WindowOpener for FakeWindowOpener {
	fn open(&self, url: &str) -> Result<Box<dyn AuthWindow>, HandshakeError> {
		let mut state = self.state.lock();
		if state.blocked {
			return Err(HandshakeError::PopupBlocked("popup blocked".into()));
		}
		state.opened.push(url.to_string());
		let flags = Arc::new(WindowFlags::default());
		state.windows.push(flags.clone());
		Ok(Box::new(FakeWindow { flags }))
	}
}

struct FakeWindow {
	flags: Arc<WindowFlags>,
}

impl AuthWindow for FakeWindow {
	fn is_closed(&mut self) -> bool {
		self.flags.closed_by_user.load(Ordering::SeqCst) || self.flags.closed.load(Ordering::SeqCst)
	}

	fn close(&mut self) {
		self.flags.closed.store(true, Ordering::SeqCst);
	}
}
