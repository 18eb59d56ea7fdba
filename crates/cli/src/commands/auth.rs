//! Provider login and session maintenance.
//!
//! - [`login`] runs one interactive handshake and stores the credentials
//! - [`status`] reports what the store holds
//! - [`verify`] checks tokens against the gateway, recovering or clearing them
//! - [`refresh`] and [`keepalive`] exchange refresh tokens for new access tokens
//! - [`logout`] forgets one provider or the whole session

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use slidebatch::handshake::BrowserWindowOpener;
use slidebatch::refresh::ProviderRefresh;
use slidebatch::{GuardOutcome, HandshakeBroker, MessageHub, RefreshReport, RefreshScheduler};
use slidebatch_protocol::Provider;
use slidebatch_runtime::pick_callback_port;
use tokio::sync::mpsc;
use tracing::info;

use super::CommandOutput;
use crate::callback_server::CallbackServer;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, print_line};

/// First port tried for the completion callback.
pub const DEFAULT_CALLBACK_PORT: u16 = 8765;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
	provider: Provider,
	#[serde(skip_serializing_if = "Option::is_none")]
	identity: Option<String>,
	authenticated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderStatus {
	provider: Provider,
	authenticated: bool,
	can_refresh: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	identity: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusData {
	store: PathBuf,
	providers: Vec<ProviderStatus>,
	gemini_key: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyEntry {
	provider: Provider,
	outcome: GuardOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeepaliveData {
	ticks: u32,
	interval_secs: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	last: Option<RefreshReport>,
}

pub async fn login(ctx: &CommandContext, provider: Provider, timeout_secs: u64, port: Option<u16>) -> Result<CommandOutput> {
	let store = ctx.open_store()?;
	let hub = MessageHub::new();
	let opener = BrowserWindowOpener::new(ctx.state_dir().join("auth-profiles"));
	let broker = HandshakeBroker::new(&ctx.config, hub.clone(), Arc::new(opener)).with_timeout(Duration::from_secs(timeout_secs));

	let port = pick_callback_port(Some(port.unwrap_or(DEFAULT_CALLBACK_PORT)))
		.ok_or_else(|| CliError::InvalidInput("no free local port for the login callback".into()))?;
	let server = CallbackServer::start(hub, broker.allow_list().clone(), port).await?;
	let broker = broker.with_callback_url(server.message_url());

	info!(target = "slidebatch.cli", %provider, callback = %server.message_url(), "starting login");
	eprintln!("Complete the {provider} sign-in in the window that just opened.");
	eprintln!("(Waiting up to {timeout_secs} seconds)");

	let outcome = broker.login(provider, &store).await;
	server.shutdown().await;
	let session = outcome?;

	CommandOutput::new(LoginData {
		provider,
		identity: session.identity(provider).map(str::to_string),
		authenticated: session.is_authenticated(provider),
	})
}

pub async fn status(ctx: &CommandContext) -> Result<CommandOutput> {
	let store = ctx.open_store()?;
	let session = store.get();

	let providers = Provider::ALL
		.into_iter()
		.map(|provider| ProviderStatus {
			provider,
			authenticated: session.as_ref().is_some_and(|s| s.is_authenticated(provider)),
			can_refresh: session.as_ref().is_some_and(|s| s.refresh_token(provider).is_some()),
			identity: session.as_ref().and_then(|s| s.identity(provider)).map(str::to_string),
		})
		.collect();

	CommandOutput::new(StatusData {
		store: ctx.store_path().to_path_buf(),
		providers,
		gemini_key: session.as_ref().is_some_and(|s| s.gemini_api_key().is_some()),
	})
}

pub async fn verify(ctx: &CommandContext, provider: Option<Provider>) -> Result<CommandOutput> {
	let store = ctx.open_store()?;
	let guard = ctx.guard(store)?;
	let providers = provider.map_or_else(|| Provider::ALL.to_vec(), |provider| vec![provider]);

	let mut entries = Vec::with_capacity(providers.len());
	for provider in providers {
		let outcome = guard.check(provider).await?;
		entries.push(VerifyEntry { provider, outcome });
	}

	let cleared = entries.iter().any(|entry| entry.outcome == GuardOutcome::Cleared);
	let output = CommandOutput::new(&entries)?;
	Ok(if cleared { output.warn("stored credentials were rejected and the session was cleared; log in again") } else { output })
}

pub async fn refresh(ctx: &CommandContext) -> Result<CommandOutput> {
	let scheduler = RefreshScheduler::new(ctx.open_store()?, ctx.gateway()?, ctx.config.refresh_interval);
	let report = scheduler.tick().await;
	let failed = failed_providers(&report);

	let output = CommandOutput::new(&report)?;
	Ok(if failed.is_empty() { output } else { output.warn(format!("refresh failed for {}", failed.join(", "))) })
}

pub async fn keepalive(ctx: &CommandContext, interval_secs: u64, ticks: Option<u32>) -> Result<CommandOutput> {
	let config = ctx.config.clone().with_refresh_interval(Duration::from_secs(interval_secs.max(1)));
	let scheduler = RefreshScheduler::new(ctx.open_store()?, ctx.gateway()?, config.refresh_interval);
	let interval_secs = scheduler.interval().as_secs();

	let (tx, mut rx) = mpsc::unbounded_channel::<RefreshReport>();
	let handle = scheduler.spawn_with(move |report| {
		let _ = tx.send(report.clone());
	});
	info!(target = "slidebatch.cli", interval_secs, "keeping tokens fresh");

	let mut completed = 0u32;
	let mut last = None;
	loop {
		tokio::select! {
			report = rx.recv() => {
				let Some(report) = report else { break };
				completed += 1;
				announce_tick(ctx.format, completed, &report);
				last = Some(report);
				if ticks.is_some_and(|limit| completed >= limit) {
					break;
				}
			}
			_ = tokio::signal::ctrl_c() => {
				info!(target = "slidebatch.cli", "interrupted, stopping refresh");
				break;
			}
		}
	}
	handle.stop().await;

	CommandOutput::new(KeepaliveData {
		ticks: completed,
		interval_secs,
		last,
	})
}

pub async fn logout(ctx: &CommandContext, provider: Option<Provider>) -> Result<CommandOutput> {
	let store = ctx.open_store()?;
	match provider {
		Some(provider) => {
			let remaining = store.forget(provider).await?;
			CommandOutput::new(json!({
				"forgot": provider,
				"sessionRemains": remaining.is_some(),
			}))
		}
		None => {
			store.clear().await?;
			CommandOutput::new(json!({ "cleared": true }))
		}
	}
}

fn failed_providers(report: &RefreshReport) -> Vec<&'static str> {
	Provider::ALL
		.into_iter()
		.filter(|provider| matches!(report.get(*provider), ProviderRefresh::Failed(_)))
		.map(Provider::as_str)
		.collect()
}

fn announce_tick(format: OutputFormat, tick: u32, report: &RefreshReport) {
	match format {
		OutputFormat::Ndjson => print_line(&json!({ "event": "refresh", "tick": tick, "report": report })),
		OutputFormat::Text => {
			let describe = |state: &ProviderRefresh| match state {
				ProviderRefresh::Skipped => "skipped".dimmed(),
				ProviderRefresh::Refreshed => "refreshed".green(),
				ProviderRefresh::Failed(_) => "failed".red(),
			};
			eprintln!("#{tick} google: {} canva: {}", describe(&report.google), describe(&report.canva));
		}
		OutputFormat::Json => {}
	}
}
