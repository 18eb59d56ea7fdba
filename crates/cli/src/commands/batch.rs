//! `batch run`: validate, submit and track one batch.

use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use slidebatch::{AbstractPattern, BatchPlan, BatchProgress, BatchRun, BatchRunner, CredentialGuard, DesignSet, ImageRef, JobOutcome, Template};
use slidebatch_protocol::Provider;
use tracing::{info, warn};

use super::drive::Drive;
use super::{CommandOutput, stored_token};
use crate::cli::BatchRunArgs;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, print_line};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
	template: Template,
	#[serde(flatten)]
	run: BatchRun,
	percent: u8,
	#[serde(skip_serializing_if = "Option::is_none")]
	export_url: Option<String>,
}

pub async fn run(ctx: &CommandContext, args: BatchRunArgs) -> Result<CommandOutput> {
	let template = args.template;
	let pattern = AbstractPattern::parse(&args.pattern, template)?;
	let sets = args.sets.iter().map(|set| DesignSet::parse(set)).collect::<std::result::Result<Vec<_>, _>>()?;

	let mut images: Vec<ImageRef> = args.images.iter().map(ImageRef::from_url).collect();
	if let Some(folder) = args.folder.as_deref() {
		images.extend(Drive::connect(ctx).await?.folder_images(folder).await?);
	}

	let store = ctx.open_store()?;
	let session = store.reload().await?;
	let plan = BatchPlan::prepare(template, &pattern, &sets, &images, session.as_ref().and_then(|session| session.token(Provider::Canva)))?;

	if args.dry_run {
		return CommandOutput::new(json!({ "dryRun": true, "plan": plan }));
	}

	let gateway = ctx.gateway()?;
	let guard = CredentialGuard::new(store.clone(), gateway.clone());
	if !guard.check(Provider::Canva).await?.is_usable() {
		return Err(CliError::Auth("the canva credential was rejected and the session cleared; log in again".into()));
	}
	// The check may have refreshed the token.
	let canva_token = stored_token(&store, Provider::Canva).await?;

	info!(target = "slidebatch.cli", jobs = plan.len(), %template, "submitting batch");
	let runner = BatchRunner::new(gateway);
	let format = ctx.format;
	let run = runner.run(&plan, &canva_token, |progress| announce_progress(format, progress)).await;

	let mut warnings = Vec::new();
	if !run.failures.is_empty() {
		warnings.push(("batch", format!("{} of {} jobs failed", run.failures.len(), run.total)));
	}
	if run.failures.iter().any(|failure| failure.auth_failure) && !guard.check(Provider::Canva).await?.is_usable() {
		warnings.push(("canva", "canva rejected the credential during the batch; the session was cleared".to_string()));
	}

	let mut export_url = None;
	if args.export {
		let google_token = store.get().and_then(|session| session.token(Provider::Google).map(str::to_string));
		match runner.export(&run, google_token.as_deref()).await {
			Ok(url) => export_url = Some(url),
			Err(err) => {
				warn!(target = "slidebatch.cli", error = %err, "export failed");
				warnings.push(("export", format!("export failed: {err}")));
			}
		}
	}

	let percent = run.percent();
	let mut output = CommandOutput::new(RunData {
		template,
		run,
		percent,
		export_url,
	})?;
	for (source, warning) in warnings {
		output = output.warn_from(source, warning);
	}
	Ok(output)
}

fn announce_progress(format: OutputFormat, progress: &BatchProgress) {
	match format {
		OutputFormat::Ndjson => print_line(&json!({
			"event": "progress",
			"processed": progress.processed,
			"total": progress.total,
			"last": progress.last,
		})),
		OutputFormat::Text => {
			let status = match &progress.last {
				JobOutcome::Succeeded(result) => format!("{} {}", "ok".green(), result.url),
				JobOutcome::Failed(failure) => format!("{} {}", "failed".red(), failure.reason),
			};
			eprintln!("[{}/{}] {}: {status}", progress.processed, progress.total, progress.last.name());
		}
		OutputFormat::Json => {}
	}
}
