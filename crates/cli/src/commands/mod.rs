mod auth;
mod batch;
mod drive;
mod key;
mod pattern;

use serde::Serialize;
use slidebatch::gateway::GatewayError;
use slidebatch::{CredentialGuard, SessionStore, ValidationError};
use slidebatch_protocol::Provider;
use tracing::{error, warn};

use crate::cli::{AuthAction, BatchAction, Cli, Commands, DriveAction, KeyAction, PatternAction};
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{Diagnostic, DiagnosticLevel, OutputFormat, ResultBuilder, print_error_stderr, print_result};

/// Payload and diagnostics a command hands back for the envelope.
#[derive(Debug)]
pub struct CommandOutput {
	pub data: serde_json::Value,
	pub diagnostics: Vec<Diagnostic>,
}

impl CommandOutput {
	pub fn new(data: impl Serialize) -> Result<Self> {
		let data = serde_json::to_value(data).map_err(|err| CliError::Other(err.into()))?;
		Ok(Self {
			data,
			diagnostics: Vec::new(),
		})
	}

	pub fn warn(mut self, message: impl Into<String>) -> Self {
		self.diagnostics.push(Diagnostic {
			level: DiagnosticLevel::Warning,
			message: message.into(),
			source: None,
		});
		self
	}

	/// Warning attributed to one step of the command, e.g. `export`.
	pub fn warn_from(mut self, source: impl Into<String>, message: impl Into<String>) -> Self {
		self.diagnostics.push(Diagnostic {
			level: DiagnosticLevel::Warning,
			message: message.into(),
			source: Some(source.into()),
		});
		self
	}
}

/// Runs the selected command and prints its envelope. The error is returned
/// after it has been reported so the caller can set the exit status.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let name = cli.command.name();
	let format = cli.format;
	let builder = ResultBuilder::<serde_json::Value>::new(name);

	let outcome = match CommandContext::from_cli(&cli) {
		Ok(ctx) => run(cli.command, &ctx).await,
		Err(err) => Err(err),
	};

	match outcome {
		Ok(output) => {
			print_result(&builder.data(output.data).diagnostics(output.diagnostics).build(), format);
			Ok(())
		}
		Err(err) => {
			error!(target = "slidebatch.cli", command = name, error = %err, "command failed");
			let builder = match err.details() {
				Some(details) => builder.error_with_details(err.code(), err.to_string(), details),
				None => builder.error(err.code(), err.to_string()),
			};
			let result = builder.build();
			match (format, result.error.as_ref()) {
				(OutputFormat::Text, Some(error)) => print_error_stderr(error),
				_ => print_result(&result, format),
			}
			Err(err)
		}
	}
}

async fn run(command: Commands, ctx: &CommandContext) -> Result<CommandOutput> {
	match command {
		Commands::Auth { action } => match action {
			AuthAction::Login { provider, timeout_secs, port } => auth::login(ctx, provider, timeout_secs, port).await,
			AuthAction::Status => auth::status(ctx).await,
			AuthAction::Verify { provider } => auth::verify(ctx, provider).await,
			AuthAction::Refresh => auth::refresh(ctx).await,
			AuthAction::Keepalive { interval_secs, ticks } => auth::keepalive(ctx, interval_secs, ticks).await,
			AuthAction::Logout { provider } => auth::logout(ctx, provider).await,
		},
		Commands::Key { action } => match action {
			KeyAction::Set { key } => key::set(ctx, &key).await,
			KeyAction::Show => key::show(ctx).await,
		},
		Commands::Drive { action } => match action {
			DriveAction::Folders { page } => drive::folders(ctx, &page).await,
			DriveAction::Images { page } => drive::images(ctx, &page).await,
			DriveAction::Docs { page } => drive::docs(ctx, &page).await,
			DriveAction::Doc { id } => drive::doc(ctx, &id).await,
		},
		Commands::Pattern { action } => match action {
			PatternAction::Infer {
				doc,
				file,
				text,
				template,
				gemini_url,
			} => pattern::infer(ctx, pattern::InferSource::from_args(doc, file, text)?, template, gemini_url).await,
			PatternAction::Encode { template, pattern, set } => pattern::encode(template, &pattern, &set),
		},
		Commands::Batch { action } => match action {
			BatchAction::Run(args) => batch::run(ctx, args).await,
		},
	}
}

/// Latest stored access token for `provider`, re-read from disk.
async fn stored_token(store: &SessionStore, provider: Provider) -> Result<String> {
	let session = store.reload().await?;
	session
		.as_ref()
		.and_then(|session| session.token(provider))
		.map(str::to_string)
		.ok_or_else(|| ValidationError::MissingCredential(provider).into())
}

/// Converts a gateway failure, clearing the session first when the gateway
/// rejected the credential itself.
async fn gateway_failure(guard: &CredentialGuard, err: GatewayError) -> CliError {
	if let Err(clear_err) = guard.invalidate_on_auth_failure(&err).await {
		warn!(target = "slidebatch.cli", error = %clear_err, "failed to clear rejected session");
	}
	err.into()
}
