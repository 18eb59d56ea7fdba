use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use slidebatch::Template;
use slidebatch_protocol::Provider;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "slidebatch")]
#[command(about = "Batch-generate Canva designs from Google Drive images")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
	pub format: OutputFormat,

	/// Gateway base URL (defaults to $SLIDEBATCH_API_URL, then http://localhost:3000/api)
	#[arg(long, global = true, value_name = "URL")]
	pub api_url: Option<String>,

	/// Web application origin that hosts the auth pages
	#[arg(long, global = true, value_name = "URL")]
	pub app_url: Option<String>,

	/// Session store file (defaults to <config dir>/slidebatch/store.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub store: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Log in, inspect and maintain provider sessions
	Auth {
		#[command(subcommand)]
		action: AuthAction,
	},

	/// Manage the Gemini API key used for pattern inference
	Key {
		#[command(subcommand)]
		action: KeyAction,
	},

	/// Browse Google Drive through the gateway
	Drive {
		#[command(subcommand)]
		action: DriveAction,
	},

	/// Work with abstract slide patterns
	Pattern {
		#[command(subcommand)]
		action: PatternAction,
	},

	/// Generate designs in bulk
	Batch {
		#[command(subcommand)]
		action: BatchAction,
	},
}

impl Commands {
	/// Dotted name used in the output envelope.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Auth { action } => match action {
				AuthAction::Login { .. } => "auth.login",
				AuthAction::Status => "auth.status",
				AuthAction::Verify { .. } => "auth.verify",
				AuthAction::Refresh => "auth.refresh",
				AuthAction::Keepalive { .. } => "auth.keepalive",
				AuthAction::Logout { .. } => "auth.logout",
			},
			Commands::Key { action } => match action {
				KeyAction::Set { .. } => "key.set",
				KeyAction::Show => "key.show",
			},
			Commands::Drive { action } => match action {
				DriveAction::Folders { .. } => "drive.folders",
				DriveAction::Images { .. } => "drive.images",
				DriveAction::Docs { .. } => "drive.docs",
				DriveAction::Doc { .. } => "drive.doc",
			},
			Commands::Pattern { action } => match action {
				PatternAction::Infer { .. } => "pattern.infer",
				PatternAction::Encode { .. } => "pattern.encode",
			},
			Commands::Batch { action } => match action {
				BatchAction::Run(_) => "batch.run",
			},
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
	/// Open the provider's sign-in page and store the resulting credentials
	Login {
		/// Provider to authenticate with (google or canva)
		provider: Provider,
		/// Give up after this many seconds
		#[arg(long, default_value_t = 300)]
		timeout_secs: u64,
		/// Local port for the completion callback (first free port from 8765 when omitted)
		#[arg(long)]
		port: Option<u16>,
	},

	/// Show which providers hold a credential
	Status,

	/// Check stored tokens against the gateway, refreshing or clearing them
	Verify {
		/// Only check this provider
		provider: Option<Provider>,
	},

	/// Run one token refresh pass
	Refresh,

	/// Keep tokens fresh until interrupted
	Keepalive {
		/// Seconds between refresh passes
		#[arg(long, default_value_t = 180)]
		interval_secs: u64,
		/// Stop after this many passes
		#[arg(long)]
		ticks: Option<u32>,
	},

	/// Remove stored credentials
	Logout {
		/// Forget only this provider instead of the whole session
		#[arg(long)]
		provider: Option<Provider>,
	},
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
	/// Store the Gemini API key in the current session
	Set { key: String },
	/// Show whether a key is stored (masked)
	Show,
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
	/// Folder to list
	#[arg(long, default_value = "root")]
	pub folder: String,
	/// Continuation token from a previous listing
	#[arg(long)]
	pub page_token: Option<String>,
	/// Maximum entries to return
	#[arg(long)]
	pub page_size: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum DriveAction {
	/// List sub-folders
	Folders {
		#[command(flatten)]
		page: PageArgs,
	},
	/// List images
	Images {
		#[command(flatten)]
		page: PageArgs,
	},
	/// List Google Docs
	Docs {
		#[command(flatten)]
		page: PageArgs,
	},
	/// Print the text of a Google Doc
	Doc { id: String },
}

#[derive(Subcommand, Debug)]
pub enum PatternAction {
	/// Infer an abstract pattern from a description
	#[command(group(clap::ArgGroup::new("source").required(true).args(["doc", "file", "text"])))]
	Infer {
		/// Google Doc id to read the description from
		#[arg(long)]
		doc: Option<String>,
		/// Local file holding the description
		#[arg(long)]
		file: Option<PathBuf>,
		/// Description given inline
		#[arg(long)]
		text: Option<String>,
		/// Template the pattern is for (single, double, triple)
		#[arg(short, long, default_value_t = Template::Double)]
		template: Template,
		/// Inference endpoint base URL
		#[arg(long, hide = true, env = "SLIDEBATCH_GEMINI_URL")]
		gemini_url: Option<String>,
	},

	/// Show the slides one design set would produce
	Encode {
		#[arg(short, long, default_value_t = Template::Double)]
		template: Template,
		/// Comma-separated pattern values, padded to full length
		#[arg(short, long)]
		pattern: String,
		/// Design set as image indices, `-` for an empty slot (e.g. 0,2,-)
		#[arg(short, long)]
		set: String,
	},
}

#[derive(Subcommand, Debug)]
pub enum BatchAction {
	/// Validate, submit and track one batch
	Run(BatchRunArgs),
}

#[derive(Args, Debug)]
pub struct BatchRunArgs {
	#[arg(short, long, default_value_t = Template::Double)]
	pub template: Template,

	/// Comma-separated pattern values, padded to full length
	#[arg(short, long)]
	pub pattern: String,

	/// One design set per occurrence (image indices, `-` for an empty slot)
	#[arg(short = 's', long = "set", required = true)]
	pub sets: Vec<String>,

	/// Image URL; repeat in selection order
	#[arg(short = 'i', long = "image")]
	pub images: Vec<String>,

	/// Drive folder whose images are appended to the selection
	#[arg(long)]
	pub folder: Option<String>,

	/// Export the results to a spreadsheet when the batch finishes
	#[arg(long)]
	pub export: bool,

	/// Validate and print the jobs without submitting anything
	#[arg(long)]
	pub dry_run: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_login_with_provider_and_port() {
		let cli = Cli::try_parse_from(["slidebatch", "auth", "login", "canva", "--port", "9000"]).unwrap();
		match cli.command {
			Commands::Auth {
				action: AuthAction::Login { provider, port, timeout_secs },
			} => {
				assert_eq!(provider, Provider::Canva);
				assert_eq!(port, Some(9000));
				assert_eq!(timeout_secs, 300);
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn global_flags_work_after_the_subcommand() {
		let cli = Cli::try_parse_from(["slidebatch", "auth", "status", "-f", "text", "-vv", "--store", "/tmp/s.json"]).unwrap();
		assert_eq!(cli.format, OutputFormat::Text);
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.store, Some(PathBuf::from("/tmp/s.json")));
		assert_eq!(cli.command.name(), "auth.status");
	}

	#[test]
	fn batch_run_collects_repeated_sets_and_images() {
		let cli = Cli::try_parse_from([
			"slidebatch", "batch", "run", "-t", "triple", "-p", "0,1,2", "-s", "0,1,2", "-s", "2,1,0", "-i", "a", "-i", "b", "-i", "c",
		])
		.unwrap();
		let Commands::Batch { action: BatchAction::Run(args) } = cli.command else {
			panic!("expected batch run");
		};
		assert_eq!(args.template, Template::Triple);
		assert_eq!(args.sets, vec!["0,1,2", "2,1,0"]);
		assert_eq!(args.images.len(), 3);
		assert!(!args.export);
	}

	#[test]
	fn batch_run_requires_a_design_set() {
		assert!(Cli::try_parse_from(["slidebatch", "batch", "run", "-p", "0"]).is_err());
	}

	#[test]
	fn infer_requires_exactly_one_source() {
		assert!(Cli::try_parse_from(["slidebatch", "pattern", "infer"]).is_err());
		assert!(Cli::try_parse_from(["slidebatch", "pattern", "infer", "--text", "a", "--doc", "b"]).is_err());
		assert!(Cli::try_parse_from(["slidebatch", "pattern", "infer", "--text", "alternate"]).is_ok());
	}

	#[test]
	fn unknown_provider_is_rejected() {
		assert!(Cli::try_parse_from(["slidebatch", "auth", "login", "dropbox"]).is_err());
	}
}
