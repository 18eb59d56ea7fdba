use clap::Parser;
use slidebatch_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	// The failure has already been reported in the output envelope.
	if commands::dispatch(cli).await.is_err() {
		std::process::exit(1);
	}
}
