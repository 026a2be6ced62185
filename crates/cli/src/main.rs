use adverify_cli::cli::Cli;
use adverify_cli::{commands, logging};
use clap::Parser;
use tracing::error;

fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(&cli) {
		error!(target: "adverify", error = %err, "command failed");
		std::process::exit(1);
	}
}
