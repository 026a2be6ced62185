use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "adverify")]
#[command(about = "Ad-verification session bridge diagnostics", version)]
pub struct Cli {
	/// Increase log verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = ArgAction::Count, global = true)]
	pub verbose: u8,

	/// Bridge configuration file (JSON)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Print the partner identity reported to the measurement SDK
	Partner,

	/// Replay an ad lifecycle script against a recording measurement SDK
	Replay(ReplayArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReplayArgs {
	/// Script file (JSON)
	#[arg(value_name = "SCRIPT")]
	pub script: PathBuf,

	/// Make measurement activation fail; sessions run detached
	#[arg(long)]
	pub fail_activation: bool,

	/// Make the SDK refuse every session; sessions run detached
	#[arg(long)]
	pub refuse_sessions: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_replay_with_global_flags() {
		let cli = Cli::try_parse_from(["adverify", "replay", "run.json", "-vv", "--config", "bridge.json", "--fail-activation"]).unwrap();
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.config, Some(PathBuf::from("bridge.json")));
		match cli.command {
			Commands::Replay(args) => {
				assert_eq!(args.script, PathBuf::from("run.json"));
				assert!(args.fail_activation);
				assert!(!args.refuse_sessions);
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn replay_requires_script() {
		assert!(Cli::try_parse_from(["adverify", "replay"]).is_err());
	}
}
