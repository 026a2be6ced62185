//! Command dispatch.

mod partner;
mod replay;

use adverify::BridgeConfig;
use tracing::debug;

pub use partner::PartnerReport;
pub use replay::{ReplayReport, ReplayStep};

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::{ResultBuilder, print_result};

/// Runs the selected command and prints its envelope.
///
/// Failures are printed as an `ok: false` envelope and then returned.
pub fn dispatch(cli: &Cli) -> Result<()> {
	match &cli.command {
		Commands::Partner => run(cli, "partner", partner::run),
		Commands::Replay(args) => run(cli, "replay", |config| replay::run(config, args)),
	}
}

fn run<T, F>(cli: &Cli, command: &'static str, body: F) -> Result<()>
where
	T: serde::Serialize,
	F: FnOnce(&BridgeConfig) -> Result<T>,
{
	let builder = ResultBuilder::new(command);
	let outcome = load_config(cli).and_then(|config| body(&config));
	debug!(target: "adverify.cli", command, ok = outcome.is_ok(), "command finished");
	match outcome {
		Ok(data) => print_result(&builder.success(data)),
		Err(err) => {
			print_result(&builder.failure(&err))?;
			Err(err)
		}
	}
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
	match &cli.config {
		Some(path) => {
			debug!(target: "adverify.cli", path = %path.display(), "loading bridge config");
			Ok(BridgeConfig::from_file(path)?)
		}
		None => Ok(BridgeConfig::default()),
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;
	use crate::error::CliError;

	#[test]
	fn missing_config_file_is_io_error() {
		let cli = Cli {
			verbose: 0,
			config: Some("/nonexistent/adverify.json".into()),
			command: Commands::Partner,
		};
		let err = load_config(&cli).unwrap_err();
		assert_eq!(err.code(), crate::output::ErrorCode::IoError);
	}

	#[test]
	fn config_file_overrides_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{ "partnerName": "Acme" }}"#).unwrap();
		let cli = Cli {
			verbose: 0,
			config: Some(file.path().to_path_buf()),
			command: Commands::Partner,
		};
		let config = load_config(&cli).unwrap();
		assert_eq!(config.partner_name, "Acme");
		assert_eq!(config.partner_version, "2.1");
	}

	#[test]
	fn unknown_config_key_is_invalid_input() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{ "partner": "Acme" }}"#).unwrap();
		let cli = Cli {
			verbose: 0,
			config: Some(file.path().to_path_buf()),
			command: Commands::Partner,
		};
		assert!(matches!(load_config(&cli), Err(CliError::Bridge(_))));
	}
}
