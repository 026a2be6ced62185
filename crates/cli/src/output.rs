//! JSON result envelope printed by every command.

use std::io::Write;
use std::time::Instant;

use serde::Serialize;

use crate::error::{CliError, Result};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	IoError,
	InvalidInput,
	InternalError,
}

/// Builds envelopes for one command invocation.
pub struct ResultBuilder {
	command: &'static str,
	started: Instant,
}

impl ResultBuilder {
	pub fn new(command: &'static str) -> Self {
		Self {
			command,
			started: Instant::now(),
		}
	}

	pub fn success<T: Serialize>(&self, data: T) -> CommandResult<T> {
		CommandResult {
			schema_version: SCHEMA_VERSION,
			ok: true,
			command: self.command.to_string(),
			data: Some(data),
			error: None,
			duration_ms: self.elapsed_ms(),
		}
	}

	pub fn failure(&self, err: &CliError) -> CommandResult<()> {
		CommandResult {
			schema_version: SCHEMA_VERSION,
			ok: false,
			command: self.command.to_string(),
			data: None,
			error: Some(CommandError {
				code: err.code(),
				message: err.to_string(),
			}),
			duration_ms: self.elapsed_ms(),
		}
	}

	fn elapsed_ms(&self) -> u64 {
		u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
	}
}

/// Writes `result` as pretty JSON followed by a newline.
pub fn print_result<T: Serialize>(result: &CommandResult<T>) -> Result<()> {
	let json = serde_json::to_string_pretty(result)?;
	let mut stdout = std::io::stdout().lock();
	writeln!(stdout, "{json}").map_err(|source| CliError::Io {
		path: "<stdout>".into(),
		source,
	})
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use serde_json::json;

	use super::*;

	#[test]
	fn success_omits_error() {
		let result = ResultBuilder::new("partner").success(json!({ "name": "Kidoznet" }));
		let value = serde_json::to_value(&result).unwrap();
		assert_eq!(value["ok"], true);
		assert_eq!(value["command"], "partner");
		assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
		assert!(value.get("error").is_none());
	}

	#[test]
	fn failure_carries_code_and_message() {
		let err = CliError::Script {
			path: PathBuf::from("run.json"),
			message: "event 0 names unknown surface 9".to_string(),
		};
		let value = serde_json::to_value(ResultBuilder::new("replay").failure(&err)).unwrap();
		assert_eq!(value["ok"], false);
		assert_eq!(value["error"]["code"], "INVALID_INPUT");
		assert!(value["error"]["message"].as_str().unwrap().contains("unknown surface 9"));
		assert!(value.get("data").is_none());
	}
}
