use std::path::PathBuf;

use adverify::BridgeError;
use thiserror::Error;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Bridge(#[from] BridgeError),

	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid script {}: {message}", path.display())]
	Script { path: PathBuf, message: String },

	#[error("failed to encode output: {0}")]
	Output(#[from] serde_json::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Bridge(BridgeError::Io { .. }) | Self::Io { .. } => ErrorCode::IoError,
			Self::Bridge(_) | Self::Script { .. } => ErrorCode::InvalidInput,
			Self::Output(_) => ErrorCode::InternalError,
		}
	}
}

pub type Result<T> = std::result::Result<T, CliError>;
