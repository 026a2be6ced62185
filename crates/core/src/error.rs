//! Error types for the session bridge.

use std::path::PathBuf;

use adverify_protocol::{SessionId, SurfaceId};
use thiserror::Error;

/// Errors surfaced to callers of the bridge.
///
/// Lifecycle ordering problems are not errors; they come back as
/// [`Transition::Redundant`](adverify_protocol::Transition::Redundant).
/// Measurement subsystem failures never reach this type.
#[derive(Debug, Error)]
pub enum BridgeError {
	#[error("{surface} cannot supply a content stream")]
	InvalidSurface { surface: SurfaceId },

	#[error("{surface} already has live {session}")]
	SurfaceBusy { surface: SurfaceId, session: SessionId },

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse configuration: {0}")]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
