//! Errors reported by measurement subsystem adapters.

use thiserror::Error;

/// Failure reported by a [`MeasurementSdk`](crate::MeasurementSdk) adapter.
///
/// None of these reach the host: the bridge logs them and degrades to
/// bookkeeping-only sessions.
#[derive(Debug, Error)]
pub enum SdkError {
	#[error("measurement subsystem rejected activation: {0}")]
	Activation(String),

	#[error("measurement subsystem is not active")]
	NotActive,

	#[error("measurement subsystem could not build a session: {0}")]
	SessionConstruction(String),

	#[error("content stream type is not supported by this measurement subsystem")]
	UnsupportedStream,
}

pub type Result<T> = std::result::Result<T, SdkError>;
