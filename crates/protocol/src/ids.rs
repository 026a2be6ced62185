//! Stable identities for surfaces and sessions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned identity of a rendering surface.
///
/// The bridge never owns a surface; everything it keeps about one is keyed by
/// this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "surface#{}", self.0)
	}
}

impl From<u64> for SurfaceId {
	fn from(value: u64) -> Self {
		Self(value)
	}
}

/// Bridge-assigned identity of a measurement session, unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "session#{}", self.0)
	}
}

/// Partner identity reported to the measurement subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerInfo {
	pub name: String,
	pub version: String,
}

impl fmt::Display for PartnerInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.name, self.version)
	}
}
