//! Replay script format.
//!
//! ```json
//! {
//!   "surfaces": [{ "id": 1, "location": "https://ads.example/a" }, { "id": 2, "blank": true }],
//!   "events": [
//!     { "surface": 1, "event": "loaded" },
//!     { "surface": 1, "event": "displayed" },
//!     { "surface": 1, "event": "destroyed" }
//!   ]
//! }
//! ```
//!
//! `event` is an ad phase name or `destroyed`.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use adverify::AdPhase;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
	pub surfaces: Vec<SurfaceSpec>,
	#[serde(default)]
	pub events: Vec<ScriptEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceSpec {
	pub id: u64,
	/// Surface never supplies a content stream.
	#[serde(default)]
	pub blank: bool,
	#[serde(default)]
	pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptEvent {
	pub surface: u64,
	pub event: EventKind,
}

/// Host event named by a script step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventKind {
	Phase(AdPhase),
	/// The host released the surface.
	Destroyed,
}

impl TryFrom<String> for EventKind {
	type Error = String;

	fn try_from(name: String) -> std::result::Result<Self, Self::Error> {
		if name == "destroyed" {
			return Ok(Self::Destroyed);
		}
		serde_json::from_value(serde_json::Value::String(name.clone()))
			.map(Self::Phase)
			.map_err(|_| format!("unknown event `{name}`"))
	}
}

impl From<EventKind> for String {
	fn from(kind: EventKind) -> Self {
		kind.to_string()
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Phase(phase) => write!(f, "{phase}"),
			Self::Destroyed => f.write_str("destroyed"),
		}
	}
}

impl ReplayScript {
	pub fn from_file(path: &Path) -> Result<Self> {
		let json = std::fs::read_to_string(path).map_err(|source| CliError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::parse(&json).map_err(|message| CliError::Script {
			path: path.to_path_buf(),
			message,
		})
	}

	/// Parses and validates a script. Errors are human-readable.
	pub fn parse(json: &str) -> std::result::Result<Self, String> {
		let script: Self = serde_json::from_str(json).map_err(|err| err.to_string())?;
		script.validate()?;
		Ok(script)
	}

	fn validate(&self) -> std::result::Result<(), String> {
		let mut ids = HashSet::new();
		for surface in &self.surfaces {
			if !ids.insert(surface.id) {
				return Err(format!("surface {} declared twice", surface.id));
			}
		}
		for (index, event) in self.events.iter().enumerate() {
			if !ids.contains(&event.surface) {
				return Err(format!("event {index} names unknown surface {}", event.surface));
			}
		}
		Ok(())
	}
}
