//! Session lifecycle states, transitions and host ad phases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a measurement session.
///
/// States only move forward: `Created -> Started -> Finished`, with
/// `Created -> Finished` allowed for sessions that never began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
	Created,
	Started,
	Finished,
}

impl SessionState {
	/// Returns `true` while the session still occupies its surface.
	pub fn is_live(self) -> bool {
		!matches!(self, Self::Finished)
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Created => "created",
			Self::Started => "started",
			Self::Finished => "finished",
		})
	}
}

/// Lifecycle operation requested on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleOp {
	Start,
	Finish,
}

impl fmt::Display for LifecycleOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Start => "start",
			Self::Finish => "finish",
		})
	}
}

/// A lifecycle call that arrived duplicated or out of order.
///
/// Recovered locally: the session is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedundantTransition {
	pub op: LifecycleOp,
	pub state: SessionState,
}

impl fmt::Display for RedundantTransition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "redundant {} on {} session", self.op, self.state)
	}
}

/// Result of a `start`/`finish` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Transition {
	/// The session moved between states.
	///
	/// `reported` is `false` when the measurement subsystem was not told
	/// (finish before start, detached sessions, dead surfaces).
	Applied {
		from: SessionState,
		to: SessionState,
		reported: bool,
	},
	Redundant(RedundantTransition),
}

impl Transition {
	pub fn is_applied(&self) -> bool {
		matches!(self, Self::Applied { .. })
	}

	pub fn is_redundant(&self) -> bool {
		matches!(self, Self::Redundant(_))
	}

	/// State the session is in after the request.
	pub fn resulting_state(&self) -> SessionState {
		match self {
			Self::Applied { to, .. } => *to,
			Self::Redundant(r) => r.state,
		}
	}
}

/// Ad event phase reported by the host plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdPhase {
	Init,
	Loaded,
	Failed,
	Displayed,
	Closed,
	Reward,
	PlaybackBegan,
	PlaybackEnded,
}

impl fmt::Display for AdPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Init => "init",
			Self::Loaded => "loaded",
			Self::Failed => "failed",
			Self::Displayed => "displayed",
			Self::Closed => "closed",
			Self::Reward => "reward",
			Self::PlaybackBegan => "playbackBegan",
			Self::PlaybackEnded => "playbackEnded",
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_finished_is_not_live() {
		assert!(SessionState::Created.is_live());
		assert!(SessionState::Started.is_live());
		assert!(!SessionState::Finished.is_live());
	}

	#[test]
	fn states_order_along_the_lifecycle() {
		assert!(SessionState::Created < SessionState::Started);
		assert!(SessionState::Started < SessionState::Finished);
	}

	#[test]
	fn ad_phases_use_host_event_names() {
		assert_eq!(serde_json::to_string(&AdPhase::PlaybackBegan).unwrap(), "\"playbackBegan\"");
		assert_eq!(serde_json::from_str::<AdPhase>("\"displayed\"").unwrap(), AdPhase::Displayed);
		assert_eq!(AdPhase::PlaybackEnded.to_string(), "playbackEnded");
	}

	#[test]
	fn transition_reports_resulting_state() {
		let applied = Transition::Applied {
			from: SessionState::Created,
			to: SessionState::Started,
			reported: true,
		};
		assert_eq!(applied.resulting_state(), SessionState::Started);

		let redundant = Transition::Redundant(RedundantTransition {
			op: LifecycleOp::Start,
			state: SessionState::Finished,
		});
		assert!(redundant.is_redundant());
		assert_eq!(redundant.resulting_state(), SessionState::Finished);
		if let Transition::Redundant(r) = redundant {
			assert_eq!(r.to_string(), "redundant start on finished session");
		}
	}

	#[test]
	fn transition_json_is_tagged() {
		let value = serde_json::to_value(Transition::Applied {
			from: SessionState::Started,
			to: SessionState::Finished,
			reported: true,
		})
		.unwrap();
		assert_eq!(value["kind"], "applied");
		assert_eq!(value["from"], "started");
		assert_eq!(value["to"], "finished");
	}
}
