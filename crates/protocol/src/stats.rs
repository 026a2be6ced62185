//! Counter snapshot reported by the bridge.

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the bridge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
	/// `true` once process-wide activation ran.
	pub activated: bool,
	/// `false` when the vendor activation call failed.
	pub activation_healthy: bool,
	pub sessions_created: u64,
	/// Sessions built without a vendor counterpart.
	pub sessions_detached: u64,
	pub sessions_started: u64,
	pub sessions_finished: u64,
	/// Sessions finished because a new one replaced them on the same surface.
	pub sessions_superseded: u64,
	/// Sessions finished by surface teardown or a dead surface reference.
	pub implicit_finishes: u64,
	pub redundant_transitions: u64,
	pub invalid_surfaces: u64,
	/// `create_session` calls refused because the surface was busy.
	pub rejected_busy: u64,
	/// Registry entries currently holding a live session.
	pub live: u64,
}
