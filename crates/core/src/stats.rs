//! Bridge counters.

use std::sync::atomic::{AtomicU64, Ordering};

use adverify_protocol::{LifecycleOp, SessionState, StatsSnapshot, Transition};
use adverify_runtime::MeasurementActivation;

/// Lock-free counters shared by the factory, manager and facade.
#[derive(Debug, Default)]
pub struct BridgeStats {
	sessions_created: AtomicU64,
	sessions_detached: AtomicU64,
	sessions_started: AtomicU64,
	sessions_finished: AtomicU64,
	sessions_superseded: AtomicU64,
	implicit_finishes: AtomicU64,
	redundant_transitions: AtomicU64,
	invalid_surfaces: AtomicU64,
	rejected_busy: AtomicU64,
}

fn bump(counter: &AtomicU64) {
	counter.fetch_add(1, Ordering::Relaxed);
}

impl BridgeStats {
	pub(crate) fn session_created(&self, detached: bool) {
		bump(&self.sessions_created);
		if detached {
			bump(&self.sessions_detached);
		}
	}

	pub(crate) fn invalid_surface(&self) {
		bump(&self.invalid_surfaces);
	}

	pub(crate) fn rejected_busy(&self) {
		bump(&self.rejected_busy);
	}

	pub(crate) fn superseded(&self) {
		bump(&self.sessions_superseded);
	}

	pub(crate) fn implicit_finish(&self) {
		bump(&self.implicit_finishes);
	}

	/// Counts one transition. A `start` that ended in `finished` (dead
	/// surface) also counts as an implicit finish.
	pub(crate) fn record(&self, op: LifecycleOp, transition: &Transition) {
		match transition {
			Transition::Redundant(_) => bump(&self.redundant_transitions),
			Transition::Applied { to: SessionState::Started, .. } => bump(&self.sessions_started),
			Transition::Applied { to: SessionState::Finished, .. } => {
				bump(&self.sessions_finished);
				if op == LifecycleOp::Start {
					bump(&self.implicit_finishes);
				}
			}
			Transition::Applied { .. } => {}
		}
	}

	pub fn snapshot(&self, activation: &MeasurementActivation, live: usize) -> StatsSnapshot {
		let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
		StatsSnapshot {
			activated: activation.is_active(),
			activation_healthy: activation.is_healthy(),
			sessions_created: load(&self.sessions_created),
			sessions_detached: load(&self.sessions_detached),
			sessions_started: load(&self.sessions_started),
			sessions_finished: load(&self.sessions_finished),
			sessions_superseded: load(&self.sessions_superseded),
			implicit_finishes: load(&self.implicit_finishes),
			redundant_transitions: load(&self.redundant_transitions),
			invalid_surfaces: load(&self.invalid_surfaces),
			rejected_busy: load(&self.rejected_busy),
			live: live as u64,
		}
	}
}
