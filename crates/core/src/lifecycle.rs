//! Maps host ad phases onto session operations.
//!
//! | phase                                       | effect                         |
//! |---------------------------------------------|--------------------------------|
//! | `loaded`                                    | create (replaces prior) session |
//! | `displayed`                                 | start                          |
//! | `closed`, `failed`                          | finish                         |
//! | `init`, `reward`, `playbackBegan/Ended`     | none                           |
//!
//! Surface destruction is reported separately through
//! [`LifecycleDriver::on_surface_destroyed`].

use std::collections::HashMap;
use std::sync::Arc;

use adverify_protocol::{AdPhase, SessionId, SurfaceId, Transition};
use adverify_runtime::RenderingSurface;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::manager::SessionHandle;
use crate::service::BridgeService;

/// What one host event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum PhaseOutcome {
	/// A new session was registered for the surface.
	Created { session: SessionId },
	/// An existing session was asked to change state.
	Transition { session: SessionId, transition: Transition },
	/// The phase has no measurement meaning.
	Ignored,
	/// The phase needs a session but the surface has none.
	NoSession,
}

/// Single-owner driver that keeps the current handle per surface.
pub struct LifecycleDriver {
	bridge: Arc<BridgeService>,
	handles: HashMap<SurfaceId, SessionHandle>,
}

impl LifecycleDriver {
	pub fn new(bridge: Arc<BridgeService>) -> Self {
		Self {
			bridge,
			handles: HashMap::new(),
		}
	}

	pub fn bridge(&self) -> &BridgeService {
		&self.bridge
	}

	/// Current handle for `surface`, if a session was created and not closed.
	pub fn handle(&self, surface: SurfaceId) -> Option<&SessionHandle> {
		self.handles.get(&surface)
	}

	/// Applies one ad phase for `surface`.
	///
	/// Only `loaded` can fail, with the errors of
	/// [`BridgeService::create_session`].
	pub fn on_phase(&mut self, surface: &Arc<dyn RenderingSurface>, phase: AdPhase) -> Result<PhaseOutcome> {
		let id = surface.surface_id();
		debug!(target: "adverify.lifecycle", surface = %id, %phase, "ad phase");

		let outcome = match phase {
			AdPhase::Loaded => {
				let handle = self.bridge.create_session(surface)?;
				let session = handle.id();
				self.handles.insert(id, handle);
				PhaseOutcome::Created { session }
			}
			AdPhase::Displayed => match self.handles.get(&id) {
				Some(handle) => PhaseOutcome::Transition {
					session: handle.id(),
					transition: handle.start(),
				},
				None => PhaseOutcome::NoSession,
			},
			AdPhase::Closed | AdPhase::Failed => match self.handles.remove(&id) {
				Some(handle) => PhaseOutcome::Transition {
					session: handle.id(),
					transition: handle.finish(),
				},
				None => PhaseOutcome::NoSession,
			},
			AdPhase::Init | AdPhase::Reward | AdPhase::PlaybackBegan | AdPhase::PlaybackEnded => PhaseOutcome::Ignored,
		};
		Ok(outcome)
	}

	/// Drops the surface's handle and finishes its session.
	pub fn on_surface_destroyed(&mut self, surface: SurfaceId) -> PhaseOutcome {
		self.handles.remove(&surface);
		match self.bridge.surface_destroyed(surface) {
			Some((session, transition)) => PhaseOutcome::Transition { session, transition },
			None => PhaseOutcome::NoSession,
		}
	}
}

#[cfg(test)]
mod tests {
	use adverify_protocol::SessionState;
	use adverify_runtime::MeasurementActivation;
	use adverify_runtime::fake::{FakeSurface, RecordingSdk, SdkCall};

	use super::*;
	use crate::config::BridgeConfig;

	fn driver(sdk: &RecordingSdk) -> LifecycleDriver {
		let activation = Box::leak(Box::new(MeasurementActivation::new()));
		let bridge = BridgeService::with_activation(&BridgeConfig::default(), Arc::new(sdk.clone()), activation).unwrap();
		LifecycleDriver::new(Arc::new(bridge))
	}

	#[test]
	fn impression_flow_starts_then_finishes() {
		let sdk = RecordingSdk::new();
		let mut driver = driver(&sdk);
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(1, None);

		assert_eq!(driver.on_phase(&surface, AdPhase::Init).unwrap(), PhaseOutcome::Ignored);
		assert!(matches!(driver.on_phase(&surface, AdPhase::Loaded).unwrap(), PhaseOutcome::Created { .. }));
		let shown = driver.on_phase(&surface, AdPhase::Displayed).unwrap();
		assert!(matches!(shown, PhaseOutcome::Transition { transition, .. } if transition.resulting_state() == SessionState::Started));
		driver.on_phase(&surface, AdPhase::Closed).unwrap();

		assert!(driver.handle(SurfaceId(1)).is_none());
		assert_eq!(
			sdk.calls().into_iter().filter(|c| !matches!(c, SdkCall::CreateSession { .. })).collect::<Vec<_>>(),
			vec![SdkCall::Activate, SdkCall::Start { vendor_session: 1 }, SdkCall::Finish { vendor_session: 1 }]
		);
	}

	#[test]
	fn duplicate_display_is_redundant() {
		let sdk = RecordingSdk::new();
		let mut driver = driver(&sdk);
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(1, None);

		driver.on_phase(&surface, AdPhase::Loaded).unwrap();
		driver.on_phase(&surface, AdPhase::Displayed).unwrap();
		let again = driver.on_phase(&surface, AdPhase::Displayed).unwrap();

		assert!(matches!(again, PhaseOutcome::Transition { transition, .. } if transition.is_redundant()));
		assert_eq!(driver.bridge().stats().redundant_transitions, 1);
	}

	#[test]
	fn phases_without_session_report_no_session() {
		let sdk = RecordingSdk::new();
		let mut driver = driver(&sdk);
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(1, None);

		assert_eq!(driver.on_phase(&surface, AdPhase::Displayed).unwrap(), PhaseOutcome::NoSession);
		assert_eq!(driver.on_phase(&surface, AdPhase::Failed).unwrap(), PhaseOutcome::NoSession);
		assert_eq!(driver.on_surface_destroyed(SurfaceId(1)), PhaseOutcome::NoSession);
	}

	#[test]
	fn reload_replaces_handle() {
		let sdk = RecordingSdk::new();
		let mut driver = driver(&sdk);
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(1, None);

		driver.on_phase(&surface, AdPhase::Loaded).unwrap();
		driver.on_phase(&surface, AdPhase::Displayed).unwrap();
		let first = driver.handle(SurfaceId(1)).cloned().unwrap();
		driver.on_phase(&surface, AdPhase::Loaded).unwrap();

		assert_eq!(first.state(), SessionState::Finished);
		let current = driver.handle(SurfaceId(1)).unwrap();
		assert_ne!(current.id(), first.id());
		assert_eq!(current.state(), SessionState::Created);
	}

	#[test]
	fn destroying_surface_finishes_session() {
		let sdk = RecordingSdk::new();
		let mut driver = driver(&sdk);
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(2, None);

		driver.on_phase(&surface, AdPhase::Loaded).unwrap();
		driver.on_phase(&surface, AdPhase::Displayed).unwrap();
		let outcome = driver.on_surface_destroyed(SurfaceId(2));

		assert!(matches!(outcome, PhaseOutcome::Transition { transition, .. } if transition.resulting_state() == SessionState::Finished));
		assert_eq!(driver.bridge().stats().implicit_finishes, 1);
	}
}
