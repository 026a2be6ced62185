//! Session lifecycle manager.
//!
//! Owns the [`SessionRegistry`] and is the only place session state changes.
//! Hosts hold [`SessionHandle`]s and call `start`/`finish` on them in
//! response to ad lifecycle callbacks; those callbacks may fire twice or out
//! of order, and the manager absorbs that as redundant transitions.

use std::fmt;
use std::sync::{Arc, Weak};

use adverify_protocol::{LifecycleOp, SessionId, SessionState, SurfaceId, Transition};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::ReplacePolicy;
use crate::error::{BridgeError, Result};
use crate::registry::{Install, SessionCell, SessionRegistry};
use crate::session::MeasurementSession;
use crate::stats::BridgeStats;

struct ManagerShared {
	registry: SessionRegistry,
	stats: Arc<BridgeStats>,
	policy: ReplacePolicy,
}

/// Registry owner and state-machine driver. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
	shared: Arc<ManagerShared>,
}

impl SessionManager {
	pub fn new(policy: ReplacePolicy, stats: Arc<BridgeStats>) -> Self {
		Self {
			shared: Arc::new(ManagerShared {
				registry: SessionRegistry::new(),
				stats,
				policy,
			}),
		}
	}

	pub fn policy(&self) -> ReplacePolicy {
		self.shared.policy
	}

	pub fn registry(&self) -> &SessionRegistry {
		&self.shared.registry
	}

	/// Clears `surface` for a new session: a live session holding it is
	/// finished, or refused with [`BridgeError::SurfaceBusy`] under
	/// [`ReplacePolicy::Reject`].
	pub fn vacate(&self, surface: SurfaceId) -> Result<()> {
		match self.shared.registry.evict_live(surface, self.shared.policy) {
			Ok(Some((prior, cell))) => {
				self.shared.supersede(surface, prior, &cell);
				Ok(())
			}
			Ok(None) => Ok(()),
			Err(err) => Err(self.shared.refused(err)),
		}
	}

	/// Registers a freshly built session for its surface.
	///
	/// Any live session on the same surface reaches `finished` before this
	/// one is installed.
	pub fn register(&self, session: MeasurementSession) -> Result<SessionHandle> {
		let id = session.id();
		let surface = session.surface_id();
		let detached = session.is_detached();
		let cell: SessionCell = Arc::new(Mutex::new(session));

		loop {
			match self.shared.registry.install(&cell, self.shared.policy) {
				Ok(Install::Installed) => break,
				Ok(Install::Displaced { session: prior, cell: prior_cell }) => {
					self.shared.supersede(surface, prior, &prior_cell);
				}
				Err(err) => return Err(self.shared.refused(err)),
			}
		}
		self.shared.stats.session_created(detached);
		debug!(target: "adverify.session", %surface, session = %id, "session registered");

		Ok(SessionHandle {
			id,
			surface,
			cell,
			manager: self.clone(),
		})
	}

	/// `created -> started`; redundant otherwise.
	pub fn start(&self, handle: &SessionHandle) -> Transition {
		let transition = run_start(&handle.cell);
		self.shared.stats.record(LifecycleOp::Start, &transition);
		if transition.resulting_state() == SessionState::Finished && transition.is_applied() {
			self.shared.registry.remove_if(handle.surface, handle.id);
		}
		transition
	}

	/// `created|started -> finished`; redundant once finished.
	pub fn finish(&self, handle: &SessionHandle) -> Transition {
		let transition = run_finish(&handle.cell);
		self.shared.stats.record(LifecycleOp::Finish, &transition);
		if transition.is_applied() {
			self.shared.registry.remove_if(handle.surface, handle.id);
		}
		transition
	}

	/// Implicit finish for a destroyed surface. `None` when nothing was
	/// registered for it.
	pub fn teardown_surface(&self, surface: SurfaceId) -> Option<(SessionId, Transition)> {
		self.shared.teardown(surface)
	}

	/// Returns a guard that tears the surface's session down when dropped.
	pub fn guard(&self, surface: SurfaceId) -> SurfaceGuard {
		SurfaceGuard {
			surface,
			shared: Arc::downgrade(&self.shared),
		}
	}

	/// Live session registered for `surface`.
	pub fn live_session(&self, surface: SurfaceId) -> Option<SessionId> {
		self.shared.registry.session_for(surface)
	}

	pub fn live_count(&self) -> usize {
		self.shared.registry.live_surfaces().len()
	}
}

fn run_start(cell: &SessionCell) -> Transition {
	let (transition, work) = cell.lock().start();
	work.run(cell);
	transition
}

fn run_finish(cell: &SessionCell) -> Transition {
	let (transition, work) = cell.lock().finish();
	work.run(cell);
	transition
}

impl ManagerShared {
	fn teardown(&self, surface: SurfaceId) -> Option<(SessionId, Transition)> {
		let (session, cell) = self.registry.take(surface)?;
		let transition = run_finish(&cell);
		self.stats.record(LifecycleOp::Finish, &transition);
		if transition.is_applied() {
			self.stats.implicit_finish();
		}
		debug!(target: "adverify.session", %surface, %session, "surface torn down");
		Some((session, transition))
	}

	/// Finishes a session displaced from `surface` by a reload.
	fn supersede(&self, surface: SurfaceId, prior: SessionId, cell: &SessionCell) {
		let transition = run_finish(cell);
		self.stats.record(LifecycleOp::Finish, &transition);
		if transition.is_applied() {
			self.stats.superseded();
			info!(target: "adverify.session", %surface, %prior, "replaced session on reloaded surface");
		}
	}

	fn refused(&self, err: BridgeError) -> BridgeError {
		if matches!(err, BridgeError::SurfaceBusy { .. }) {
			self.stats.rejected_busy();
		}
		err
	}
}

impl fmt::Debug for SessionManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionManager")
			.field("policy", &self.shared.policy)
			.field("registered", &self.shared.registry.len())
			.finish()
	}
}

/// Opaque handle the host drives a session through.
///
/// Handles may be cloned freely; every clone drives the same session.
#[derive(Clone)]
pub struct SessionHandle {
	id: SessionId,
	surface: SurfaceId,
	cell: SessionCell,
	manager: SessionManager,
}

impl SessionHandle {
	pub fn id(&self) -> SessionId {
		self.id
	}

	pub fn surface_id(&self) -> SurfaceId {
		self.surface
	}

	pub fn state(&self) -> SessionState {
		self.cell.lock().state()
	}

	pub fn is_detached(&self) -> bool {
		self.cell.lock().is_detached()
	}

	pub fn start(&self) -> Transition {
		self.manager.start(self)
	}

	pub fn finish(&self) -> Transition {
		self.manager.finish(self)
	}
}

impl fmt::Debug for SessionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionHandle")
			.field("id", &self.id)
			.field("surface", &self.surface)
			.field("state", &self.state())
			.finish()
	}
}

/// Surface teardown hook.
///
/// Hosts keep the guard inside their surface object; dropping it finishes
/// whatever session is still registered for the surface. The guard does not
/// keep the manager alive.
#[must_use = "dropping the guard immediately tears the surface down"]
pub struct SurfaceGuard {
	surface: SurfaceId,
	shared: Weak<ManagerShared>,
}

impl SurfaceGuard {
	pub fn surface_id(&self) -> SurfaceId {
		self.surface
	}
}

impl Drop for SurfaceGuard {
	fn drop(&mut self) {
		if let Some(shared) = self.shared.upgrade() {
			shared.teardown(self.surface);
		}
	}
}

impl fmt::Debug for SurfaceGuard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SurfaceGuard").field("surface", &self.surface).finish()
	}
}
