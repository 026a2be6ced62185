//! Surface → live session registry.
//!
//! One map lock guards membership; each session has its own lock for state
//! transitions. Lock order is always map, then session, and neither lock is
//! held while the vendor runs: displacing a live session only unregisters
//! it, and the caller finishes it afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use adverify_protocol::{SessionId, SurfaceId};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::ReplacePolicy;
use crate::error::{BridgeError, Result};
use crate::session::MeasurementSession;

/// Shared, individually locked session.
pub(crate) type SessionCell = Arc<Mutex<MeasurementSession>>;

struct Entry {
	session: SessionId,
	cell: SessionCell,
}

/// Outcome of [`SessionRegistry::install`].
#[derive(Debug)]
pub(crate) enum Install {
	Installed,
	/// A live session held the surface and was unregistered instead. Finish
	/// it, then install again.
	Displaced { session: SessionId, cell: SessionCell },
}

#[derive(Default)]
pub struct SessionRegistry {
	entries: Mutex<HashMap<SurfaceId, Entry>>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Installs `cell` for its surface when the surface holds no live
	/// session.
	///
	/// Otherwise the live session is unregistered and handed back under
	/// [`ReplacePolicy::FinishPrior`], or the install is refused under
	/// [`ReplacePolicy::Reject`]. Either way `cell` is not installed.
	pub(crate) fn install(&self, cell: &SessionCell, policy: ReplacePolicy) -> Result<Install> {
		let (surface, session) = {
			let guard = cell.lock();
			(guard.surface_id(), guard.id())
		};

		let mut entries = self.entries.lock();
		if let Some((prior, prior_cell)) = evict_live(&mut entries, surface, policy)? {
			debug!(target: "adverify.registry", %surface, %prior, %session, "displacing live session");
			return Ok(Install::Displaced {
				session: prior,
				cell: prior_cell,
			});
		}

		entries.insert(
			surface,
			Entry {
				session,
				cell: Arc::clone(cell),
			},
		);
		Ok(Install::Installed)
	}

	/// Unregisters the live session for `surface` so the caller can finish
	/// it. Refused under [`ReplacePolicy::Reject`].
	pub(crate) fn evict_live(&self, surface: SurfaceId, policy: ReplacePolicy) -> Result<Option<(SessionId, SessionCell)>> {
		evict_live(&mut self.entries.lock(), surface, policy)
	}

	/// Removes the entry for `surface` when it still belongs to `session`.
	pub(crate) fn remove_if(&self, surface: SurfaceId, session: SessionId) -> bool {
		let mut entries = self.entries.lock();
		match entries.get(&surface) {
			Some(entry) if entry.session == session => {
				entries.remove(&surface);
				true
			}
			_ => false,
		}
	}

	/// Removes and returns the session registered for `surface`.
	pub(crate) fn take(&self, surface: SurfaceId) -> Option<(SessionId, SessionCell)> {
		self.entries.lock().remove(&surface).map(|entry| (entry.session, entry.cell))
	}

	/// Session currently registered for `surface`.
	pub fn session_for(&self, surface: SurfaceId) -> Option<SessionId> {
		self.entries.lock().get(&surface).map(|entry| entry.session)
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Surfaces whose registered session is still `created` or `started`.
	pub fn live_surfaces(&self) -> Vec<SurfaceId> {
		let entries = self.entries.lock();
		let mut live: Vec<_> = entries
			.iter()
			.filter(|(_, entry)| entry.cell.lock().state().is_live())
			.map(|(surface, _)| *surface)
			.collect();
		live.sort();
		live
	}
}

fn evict_live(
	entries: &mut HashMap<SurfaceId, Entry>,
	surface: SurfaceId,
	policy: ReplacePolicy,
) -> Result<Option<(SessionId, SessionCell)>> {
	let Some(prior) = entries.get(&surface) else {
		return Ok(None);
	};
	if !prior.cell.lock().state().is_live() {
		entries.remove(&surface);
		return Ok(None);
	}
	match policy {
		ReplacePolicy::Reject => Err(BridgeError::SurfaceBusy {
			surface,
			session: prior.session,
		}),
		ReplacePolicy::FinishPrior => Ok(entries.remove(&surface).map(|entry| (entry.session, entry.cell))),
	}
}
