//! Facade consumed by the host binding layer.

use std::fmt;
use std::sync::Arc;

use adverify_protocol::{PartnerInfo, SessionId, StatsSnapshot, SurfaceId, Transition};
use adverify_runtime::{ActivationOutcome, MeasurementActivation, MeasurementSdk, RenderingSurface};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::factory::SessionFactory;
use crate::manager::{SessionHandle, SessionManager, SurfaceGuard};
use crate::stats::BridgeStats;

/// The only entry point the scripting layer sees.
///
/// All lifecycle ordering is enforced behind it, so the binding layer cannot
/// corrupt session order no matter how it forwards host callbacks.
pub struct BridgeService {
	partner: Arc<PartnerInfo>,
	sdk: Arc<dyn MeasurementSdk>,
	activation: &'static MeasurementActivation,
	factory: SessionFactory,
	manager: SessionManager,
	stats: Arc<BridgeStats>,
}

impl BridgeService {
	/// Creates a bridge backed by the process-wide activation flag.
	pub fn new(config: &BridgeConfig, sdk: Arc<dyn MeasurementSdk>) -> Result<Self> {
		Self::with_activation(config, sdk, MeasurementActivation::global())
	}

	/// Creates a bridge backed by a caller-provided activation flag.
	pub fn with_activation(config: &BridgeConfig, sdk: Arc<dyn MeasurementSdk>, activation: &'static MeasurementActivation) -> Result<Self> {
		config.validate()?;
		let partner = Arc::new(config.partner());
		let stats = Arc::new(BridgeStats::default());
		Ok(Self {
			factory: SessionFactory::new(Arc::clone(&sdk), Arc::clone(&partner)),
			manager: SessionManager::new(config.replace_policy, Arc::clone(&stats)),
			partner,
			sdk,
			activation,
			stats,
		})
	}

	/// Partner name reported to the measurement subsystem. Constant.
	pub fn partner_identity(&self) -> &str {
		&self.partner.name
	}

	/// Partner version reported to the measurement subsystem. Constant.
	pub fn partner_version(&self) -> &str {
		&self.partner.version
	}

	pub fn partner(&self) -> &PartnerInfo {
		&self.partner
	}

	/// Activates the measurement subsystem once per process. Never fails.
	pub fn activate(&self) -> ActivationOutcome {
		let outcome = self.activation.activate(self.sdk.as_ref());
		if outcome != ActivationOutcome::AlreadyActive {
			info!(target: "adverify", partner = %self.partner, ?outcome, "bridge activated measurement");
		}
		outcome
	}

	/// Activates (once), builds a session for `surface`, and registers it,
	/// finishing any live session the surface already had.
	///
	/// The prior session is finished (or the call refused under
	/// [`ReplacePolicy::Reject`](crate::ReplacePolicy::Reject)) before the
	/// vendor is asked for the new one. `InvalidSurface` leaves the registry
	/// untouched.
	pub fn create_session(&self, surface: &Arc<dyn RenderingSurface>) -> Result<SessionHandle> {
		self.activate();
		let surface_id = surface.surface_id();

		let stream = match self.factory.content_stream(surface) {
			Ok(stream) => stream,
			Err(err) => {
				self.stats.invalid_surface();
				warn!(target: "adverify", surface = %surface_id, error = %err, "session not created");
				return Err(err);
			}
		};

		if let Err(err) = self.manager.vacate(surface_id) {
			warn!(target: "adverify", surface = %surface_id, error = %err, "session not created");
			return Err(err);
		}

		let session = self.factory.build(surface, &stream, self.activation.is_healthy());
		self.manager.register(session)
	}

	/// Returns a guard that finishes the surface's session when dropped.
	pub fn track_surface(&self, surface: &dyn RenderingSurface) -> SurfaceGuard {
		self.manager.guard(surface.surface_id())
	}

	/// Implicit finish for a destroyed surface. Returns the session it
	/// finished, if the surface had one registered.
	pub fn surface_destroyed(&self, surface: SurfaceId) -> Option<(SessionId, Transition)> {
		let transition = self.manager.teardown_surface(surface);
		if transition.is_none() {
			debug!(target: "adverify", %surface, "no session to tear down");
		}
		transition
	}

	pub fn manager(&self) -> &SessionManager {
		&self.manager
	}

	pub fn stats(&self) -> StatsSnapshot {
		self.stats.snapshot(self.activation, self.manager.live_count())
	}
}

impl fmt::Debug for BridgeService {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BridgeService")
			.field("partner", &self.partner)
			.field("activation", &self.activation.state())
			.field("manager", &self.manager)
			.finish()
	}
}
