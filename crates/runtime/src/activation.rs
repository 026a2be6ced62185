//! Process-wide, init-once activation of the measurement subsystem.
//!
//! Activation state is `inactive -> active`, exactly once, never reset. The
//! first caller wins a compare-and-set and runs the vendor activation; every
//! other caller (concurrent or later) is a no-op. Callers that lose the race
//! while the winner is still inside the vendor call park on a condition
//! variable until it publishes, so no caller returns before the subsystem is
//! usable.
//!
//! Vendor failures are never surfaced. The state still becomes `active` but
//! is marked unhealthy; the session layer then builds bookkeeping-only
//! sessions and ad rendering carries on.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::measurement::MeasurementSdk;

const INACTIVE: u8 = 0;
const ACTIVATING: u8 = 1;
const ACTIVE: u8 = 2;

static GLOBAL: MeasurementActivation = MeasurementActivation::new();

/// Observable activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
	Inactive,
	Active,
}

/// What a single `activate` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
	/// This call performed the activation and the vendor accepted it.
	Activated,
	/// This call performed the activation but the vendor failed.
	Degraded,
	/// Another call already performed (or is performing) the activation.
	AlreadyActive,
}

/// Init-once activation flag.
///
/// Use [`MeasurementActivation::global`] for the process-wide instance; tests
/// construct their own.
#[derive(Debug)]
pub struct MeasurementActivation {
	state: AtomicU8,
	healthy: AtomicBool,
	/// Guards the `ACTIVATING -> ACTIVE` store against lost wakeups.
	gate: Mutex<()>,
	published: Condvar,
}

impl MeasurementActivation {
	pub const fn new() -> Self {
		Self {
			state: AtomicU8::new(INACTIVE),
			healthy: AtomicBool::new(false),
			gate: Mutex::new(()),
			published: Condvar::new(),
		}
	}

	/// The process-wide activation flag.
	pub fn global() -> &'static Self {
		&GLOBAL
	}

	/// Activates the measurement subsystem on first call; no-op afterwards.
	pub fn activate(&self, sdk: &dyn MeasurementSdk) -> ActivationOutcome {
		if self
			.state
			.compare_exchange(INACTIVE, ACTIVATING, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			self.wait_published();
			return ActivationOutcome::AlreadyActive;
		}

		let _publish = PublishOnDrop(self);
		match sdk.activate() {
			Ok(()) => {
				self.healthy.store(true, Ordering::Release);
				info!(target: "adverify.activation", "measurement subsystem activated");
				ActivationOutcome::Activated
			}
			Err(err) => {
				warn!(
					target: "adverify.activation",
					error = %err,
					"measurement activation failed; verification disabled for this process"
				);
				ActivationOutcome::Degraded
			}
		}
	}

	pub fn state(&self) -> ActivationState {
		match self.state.load(Ordering::Acquire) {
			INACTIVE => ActivationState::Inactive,
			_ => ActivationState::Active,
		}
	}

	/// Returns `true` once activation has been published.
	pub fn is_active(&self) -> bool {
		self.state.load(Ordering::Acquire) == ACTIVE
	}

	/// Returns `true` when activation ran and the vendor accepted it.
	pub fn is_healthy(&self) -> bool {
		self.is_active() && self.healthy.load(Ordering::Acquire)
	}

	fn wait_published(&self) {
		if self.state.load(Ordering::Acquire) != ACTIVATING {
			return;
		}
		debug!(target: "adverify.activation", "waiting for concurrent activation");
		let mut gate = self.gate.lock();
		while self.state.load(Ordering::Acquire) == ACTIVATING {
			self.published.wait(&mut gate);
		}
	}

	fn publish(&self) {
		let _gate = self.gate.lock();
		self.state.store(ACTIVE, Ordering::Release);
		self.published.notify_all();
	}
}

impl Default for MeasurementActivation {
	fn default() -> Self {
		Self::new()
	}
}

/// Publishes `ACTIVE` even if the vendor call unwinds, so waiters never hang.
struct PublishOnDrop<'a>(&'a MeasurementActivation);

impl Drop for PublishOnDrop<'_> {
	fn drop(&mut self) {
		self.0.publish();
	}
}
