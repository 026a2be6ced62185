//! Measurement session and its lifecycle state machine.
//!
//! ```text
//! created ──start──▶ started ──finish──▶ finished
//!    │                                      ▲
//!    └──────────finish (never began)────────┘
//! ```
//!
//! Anything else is a [`RedundantTransition`] and leaves the session as it
//! was. `finished` is terminal: the vendor session and every reference to the
//! surface are released and the object becomes inert.
//!
//! Transitions are decided under the session lock, but the vendor is only
//! called through [`VendorWork::run`] once that lock is released. Vendor code
//! may call back into the bridge (including the same session) from inside
//! `start` or `finish`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use adverify_protocol::{LifecycleOp, PartnerInfo, RedundantTransition, SessionId, SessionState, SurfaceId, Transition};
use adverify_runtime::{ContentStream, RenderingSurface, VendorSession};
use parking_lot::Mutex;
use tracing::{debug, warn};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
	SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Vendor call decided by a transition, made after the session lock is
/// released.
#[must_use = "vendor work must run once the session lock is released"]
pub(crate) enum VendorWork {
	Idle,
	Start(Box<dyn VendorSession>),
	Finish(Box<dyn VendorSession>),
	/// The vendor session was never started; drop it.
	Release(Box<dyn VendorSession>),
}

impl VendorWork {
	/// Runs the vendor call. `cell` must not be locked by the caller.
	///
	/// After `start` the vendor session goes back to its session, which may
	/// owe it a `finish` if one arrived while the vendor was running.
	pub(crate) fn run(self, cell: &Mutex<MeasurementSession>) {
		let mut work = self;
		loop {
			work = match work {
				Self::Idle => return,
				Self::Start(mut vendor) => {
					vendor.start();
					cell.lock().return_vendor(vendor)
				}
				Self::Finish(mut vendor) => {
					vendor.finish();
					return;
				}
				Self::Release(vendor) => {
					drop(vendor);
					return;
				}
			};
		}
	}
}

/// One verification session bound to one rendering surface.
///
/// Holds the surface and its content stream weakly; the host's surface is
/// never kept alive by a session.
pub struct MeasurementSession {
	id: SessionId,
	surface_id: SurfaceId,
	surface: Option<Weak<dyn RenderingSurface>>,
	stream: Option<Weak<dyn ContentStream>>,
	partner: Arc<PartnerInfo>,
	vendor: Option<Box<dyn VendorSession>>,
	/// The vendor is inside `start`, outside the lock.
	vendor_busy: bool,
	/// `finish` arrived while the vendor was busy starting.
	finish_owed: bool,
	detached: bool,
	state: SessionState,
}

impl MeasurementSession {
	pub(crate) fn new(
		surface: &Arc<dyn RenderingSurface>,
		stream: &Arc<dyn ContentStream>,
		partner: Arc<PartnerInfo>,
		vendor: Option<Box<dyn VendorSession>>,
	) -> Self {
		Self {
			id: next_session_id(),
			surface_id: surface.surface_id(),
			surface: Some(Arc::downgrade(surface)),
			stream: Some(Arc::downgrade(stream)),
			partner,
			detached: vendor.is_none(),
			vendor,
			vendor_busy: false,
			finish_owed: false,
			state: SessionState::Created,
		}
	}

	pub fn id(&self) -> SessionId {
		self.id
	}

	pub fn surface_id(&self) -> SurfaceId {
		self.surface_id
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn partner(&self) -> &PartnerInfo {
		&self.partner
	}

	/// `true` when no vendor session backs this one; transitions are
	/// bookkeeping only.
	pub fn is_detached(&self) -> bool {
		self.detached
	}

	/// The bound surface, while both the session and the surface are alive.
	pub fn surface(&self) -> Option<Arc<dyn RenderingSurface>> {
		self.surface.as_ref().and_then(Weak::upgrade)
	}

	fn surface_alive(&self) -> bool {
		let surface = self.surface.as_ref().is_some_and(|w| w.strong_count() > 0);
		let stream = self.stream.as_ref().is_some_and(|w| w.strong_count() > 0);
		surface && stream
	}

	/// `created -> started`. Finishes instead when the surface is already
	/// gone, so a dead surface is never observed.
	pub(crate) fn start(&mut self) -> (Transition, VendorWork) {
		if self.state != SessionState::Created {
			return (self.redundant(LifecycleOp::Start), VendorWork::Idle);
		}

		if !self.surface_alive() {
			warn!(
				target: "adverify.session",
				session = %self.id,
				surface = %self.surface_id,
				"surface gone before start; finishing session"
			);
			self.state = SessionState::Finished;
			let transition = Transition::Applied {
				from: SessionState::Created,
				to: SessionState::Finished,
				reported: false,
			};
			return (transition, self.release());
		}

		self.state = SessionState::Started;
		let work = match self.vendor.take() {
			Some(vendor) => {
				self.vendor_busy = true;
				VendorWork::Start(vendor)
			}
			None => VendorWork::Idle,
		};
		let reported = self.vendor_busy;
		debug!(target: "adverify.session", session = %self.id, surface = %self.surface_id, reported, "session started");
		let transition = Transition::Applied {
			from: SessionState::Created,
			to: SessionState::Started,
			reported,
		};
		(transition, work)
	}

	/// `created|started -> finished`. The vendor only hears about it when it
	/// previously heard `start`.
	pub(crate) fn finish(&mut self) -> (Transition, VendorWork) {
		let from = self.state;
		let (reported, work) = match from {
			SessionState::Finished => return (self.redundant(LifecycleOp::Finish), VendorWork::Idle),
			SessionState::Created => (false, self.release()),
			SessionState::Started => match self.vendor.take() {
				Some(vendor) => (true, VendorWork::Finish(vendor)),
				None if self.vendor_busy => {
					self.finish_owed = true;
					(true, VendorWork::Idle)
				}
				None => (false, VendorWork::Idle),
			},
		};

		self.surface = None;
		self.stream = None;
		self.state = SessionState::Finished;
		debug!(target: "adverify.session", session = %self.id, surface = %self.surface_id, %from, reported, "session finished");
		let transition = Transition::Applied {
			from,
			to: SessionState::Finished,
			reported,
		};
		(transition, work)
	}

	/// Takes back the vendor session after its `start` returned.
	fn return_vendor(&mut self, vendor: Box<dyn VendorSession>) -> VendorWork {
		self.vendor_busy = false;
		if self.finish_owed {
			self.finish_owed = false;
			return VendorWork::Finish(vendor);
		}
		self.vendor = Some(vendor);
		VendorWork::Idle
	}

	fn release(&mut self) -> VendorWork {
		self.surface = None;
		self.stream = None;
		match self.vendor.take() {
			Some(vendor) => VendorWork::Release(vendor),
			None => VendorWork::Idle,
		}
	}

	fn redundant(&self, op: LifecycleOp) -> Transition {
		let redundant = RedundantTransition { op, state: self.state };
		debug!(target: "adverify.session", session = %self.id, surface = %self.surface_id, "{redundant}; ignoring");
		Transition::Redundant(redundant)
	}
}

impl fmt::Debug for MeasurementSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MeasurementSession")
			.field("id", &self.id)
			.field("surface_id", &self.surface_id)
			.field("partner", &self.partner)
			.field("detached", &self.detached)
			.field("state", &self.state)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use adverify_runtime::MeasurementSdk;
	use adverify_runtime::fake::{FakeSurface, RecordingSdk, SdkCall};

	use super::*;

	fn partner() -> Arc<PartnerInfo> {
		Arc::new(PartnerInfo {
			name: "Kidoznet".into(),
			version: "2.1".into(),
		})
	}

	fn measured(sdk: &RecordingSdk, fake: &Arc<FakeSurface>) -> Mutex<MeasurementSession> {
		let surface: Arc<dyn RenderingSurface> = fake.clone();
		let stream = surface.content_stream().unwrap();
		let vendor = sdk.create_session(&partner(), &stream).unwrap();
		Mutex::new(MeasurementSession::new(&surface, &stream, partner(), Some(vendor)))
	}

	fn start(cell: &Mutex<MeasurementSession>) -> Transition {
		let (transition, work) = cell.lock().start();
		work.run(cell);
		transition
	}

	fn finish(cell: &Mutex<MeasurementSession>) -> Transition {
		let (transition, work) = cell.lock().finish();
		work.run(cell);
		transition
	}

	fn vendor_calls(sdk: &RecordingSdk) -> Vec<SdkCall> {
		sdk.calls().into_iter().filter(|c| !matches!(c, SdkCall::CreateSession { .. })).collect()
	}

	#[test]
	fn full_lifecycle_reports_to_vendor_in_order() {
		let sdk = RecordingSdk::new();
		let fake = FakeSurface::new(1, None);
		let session = measured(&sdk, &fake);
		assert_eq!(session.lock().state(), SessionState::Created);

		assert_eq!(
			start(&session),
			Transition::Applied {
				from: SessionState::Created,
				to: SessionState::Started,
				reported: true,
			}
		);
		assert_eq!(
			finish(&session),
			Transition::Applied {
				from: SessionState::Started,
				to: SessionState::Finished,
				reported: true,
			}
		);
		assert_eq!(
			vendor_calls(&sdk),
			vec![SdkCall::Start { vendor_session: 1 }, SdkCall::Finish { vendor_session: 1 }]
		);
	}

	#[test]
	fn transitions_do_not_call_vendor_until_run() {
		let sdk = RecordingSdk::new();
		let fake = FakeSurface::new(1, None);
		let session = measured(&sdk, &fake);

		let (transition, work) = session.lock().start();
		assert_eq!(transition.resulting_state(), SessionState::Started);
		assert!(vendor_calls(&sdk).is_empty());

		work.run(&session);
		assert_eq!(vendor_calls(&sdk), vec![SdkCall::Start { vendor_session: 1 }]);
	}

	#[test]
	fn finish_while_vendor_starts_is_delivered_after_start() {
		let sdk = RecordingSdk::new();
		let fake = FakeSurface::new(1, None);
		let session = measured(&sdk, &fake);

		let (_, start_work) = session.lock().start();
		let (transition, finish_work) = session.lock().finish();
		assert_eq!(
			transition,
			Transition::Applied {
				from: SessionState::Started,
				to: SessionState::Finished,
				reported: true,
			}
		);
		finish_work.run(&session);
		assert!(vendor_calls(&sdk).is_empty());

		start_work.run(&session);
		assert_eq!(
			vendor_calls(&sdk),
			vec![SdkCall::Start { vendor_session: 1 }, SdkCall::Finish { vendor_session: 1 }]
		);
		assert!(finish(&session).is_redundant());
	}

	#[test]
	fn duplicate_calls_are_redundant() {
		let sdk = RecordingSdk::new();
		let fake = FakeSurface::new(1, None);
		let session = measured(&sdk, &fake);

		start(&session);
		assert_eq!(
			start(&session),
			Transition::Redundant(RedundantTransition {
				op: LifecycleOp::Start,
				state: SessionState::Started,
			})
		);
		finish(&session);
		assert!(finish(&session).is_redundant());
		assert!(start(&session).is_redundant());
		assert_eq!(session.lock().state(), SessionState::Finished);
		assert_eq!(vendor_calls(&sdk).len(), 2);
	}

	#[test]
	fn finish_before_start_skips_vendor() {
		let sdk = RecordingSdk::new();
		let fake = FakeSurface::new(1, None);
		let session = measured(&sdk, &fake);

		assert_eq!(
			finish(&session),
			Transition::Applied {
				from: SessionState::Created,
				to: SessionState::Finished,
				reported: false,
			}
		);
		assert!(vendor_calls(&sdk).is_empty());
		assert!(session.lock().surface().is_none());
	}

	#[test]
	fn start_on_destroyed_surface_finishes() {
		let sdk = RecordingSdk::new();
		let fake = FakeSurface::new(1, None);
		let session = measured(&sdk, &fake);
		fake.destroy();

		let transition = start(&session);
		assert_eq!(transition.resulting_state(), SessionState::Finished);
		assert!(vendor_calls(&sdk).is_empty());
	}

	#[test]
	fn session_does_not_keep_surface_alive() {
		let sdk = RecordingSdk::new();
		let fake = FakeSurface::new(1, None);
		let session = measured(&sdk, &fake);
		assert!(session.lock().surface().is_some());

		drop(fake);
		assert!(session.lock().surface().is_none());
	}

	#[test]
	fn detached_session_tracks_state_without_vendor() {
		let fake = FakeSurface::new(1, None);
		let surface: Arc<dyn RenderingSurface> = fake.clone();
		let stream = surface.content_stream().unwrap();
		let session = Mutex::new(MeasurementSession::new(&surface, &stream, partner(), None));

		assert!(session.lock().is_detached());
		assert_eq!(
			start(&session),
			Transition::Applied {
				from: SessionState::Created,
				to: SessionState::Started,
				reported: false,
			}
		);
		assert_eq!(finish(&session).resulting_state(), SessionState::Finished);
	}

	#[test]
	fn every_call_sequence_follows_lifecycle_order() {
		let sdk = RecordingSdk::new();
		for mask in 0u32..64 {
			let fake = FakeSurface::new(u64::from(mask), None);
			let session = measured(&sdk, &fake);
			let mut last = session.lock().state();
			for step in 0..6 {
				let transition = if mask & (1 << step) == 0 { start(&session) } else { finish(&session) };
				let now = transition.resulting_state();
				assert!(now >= last, "mask {mask:06b}: {last} -> {now}");
				if last == SessionState::Finished {
					assert!(transition.is_redundant());
				}
				last = now;
			}
		}
	}
}
