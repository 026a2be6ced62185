//! Builds measurement sessions for rendering surfaces.

use std::sync::Arc;

use adverify_protocol::PartnerInfo;
use adverify_runtime::{ContentStream, MeasurementSdk, RenderingSurface};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::session::MeasurementSession;

/// Stateless session builder: inspects the surface, asks the vendor for a
/// session, and hands back an unstarted [`MeasurementSession`].
#[derive(Clone)]
pub struct SessionFactory {
	sdk: Arc<dyn MeasurementSdk>,
	partner: Arc<PartnerInfo>,
}

impl SessionFactory {
	pub fn new(sdk: Arc<dyn MeasurementSdk>, partner: Arc<PartnerInfo>) -> Self {
		Self { sdk, partner }
	}

	pub fn partner(&self) -> &PartnerInfo {
		&self.partner
	}

	/// Creates a session in state `created` bound to `surface`.
	///
	/// `measured` is `false` when the measurement subsystem is unusable; the
	/// session is then detached. A vendor refusal also yields a detached
	/// session. The only error is [`BridgeError::InvalidSurface`].
	pub fn create_session(&self, surface: &Arc<dyn RenderingSurface>, measured: bool) -> Result<MeasurementSession> {
		let stream = self.content_stream(surface)?;
		Ok(self.build(surface, &stream, measured))
	}

	/// The stream a session for `surface` would observe.
	pub fn content_stream(&self, surface: &Arc<dyn RenderingSurface>) -> Result<Arc<dyn ContentStream>> {
		surface.content_stream().ok_or_else(|| BridgeError::InvalidSurface {
			surface: surface.surface_id(),
		})
	}

	/// Builds a session on an already obtained `stream`. This is the only
	/// point where the vendor is asked for a session.
	pub fn build(&self, surface: &Arc<dyn RenderingSurface>, stream: &Arc<dyn ContentStream>, measured: bool) -> MeasurementSession {
		let surface_id = surface.surface_id();
		let vendor = if measured {
			match self.sdk.create_session(&self.partner, stream) {
				Ok(vendor) => Some(vendor),
				Err(err) => {
					warn!(
						target: "adverify.session",
						surface = %surface_id,
						error = %err,
						"measurement session unavailable; continuing detached"
					);
					None
				}
			}
		} else {
			None
		};

		let session = MeasurementSession::new(surface, stream, Arc::clone(&self.partner), vendor);
		debug!(
			target: "adverify.session",
			session = %session.id(),
			surface = %surface_id,
			location = stream.location().unwrap_or("-"),
			detached = session.is_detached(),
			"session created"
		);
		session
	}
}

#[cfg(test)]
mod tests {
	use adverify_protocol::{SessionState, SurfaceId};
	use adverify_runtime::fake::{FakeSurface, RecordingSdk, SdkCall};

	use super::*;

	fn factory(sdk: &RecordingSdk) -> SessionFactory {
		SessionFactory::new(
			Arc::new(sdk.clone()),
			Arc::new(PartnerInfo {
				name: "Kidoznet".into(),
				version: "2.1".into(),
			}),
		)
	}

	#[test]
	fn builds_unstarted_session_bound_to_surface() {
		let sdk = RecordingSdk::new();
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(9, Some("https://ads.example/x"));

		let session = factory(&sdk).create_session(&surface, true).unwrap();

		assert_eq!(session.state(), SessionState::Created);
		assert_eq!(session.surface_id(), SurfaceId(9));
		assert!(!session.is_detached());
		assert_eq!(session.partner().name, "Kidoznet");
		assert_eq!(
			sdk.calls(),
			vec![SdkCall::CreateSession {
				vendor_session: 1,
				partner: "Kidoznet/2.1".into(),
				location: Some("https://ads.example/x".into()),
			}]
		);
	}

	#[test]
	fn surface_without_stream_is_invalid() {
		let sdk = RecordingSdk::new();
		let surface: Arc<dyn RenderingSurface> = FakeSurface::blank(4);

		let err = factory(&sdk).create_session(&surface, true).unwrap_err();

		assert!(matches!(err, BridgeError::InvalidSurface { surface } if surface == SurfaceId(4)));
		assert!(sdk.calls().is_empty());
	}

	#[test]
	fn unmeasured_sessions_are_detached() {
		let sdk = RecordingSdk::new();
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(1, None);

		let session = factory(&sdk).create_session(&surface, false).unwrap();

		assert!(session.is_detached());
		assert!(sdk.calls().is_empty());
	}

	#[test]
	fn vendor_refusal_falls_back_to_detached() {
		let sdk = RecordingSdk::builder().refuse_sessions().build();
		let surface: Arc<dyn RenderingSurface> = FakeSurface::new(1, None);

		let session = factory(&sdk).create_session(&surface, true).unwrap();

		assert!(session.is_detached());
	}
}
