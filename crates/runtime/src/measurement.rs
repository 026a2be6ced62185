//! Contract with the vendor measurement SDK.

use std::sync::Arc;

use adverify_protocol::PartnerInfo;

use crate::error::Result;
use crate::surface::ContentStream;

/// Vendor session capability: the only calls the bridge ever makes on a
/// constructed session.
///
/// Vendors are order-sensitive here. The bridge guarantees `start` at most
/// once, and `finish` at most once and only after `start` returned. Neither is
/// called with a bridge lock held, so implementations may call back into the
/// bridge.
pub trait VendorSession: Send {
	fn start(&mut self);
	fn finish(&mut self);
}

/// Entry points of the measurement SDK.
pub trait MeasurementSdk: Send + Sync {
	/// One-time SDK activation. Called at most once per process by
	/// [`MeasurementActivation`](crate::MeasurementActivation).
	fn activate(&self) -> Result<()>;

	/// Builds a session observing `stream`. Must not start it.
	fn create_session(&self, partner: &PartnerInfo, stream: &Arc<dyn ContentStream>) -> Result<Box<dyn VendorSession>>;
}
