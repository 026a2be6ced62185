//! Host rendering surfaces as seen by the bridge.

use std::fmt;
use std::sync::Arc;

use adverify_protocol::SurfaceId;
use downcast_rs::{DowncastSync, impl_downcast};

/// Injectable document channel of a rendering surface.
///
/// Opaque to the bridge. Measurement adapters downcast it to the concrete
/// web-view type they know how to instrument.
pub trait ContentStream: DowncastSync + fmt::Debug {
	/// Document location, when the surface has loaded one.
	fn location(&self) -> Option<&str> {
		None
	}
}
impl_downcast!(sync ContentStream);

/// A web-content view able to display ad markup. Owned by the host.
pub trait RenderingSurface: Send + Sync {
	/// Stable identity of the surface for its whole lifetime.
	fn surface_id(&self) -> SurfaceId;

	/// Returns the content stream, or `None` once the surface is destroyed
	/// (or was never able to load content).
	///
	/// The surface must own the returned stream for as long as it can show
	/// content. The bridge only keeps weak references and treats a dropped
	/// stream as a destroyed surface.
	fn content_stream(&self) -> Option<Arc<dyn ContentStream>>;
}
