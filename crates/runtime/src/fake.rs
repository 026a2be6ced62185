//! In-memory measurement SDK and surfaces for tests and replay tooling.
//!
//! [`RecordingSdk`] records every vendor call in order so callers can assert
//! on call ordering without a real SDK.
//!
//! # Example
//!
//! ```ignore
//! let sdk = RecordingSdk::builder().refuse_sessions().build();
//! let surface = FakeSurface::new(1, Some("https://ads.example/creative"));
//! // ... drive the bridge ...
//! assert_eq!(sdk.calls(), vec![SdkCall::Activate]);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use adverify_protocol::{PartnerInfo, SurfaceId};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{Result, SdkError};
use crate::measurement::{MeasurementSdk, VendorSession};
use crate::surface::{ContentStream, RenderingSurface};

/// One call received by the fake SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum SdkCall {
	Activate,
	#[serde(rename_all = "camelCase")]
	CreateSession {
		vendor_session: u64,
		partner: String,
		location: Option<String>,
	},
	#[serde(rename_all = "camelCase")]
	Start { vendor_session: u64 },
	#[serde(rename_all = "camelCase")]
	Finish { vendor_session: u64 },
}

type CallLog = Arc<Mutex<Vec<SdkCall>>>;

/// Builder for [`RecordingSdk`].
#[derive(Debug, Default)]
pub struct RecordingSdkBuilder {
	fail_activation: bool,
	refuse_sessions: bool,
}

impl RecordingSdkBuilder {
	/// Makes `activate` return an error.
	pub fn fail_activation(mut self) -> Self {
		self.fail_activation = true;
		self
	}

	/// Makes `create_session` return an error.
	pub fn refuse_sessions(mut self) -> Self {
		self.refuse_sessions = true;
		self
	}

	pub fn build(self) -> RecordingSdk {
		RecordingSdk {
			fail_activation: self.fail_activation,
			refuse_sessions: self.refuse_sessions,
			next_session: Arc::new(AtomicU64::new(1)),
			calls: Arc::new(Mutex::new(Vec::new())),
		}
	}
}

/// Measurement SDK double that records calls.
#[derive(Debug, Clone)]
pub struct RecordingSdk {
	fail_activation: bool,
	refuse_sessions: bool,
	next_session: Arc<AtomicU64>,
	calls: CallLog,
}

impl RecordingSdk {
	pub fn new() -> Self {
		Self::builder().build()
	}

	pub fn builder() -> RecordingSdkBuilder {
		RecordingSdkBuilder::default()
	}

	/// Returns a copy of every call so far.
	pub fn calls(&self) -> Vec<SdkCall> {
		self.calls.lock().clone()
	}

	/// Takes all recorded calls, clearing the log.
	pub fn take_calls(&self) -> Vec<SdkCall> {
		std::mem::take(&mut *self.calls.lock())
	}

	pub fn activation_count(&self) -> usize {
		self.calls.lock().iter().filter(|c| matches!(c, SdkCall::Activate)).count()
	}

	fn record(&self, call: SdkCall) {
		self.calls.lock().push(call);
	}
}

impl Default for RecordingSdk {
	fn default() -> Self {
		Self::new()
	}
}

impl MeasurementSdk for RecordingSdk {
	fn activate(&self) -> Result<()> {
		self.record(SdkCall::Activate);
		if self.fail_activation {
			return Err(SdkError::Activation("fake activation failure".to_string()));
		}
		Ok(())
	}

	fn create_session(&self, partner: &PartnerInfo, stream: &Arc<dyn ContentStream>) -> Result<Box<dyn VendorSession>> {
		if self.refuse_sessions {
			return Err(SdkError::SessionConstruction("fake refusal".to_string()));
		}
		let stream = stream.downcast_ref::<FakeStream>().ok_or(SdkError::UnsupportedStream)?;

		let id = self.next_session.fetch_add(1, Ordering::Relaxed);
		self.record(SdkCall::CreateSession {
			vendor_session: id,
			partner: partner.to_string(),
			location: stream.location.clone(),
		});
		Ok(Box::new(RecordingSession {
			id,
			calls: Arc::clone(&self.calls),
		}))
	}
}

struct RecordingSession {
	id: u64,
	calls: CallLog,
}

impl VendorSession for RecordingSession {
	fn start(&mut self) {
		self.calls.lock().push(SdkCall::Start { vendor_session: self.id });
	}

	fn finish(&mut self) {
		self.calls.lock().push(SdkCall::Finish { vendor_session: self.id });
	}
}

/// Content stream understood by [`RecordingSdk`].
#[derive(Debug, Clone, Default)]
pub struct FakeStream {
	pub location: Option<String>,
}

impl ContentStream for FakeStream {
	fn location(&self) -> Option<&str> {
		self.location.as_deref()
	}
}

/// Host surface double. `destroy` drops its content stream.
#[derive(Debug)]
pub struct FakeSurface {
	id: SurfaceId,
	stream: Mutex<Option<Arc<FakeStream>>>,
}

impl FakeSurface {
	/// A loadable surface with an optional document location.
	pub fn new(id: u64, location: Option<&str>) -> Arc<Self> {
		Arc::new(Self {
			id: SurfaceId(id),
			stream: Mutex::new(Some(Arc::new(FakeStream {
				location: location.map(str::to_string),
			}))),
		})
	}

	/// A surface that cannot supply a content stream.
	pub fn blank(id: u64) -> Arc<Self> {
		Arc::new(Self {
			id: SurfaceId(id),
			stream: Mutex::new(None),
		})
	}

	pub fn destroy(&self) {
		self.stream.lock().take();
	}
}

impl RenderingSurface for FakeSurface {
	fn surface_id(&self) -> SurfaceId {
		self.id
	}

	fn content_stream(&self) -> Option<Arc<dyn ContentStream>> {
		self.stream.lock().clone().map(|s| s as Arc<dyn ContentStream>)
	}
}
