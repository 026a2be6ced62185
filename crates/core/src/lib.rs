//! Ad-verification session bridge.
//!
//! Binds one measurement session to one rendering surface and drives it
//! through `created -> started -> finished` in the order the measurement SDK
//! requires, no matter how often (or in what order) the host's ad lifecycle
//! callbacks fire.
//!
//! The entry point is [`BridgeService`]. It activates the measurement
//! subsystem once per process, builds sessions through [`SessionFactory`],
//! and registers them with the [`SessionManager`], returning a
//! [`SessionHandle`] the host drives later. [`LifecycleDriver`] maps raw ad
//! phases (`loaded`, `displayed`, `closed`, ...) onto those calls.

pub mod config;
pub mod error;
pub mod factory;
pub mod lifecycle;
pub mod manager;
pub mod registry;
pub mod service;
pub mod session;
pub mod stats;

pub use adverify_protocol::{AdPhase, LifecycleOp, PartnerInfo, RedundantTransition, SessionId, SessionState, StatsSnapshot, SurfaceId, Transition};
pub use adverify_runtime::{ContentStream, MeasurementActivation, MeasurementSdk, RenderingSurface, VendorSession};
pub use config::{BridgeConfig, ReplacePolicy};
pub use error::{BridgeError, Result};
pub use factory::SessionFactory;
pub use lifecycle::{LifecycleDriver, PhaseOutcome};
pub use manager::{SessionHandle, SessionManager, SurfaceGuard};
pub use service::BridgeService;
pub use session::MeasurementSession;
