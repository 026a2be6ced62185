//! Measurement subsystem seams and process-wide activation.
//!
//! The measurement SDK is a vendor black box. This crate describes the narrow
//! contract the bridge needs from it ([`MeasurementSdk`], [`VendorSession`]),
//! the contract it needs from host rendering surfaces ([`RenderingSurface`],
//! [`ContentStream`]), and owns the init-once activation flag.

pub mod activation;
pub mod error;
pub mod fake;
pub mod measurement;
pub mod surface;

pub use activation::{ActivationOutcome, ActivationState, MeasurementActivation};
pub use error::{Result, SdkError};
pub use measurement::{MeasurementSdk, VendorSession};
pub use surface::{ContentStream, RenderingSurface};
