//! Data types for the adverify session bridge.
//!
//! This crate contains the serde-serializable types shared between the
//! measurement runtime, the session core, and the diagnostic CLI. They
//! describe identities, lifecycle states and reports as they appear in logs
//! and JSON output.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond ordering helpers and serialization
//! * Vendor-neutral: Nothing here knows about a concrete measurement SDK
//! * Stable: Field names only change when the JSON report format changes
//!
//! Behavior (state machine, registry, activation) lives in `adverify` and
//! `adverify-runtime`.

pub mod ids;
pub mod lifecycle;
pub mod stats;

pub use ids::*;
pub use lifecycle::*;
pub use stats::*;
