//! `adverify` diagnostics CLI.
//!
//! Prints the partner identity the bridge reports and replays scripted ad
//! lifecycles against the recording measurement SDK, emitting one JSON
//! result envelope on stdout per invocation.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod script;
