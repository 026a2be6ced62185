use std::sync::Arc;

use adverify::{BridgeConfig, BridgeService, ReplacePolicy};
use adverify_runtime::fake::RecordingSdk;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerReport {
	pub name: String,
	pub version: String,
	pub replace_policy: ReplacePolicy,
}

/// Partner identity as the bridge reports it. Does not activate anything.
pub(super) fn run(config: &BridgeConfig) -> Result<PartnerReport> {
	let bridge = BridgeService::new(config, Arc::new(RecordingSdk::new()))?;
	Ok(PartnerReport {
		name: bridge.partner_identity().to_string(),
		version: bridge.partner_version().to_string(),
		replace_policy: config.replace_policy,
	})
}
