//! Bridge configuration loaded from JSON.
//!
//! ```json
//! {
//!   "partnerName": "Kidoznet",
//!   "partnerVersion": "2.1",
//!   "replacePolicy": "finishPrior"
//! }
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use std::path::Path;

use adverify_protocol::PartnerInfo;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

pub const DEFAULT_PARTNER_NAME: &str = "Kidoznet";
pub const DEFAULT_PARTNER_VERSION: &str = "2.1";

/// What to do when a session is created for a surface that still has a live
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplacePolicy {
	/// Finish the prior session, then install the new one (content reload).
	#[default]
	FinishPrior,
	/// Refuse the new session with [`BridgeError::SurfaceBusy`].
	Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BridgeConfig {
	pub partner_name: String,
	pub partner_version: String,
	pub replace_policy: ReplacePolicy,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			partner_name: DEFAULT_PARTNER_NAME.to_string(),
			partner_version: DEFAULT_PARTNER_VERSION.to_string(),
			replace_policy: ReplacePolicy::default(),
		}
	}
}

impl BridgeConfig {
	pub fn from_json_str(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_file(path: &Path) -> Result<Self> {
		let json = std::fs::read_to_string(path).map_err(|source| BridgeError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_json_str(&json)
	}

	pub fn validate(&self) -> Result<()> {
		if self.partner_name.trim().is_empty() {
			return Err(BridgeError::Config("partnerName must not be empty".to_string()));
		}
		if self.partner_version.trim().is_empty() {
			return Err(BridgeError::Config("partnerVersion must not be empty".to_string()));
		}
		Ok(())
	}

	pub fn partner(&self) -> PartnerInfo {
		PartnerInfo {
			name: self.partner_name.clone(),
			version: self.partner_version.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_object_uses_defaults() {
		let config = BridgeConfig::from_json_str("{}").unwrap();
		assert_eq!(config, BridgeConfig::default());
		assert_eq!(config.partner().to_string(), "Kidoznet/2.1");
	}

	#[test]
	fn parses_camel_case_fields() {
		let config = BridgeConfig::from_json_str(r#"{"partnerName":"Acme","replacePolicy":"reject"}"#).unwrap();
		assert_eq!(config.partner_name, "Acme");
		assert_eq!(config.partner_version, DEFAULT_PARTNER_VERSION);
		assert_eq!(config.replace_policy, ReplacePolicy::Reject);
	}

	#[test]
	fn rejects_unknown_fields() {
		let err = BridgeConfig::from_json_str(r#"{"partner":"Acme"}"#).unwrap_err();
		assert!(matches!(err, BridgeError::Json(_)));
	}

	#[test]
	fn rejects_blank_partner() {
		let err = BridgeConfig::from_json_str(r#"{"partnerName":"  "}"#).unwrap_err();
		assert!(matches!(err, BridgeError::Config(_)));
		assert_eq!(err.to_string(), "invalid configuration: partnerName must not be empty");
	}

	#[test]
	fn from_file_reports_missing_path() {
		let tmp = tempfile::TempDir::new().unwrap();
		let path = tmp.path().join("missing.json");
		let err = BridgeConfig::from_file(&path).unwrap_err();
		assert!(matches!(err, BridgeError::Io { .. }));
	}

	#[test]
	fn from_file_reads_json() {
		let tmp = tempfile::TempDir::new().unwrap();
		let path = tmp.path().join("bridge.json");
		std::fs::write(&path, r#"{"partnerVersion":"3.0"}"#).unwrap();
		let config = BridgeConfig::from_file(&path).unwrap();
		assert_eq!(config.partner_version, "3.0");
	}
}
