use std::collections::BTreeMap;
use std::sync::Arc;

use adverify::{BridgeConfig, BridgeService, LifecycleDriver, PartnerInfo, PhaseOutcome, RenderingSurface, StatsSnapshot, SurfaceId};
use adverify_runtime::fake::{FakeSurface, RecordingSdk, SdkCall};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ReplayArgs;
use crate::error::{CliError, Result};
use crate::script::{EventKind, ReplayScript};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
	pub partner: PartnerInfo,
	pub steps: Vec<ReplayStep>,
	pub sdk_calls: Vec<SdkCall>,
	pub live_surfaces: Vec<SurfaceId>,
	pub stats: StatsSnapshot,
}

/// Result of one script event. Exactly one of `outcome` and `error` is set.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStep {
	pub index: usize,
	pub surface: SurfaceId,
	pub event: EventKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub outcome: Option<PhaseOutcome>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Replays a script through a fresh bridge backed by the recording SDK.
///
/// Bridge errors on individual events (a blank surface at `loaded`, a busy
/// surface under the reject policy) are recorded on the step and the replay
/// continues.
pub(super) fn run(config: &BridgeConfig, args: &ReplayArgs) -> Result<ReplayReport> {
	let script = ReplayScript::from_file(&args.script)?;

	let mut sdk = RecordingSdk::builder();
	if args.fail_activation {
		sdk = sdk.fail_activation();
	}
	if args.refuse_sessions {
		sdk = sdk.refuse_sessions();
	}
	let sdk = sdk.build();

	let bridge = Arc::new(BridgeService::new(config, Arc::new(sdk.clone()))?);
	let mut driver = LifecycleDriver::new(Arc::clone(&bridge));

	let surfaces: BTreeMap<u64, Arc<FakeSurface>> = script
		.surfaces
		.iter()
		.map(|spec| {
			let surface = if spec.blank {
				FakeSurface::blank(spec.id)
			} else {
				FakeSurface::new(spec.id, spec.location.as_deref())
			};
			(spec.id, surface)
		})
		.collect();

	let mut steps = Vec::with_capacity(script.events.len());
	for (index, event) in script.events.iter().enumerate() {
		let fake = surfaces.get(&event.surface).ok_or_else(|| CliError::Script {
			path: args.script.clone(),
			message: format!("event {index} names unknown surface {}", event.surface),
		})?;

		let result = match event.event {
			EventKind::Phase(phase) => {
				let surface: Arc<dyn RenderingSurface> = Arc::clone(fake) as Arc<dyn RenderingSurface>;
				driver.on_phase(&surface, phase)
			}
			EventKind::Destroyed => {
				fake.destroy();
				Ok(driver.on_surface_destroyed(fake.surface_id()))
			}
		};

		let step = match result {
			Ok(outcome) => ReplayStep {
				index,
				surface: SurfaceId(event.surface),
				event: event.event,
				outcome: Some(outcome),
				error: None,
			},
			Err(err) => {
				warn!(target: "adverify.cli", index, surface = event.surface, event = %event.event, error = %err, "replay step failed");
				ReplayStep {
					index,
					surface: SurfaceId(event.surface),
					event: event.event,
					outcome: None,
					error: Some(err.to_string()),
				}
			}
		};
		steps.push(step);
	}

	let stats = bridge.stats();
	info!(
		target: "adverify.cli",
		steps = steps.len(),
		created = stats.sessions_created,
		live = stats.live,
		"replay complete"
	);

	Ok(ReplayReport {
		partner: bridge.partner().clone(),
		steps,
		sdk_calls: sdk.calls(),
		live_surfaces: bridge.manager().registry().live_surfaces(),
		stats,
	})
}
