//! Defines the Bevy [Plugin] exposing the [MapController] to the rest of an app through events
//!

use std::time::{SystemTime, UNIX_EPOCH};

use crate::prelude::*;
use bevy::prelude::*;

pub mod path_layer;
pub mod zone_layer;

/// Order in which the planner systems run each frame
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Map, goal and position changes
	Inbound,
	/// Zone reports, expiry and readiness
	Tidy,
	/// Path extraction
	Calculate,
}

/// Source of the current [Epoch] used to open and close zone windows
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct PlannerClock {
	/// When set the clock is frozen at this epoch
	fixed: Option<Epoch>,
}

impl PlannerClock {
	/// A clock frozen at `epoch`
	pub fn fixed(epoch: Epoch) -> Self {
		PlannerClock { fixed: Some(epoch) }
	}
	/// Freeze the clock at `epoch`
	pub fn set(&mut self, epoch: Epoch) {
		self.fixed = Some(epoch);
	}
	/// Follow the system clock again
	pub fn release(&mut self) {
		self.fixed = None;
	}
	/// Seconds since the UNIX epoch
	pub fn now(&self) -> Epoch {
		self.fixed.unwrap_or_else(|| {
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map(|d| d.as_secs() as Epoch)
				.unwrap_or_default()
		})
	}
}

/// Inserts a [MapController] built from `config` and drives it from events
#[derive(Default)]
pub struct PathPlannerPlugin {
	/// Configuration handed to the [MapController]
	pub config: PlannerConfig,
}

impl Plugin for PathPlannerPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		let config = match self.config.validate() {
			Ok(()) => self.config.clone(),
			Err(e) => {
				error!("Planner config rejected, using defaults: {}", e);
				PlannerConfig::default()
			}
		};
		app.insert_resource(MapController::new(config))
			.init_resource::<PlannerClock>()
			.init_resource::<path_layer::PathRequestQueue>()
			.add_event::<zone_layer::EventGenerateMap>()
			.add_event::<zone_layer::EventSetGoal>()
			.add_event::<zone_layer::EventSetCurrentPosition>()
			.add_event::<zone_layer::EventAddNoFlightCircle>()
			.add_event::<zone_layer::EventAddNoFlightArea>()
			.add_event::<zone_layer::EventExpectedZoneCount>()
			.add_event::<zone_layer::EventRallyPoints>()
			.add_event::<zone_layer::EventFetchZones>()
			.add_event::<zone_layer::EventFetchRallyPoints>()
			.add_event::<zone_layer::EventBlockedGoal>()
			.add_event::<zone_layer::EventReadiness>()
			.add_event::<path_layer::EventPathRequest>()
			.add_event::<path_layer::EventPathComputed>()
			.add_event::<path_layer::EventPathFailed>()
			.configure_sets(
				Update,
				(
					OrderingSet::Inbound,
					OrderingSet::Tidy,
					OrderingSet::Calculate,
				)
					.chain(),
			)
			.add_systems(
				Update,
				(
					(
						zone_layer::process_map_requests,
						zone_layer::process_goal_updates,
						zone_layer::process_position_updates,
					)
						.chain()
						.in_set(OrderingSet::Inbound),
					(
						zone_layer::process_zone_reports,
						zone_layer::sweep_expired_zones,
						zone_layer::process_rally_points,
						zone_layer::publish_readiness,
					)
						.chain()
						.in_set(OrderingSet::Tidy),
					(
						path_layer::queue_path_requests,
						path_layer::process_path_requests,
					)
						.chain()
						.in_set(OrderingSet::Calculate),
				),
			);
	}
}
