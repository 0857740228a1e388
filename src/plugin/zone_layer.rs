//! Logic for feeding maps, goals, positions and no-fly zones into the [MapController] and for
//! reporting readiness and blocked goals back out
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Request a new map spanning `start` to `end`. Once built the solver is started towards `end`
#[derive(Event, Clone, Copy, Debug)]
pub struct EventGenerateMap {
	/// Where the vehicle sets off from
	pub start: GeoCoord,
	/// Where the vehicle is going
	pub end: GeoCoord,
	/// Metres between neighbouring nodes
	pub node_spacing: f64,
	/// Metres across the corridor
	pub width: f64,
	/// Metres the corridor extends beyond both ends
	pub padding: f64,
}

/// Change the goal
#[derive(Event, Clone, Copy, Debug)]
pub struct EventSetGoal(pub GeoCoord);

/// Report where the vehicle is and optionally where it is heading
#[derive(Event, Clone, Copy, Debug)]
pub struct EventSetCurrentPosition {
	/// Current position
	pub position: GeoCoord,
	/// Point the vehicle is heading towards
	pub heading: Option<GeoCoord>,
}

/// Report a circular no-fly zone
#[derive(Event, Clone, Copy, Debug)]
pub struct EventAddNoFlightCircle {
	/// Identifier from the reporter, one is allocated when [None]
	pub id: Option<ZoneId>,
	/// Centre of the zone
	pub center: GeoCoord,
	/// Radius in metres
	pub radius_meters: f64,
	/// Start of the validity window
	pub epoch_from: Option<Epoch>,
	/// End of the validity window
	pub epoch_to: Option<Epoch>,
}

/// Report a polygonal no-fly zone
#[derive(Event, Clone, Debug)]
pub struct EventAddNoFlightArea {
	/// Identifier from the reporter, one is allocated when [None]
	pub id: Option<ZoneId>,
	/// Corners of the zone
	pub vertices: Vec<GeoCoord>,
	/// Start of the validity window
	pub epoch_from: Option<Epoch>,
	/// End of the validity window
	pub epoch_to: Option<Epoch>,
}

/// The zone service announces how many zones it is about to report
#[derive(Event, Clone, Copy, Debug)]
pub struct EventExpectedZoneCount(pub usize);

/// Candidate rally points to divert to after the goal was blocked
#[derive(Event, Clone, Debug)]
pub struct EventRallyPoints(pub Vec<GeoCoord>);

/// A map was generated, the zone service should report every zone it knows
#[derive(Event, Clone, Copy, Debug)]
pub struct EventFetchZones;

/// The goal is blocked, the rally point service should offer alternatives
#[derive(Event, Clone, Copy, Debug)]
pub struct EventFetchRallyPoints;

/// A newly applied zone blocks the route or the goal
#[derive(Event, Clone, Copy, Debug)]
pub struct EventBlockedGoal(pub BlockedNotice);

/// Readiness of the planner changed
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventReadiness(pub bool);

/// Build maps and start the solver towards their end
#[cfg(not(tarpaulin_include))]
pub fn process_map_requests(
	mut events: EventReader<EventGenerateMap>,
	mut controller: ResMut<MapController>,
	mut event_fetch: EventWriter<EventFetchZones>,
) {
	for event in events.read() {
		let generated = controller.generate_map(
			event.start,
			event.end,
			event.node_spacing,
			event.width,
			event.padding,
		);
		match generated.and_then(|_| controller.start_solver(event.end)) {
			Ok(goal) => {
				debug!("Map generated, solving towards {:?}", goal);
				event_fetch.write(EventFetchZones);
			}
			Err(e) => error!("Map request rejected: {}", e),
		}
	}
}

/// Redirect the solver, starting it if the map has never been solved
#[cfg(not(tarpaulin_include))]
pub fn process_goal_updates(
	mut events: EventReader<EventSetGoal>,
	mut controller: ResMut<MapController>,
) {
	for event in events.read() {
		let unsolved = controller
			.get_path_finder()
			.is_some_and(|s| s.get_goal().is_none());
		let result = if unsolved {
			controller.start_solver(event.0).map(|_| ())
		} else {
			controller.set_goal_position(event.0)
		};
		if let Err(e) = result {
			error!("Goal {:?} rejected: {}", event.0, e);
		}
	}
}

/// Record vehicle positions and headings
#[cfg(not(tarpaulin_include))]
pub fn process_position_updates(
	mut events: EventReader<EventSetCurrentPosition>,
	mut controller: ResMut<MapController>,
) {
	for event in events.read() {
		if controller.set_current_position(event.position) {
			trace!("Position updated to {:?}", event.position);
		}
		if let Some(heading) = event.heading {
			controller.set_current_heading(heading);
		}
	}
}

/// Register reported zones and announce any that block the goal
#[cfg(not(tarpaulin_include))]
#[allow(clippy::too_many_arguments)]
pub fn process_zone_reports(
	mut circles: EventReader<EventAddNoFlightCircle>,
	mut areas: EventReader<EventAddNoFlightArea>,
	mut counts: EventReader<EventExpectedZoneCount>,
	mut controller: ResMut<MapController>,
	clock: Res<PlannerClock>,
	mut event_blocked: EventWriter<EventBlockedGoal>,
	mut event_rally: EventWriter<EventFetchRallyPoints>,
) {
	let now = clock.now();
	for event in counts.read() {
		controller.set_expected_zone_count(event.0, now);
	}
	let mut reports = Vec::new();
	for event in circles.read() {
		reports.push(controller.add_no_fly_circle(
			event.id,
			event.center,
			event.radius_meters,
			event.epoch_from,
			event.epoch_to,
			now,
		));
	}
	for event in areas.read() {
		reports.push(controller.add_no_fly_area(
			event.id,
			event.vertices.clone(),
			event.epoch_from,
			event.epoch_to,
			now,
		));
	}
	for report in reports {
		match report {
			Ok(report) => {
				if let Some(notice) = report.blocked {
					event_blocked.write(EventBlockedGoal(notice));
					event_rally.write(EventFetchRallyPoints);
				}
			}
			Err(e) => warn!("Zone report rejected: {}", e),
		}
	}
}

/// Open and close zone windows
#[cfg(not(tarpaulin_include))]
pub fn sweep_expired_zones(
	mut controller: ResMut<MapController>,
	clock: Res<PlannerClock>,
	mut event_blocked: EventWriter<EventBlockedGoal>,
	mut event_rally: EventWriter<EventFetchRallyPoints>,
) {
	if controller.get_planner_state().zone_count() == 0 {
		return;
	}
	match controller.sweep_zones(clock.now()) {
		Ok(sweep) => {
			for notice in sweep.blocked {
				event_blocked.write(EventBlockedGoal(notice));
				event_rally.write(EventFetchRallyPoints);
			}
		}
		Err(e) => error!("Zone sweep failed: {}", e),
	}
}

/// Divert to the best offered rally point
#[cfg(not(tarpaulin_include))]
pub fn process_rally_points(
	mut events: EventReader<EventRallyPoints>,
	mut controller: ResMut<MapController>,
) {
	for event in events.read() {
		if let Err(e) = controller.divert_to_rally_point(&event.0) {
			error!("Rally points rejected: {}", e);
		}
	}
}

/// Announce changes of readiness
#[cfg(not(tarpaulin_include))]
pub fn publish_readiness(
	mut controller: ResMut<MapController>,
	clock: Res<PlannerClock>,
	mut last: Local<Option<bool>>,
	mut event_ready: EventWriter<EventReadiness>,
) {
	let ready = controller.is_ready(clock.now());
	if *last != Some(ready) {
		info!("Planner ready: {}", ready);
		*last = Some(ready);
		event_ready.write(EventReadiness(ready));
	}
}
