//! Logic for answering path requests. A request made while the map is still settling stays queued
//! and is retried every frame so the schedule is never blocked on the solver
//!

use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// Ask for a path from the current position to the goal
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct EventPathRequest;

/// Waypoints from the current position to the goal
#[derive(Event, Clone, Debug)]
pub struct EventPathComputed {
	/// Shortened path including the start and the goal
	pub waypoints: Vec<GeoCoord>,
	/// Altitude to fly the waypoints at
	pub altitude_meters: f64,
	/// Time to fly the path at the vehicle's top speed
	pub estimated_duration: Option<Duration>,
}

/// A queued request could not be answered
#[derive(Event, Clone, Debug, PartialEq, Eq)]
pub struct EventPathFailed(pub PathError);

/// Whether a path request is waiting on the solver
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct PathRequestQueue {
	/// A request is outstanding
	pending: bool,
	/// Frames the outstanding request has waited
	frames_waited: u64,
}

impl PathRequestQueue {
	/// Is a request outstanding
	pub fn is_pending(&self) -> bool {
		self.pending
	}
	/// Frames the outstanding request has waited
	pub fn get_frames_waited(&self) -> u64 {
		self.frames_waited
	}
}

/// Coalesce incoming requests, several in one frame produce a single path
#[cfg(not(tarpaulin_include))]
pub fn queue_path_requests(
	mut events: EventReader<EventPathRequest>,
	mut queue: ResMut<PathRequestQueue>,
) {
	if events.read().count() > 0 && !queue.pending {
		queue.pending = true;
		queue.frames_waited = 0;
	}
}

/// Try to answer the outstanding request
#[cfg(not(tarpaulin_include))]
pub fn process_path_requests(
	mut queue: ResMut<PathRequestQueue>,
	mut controller: ResMut<MapController>,
	mut event_path: EventWriter<EventPathComputed>,
	mut event_failed: EventWriter<EventPathFailed>,
) {
	if !queue.pending {
		return;
	}
	match controller.get_path_to_destination() {
		Ok(waypoints) => {
			debug!(
				"Path of {} waypoints after {} frames",
				waypoints.len(),
				queue.frames_waited
			);
			queue.pending = false;
			event_path.write(EventPathComputed {
				waypoints,
				altitude_meters: controller.get_config().default_altitude_meters,
				estimated_duration: controller.estimate_flight_time(),
			});
		}
		Err(PathError::MapUnstable) => {
			queue.frames_waited += 1;
		}
		Err(e) => {
			warn!("Path request failed: {}", e);
			queue.pending = false;
			event_failed.write(EventPathFailed(e));
		}
	}
}
