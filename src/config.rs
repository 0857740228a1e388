//! Tunable constants of the planner.
//!
//! Every field has a default so a `ron` file only needs to name the values it changes:
//!
//! ```ron
//! (
//! 	zone_expansion_meters: 25.0,
//! 	collection_rows: 4,
//! 	collection_cols: 2,
//! 	readiness_timeout_secs: Some(30),
//! )
//! ```

use std::time::Duration;

use crate::prelude::*;

/// Settings shared by the map generator, the solver and the controller
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerConfig {
	/// Radius of the Earth in metres
	pub earth_radius_meters: f64,
	/// Position updates closer than this to the last accepted position are ignored
	pub minimum_distance_change_meters: f64,
	/// Top speed of the vehicle, used to estimate how long a path takes to fly
	pub vehicle_max_speed_mps: f64,
	/// Reported no-fly zones are grown by this margin before being applied
	pub zone_expansion_meters: f64,
	/// Altitude attached to waypoints handed to the vehicle
	pub default_altitude_meters: f64,
	/// Penalty applied to nodes covered by a no-fly zone
	pub no_fly_penalty: f64,
	/// Largest map that may be generated
	pub max_node_count: usize,
	/// Number of horizontal bands the grid is split into for the solver workers
	pub collection_rows: usize,
	/// Number of vertical bands the grid is split into for the solver workers
	pub collection_cols: usize,
	/// How often the monitor checks whether the map has stabilised
	pub monitor_poll_interval_ms: u64,
	/// How long an idle worker sleeps before looking for work again
	pub worker_idle_interval_ms: u64,
	/// After this many seconds the planner stops waiting for announced zones and declares itself
	/// ready, [None] waits indefinitely
	pub readiness_timeout_secs: Option<u64>,
}

impl Default for PlannerConfig {
	fn default() -> Self {
		PlannerConfig {
			earth_radius_meters: 6_371_000.0,
			minimum_distance_change_meters: 1.0,
			vehicle_max_speed_mps: 50.0,
			zone_expansion_meters: 10.0,
			default_altitude_meters: 20.0,
			no_fly_penalty: IMPASSABLE,
			max_node_count: 1_000_000,
			collection_rows: 2,
			collection_cols: 2,
			monitor_poll_interval_ms: 5,
			worker_idle_interval_ms: 20,
			readiness_timeout_secs: None,
		}
	}
}

impl PlannerConfig {
	/// Interval between monitor checks
	pub fn monitor_poll_interval(&self) -> Duration {
		Duration::from_millis(self.monitor_poll_interval_ms.max(1))
	}
	/// Interval an idle worker sleeps for
	pub fn worker_idle_interval(&self) -> Duration {
		Duration::from_millis(self.worker_idle_interval_ms.max(1))
	}
	/// Number of solver workers the config will spawn for a map of `rows` x `cols`
	pub fn worker_count(&self, rows: usize, cols: usize) -> usize {
		self.collection_rows.clamp(1, rows.max(1)) * self.collection_cols.clamp(1, cols.max(1))
	}
	/// Check that every value is usable
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(self.earth_radius_meters.is_finite() && self.earth_radius_meters > 0.0) {
			return Err(ConfigError::Invalid(format!(
				"earth_radius_meters must be positive, got {}",
				self.earth_radius_meters
			)));
		}
		if self.minimum_distance_change_meters.is_nan() || self.minimum_distance_change_meters < 0.0 {
			return Err(ConfigError::Invalid(format!(
				"minimum_distance_change_meters must be non-negative, got {}",
				self.minimum_distance_change_meters
			)));
		}
		if self.zone_expansion_meters.is_nan() || self.zone_expansion_meters < 0.0 {
			return Err(ConfigError::Invalid(format!(
				"zone_expansion_meters must be non-negative, got {}",
				self.zone_expansion_meters
			)));
		}
		if self.no_fly_penalty.is_nan() || self.no_fly_penalty < 0.0 {
			return Err(ConfigError::Invalid(format!(
				"no_fly_penalty must be non-negative, got {}",
				self.no_fly_penalty
			)));
		}
		if self.collection_rows == 0 || self.collection_cols == 0 {
			return Err(ConfigError::Invalid(
				"collection_rows and collection_cols must be at least 1".to_string(),
			));
		}
		if self.max_node_count == 0 {
			return Err(ConfigError::Invalid(
				"max_node_count must be at least 1".to_string(),
			));
		}
		Ok(())
	}
	/// From a `ron` file load and validate a [PlannerConfig]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
		let file = std::fs::File::open(path)?;
		let config: PlannerConfig = ron::de::from_reader(file)?;
		config.validate()?;
		Ok(config)
	}
	/// From a `ron` string load and validate a [PlannerConfig]
	#[cfg(feature = "ron")]
	pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
		let config: PlannerConfig = ron::from_str(ron)?;
		config.validate()?;
		Ok(config)
	}
}
