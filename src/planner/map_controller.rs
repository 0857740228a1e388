//! The [MapController] is the single entry point used by the rest of the system. It owns the map,
//! the solver and the reported no-fly zones, and turns the relaxed cost field into waypoints.
//!
//! A path is read by descending the cost field from the node closest to the vehicle. Each step
//! moves to the strictly cheaper neighbour minimising `cost + edge + penalty`, so the walk can never
//! revisit a node and always ends at the goal once the field is stable:
//!
//! ```text
//!  ___________________________
//! |  4.8 |  3.8 |  2.8 |  2.0 |
//! |______|______|______|______|
//! |  4.4 |  X   |  1.4 |  1.0 |
//! |______|______|______|______|
//! |  V   |  X   |  1.0 |  0   |
//! |______|______|______|______|
//! ```

use std::time::Duration;

use bevy::log::{debug, info, warn};
use bevy::prelude::Resource;

use crate::prelude::*;

/// Result of an expiry sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneSweep {
	/// Zones whose window opened and which are now applied
	pub activated: Vec<ZoneId>,
	/// Zones whose window closed and which have been removed
	pub retracted: Vec<ZoneId>,
	/// Newly activated zones covering the path or goal
	pub blocked: Vec<BlockedNotice>,
}

/// Façade over map generation, the solver, the shortener and zone bookkeeping
#[derive(Resource, Debug)]
pub struct MapController {
	/// Tunables
	config: PlannerConfig,
	/// Builds new maps
	generator: MapGenerator,
	/// Simplifies extracted paths
	shortener: PathShortener,
	/// Solver owning the current map, [None] until a map is generated
	solver: Option<PathFinder>,
	/// Base and zone penalties of the current map
	layers: Option<PenaltyLayers>,
	/// Reported zones and readiness
	state: PlannerState,
	/// Goal coordinate last requested
	goal_position: Option<GeoCoord>,
	/// Last accepted vehicle position
	current_position: Option<GeoCoord>,
	/// Last reported point the vehicle is heading towards
	current_heading: Option<GeoCoord>,
	/// Node-by-node path from the last successful extraction
	current_path: Vec<NodeIndex>,
	/// Shortened form of [MapController::current_path]
	shortened_path: Vec<NodeIndex>,
}

impl Default for MapController {
	fn default() -> Self {
		MapController::new(PlannerConfig::default())
	}
}

impl MapController {
	/// Create a controller without a map
	pub fn new(config: PlannerConfig) -> Self {
		MapController {
			generator: MapGenerator::new(&config),
			config,
			shortener: PathShortener::new(),
			solver: None,
			layers: None,
			state: PlannerState::new(),
			goal_position: None,
			current_position: None,
			current_heading: None,
			current_path: Vec::new(),
			shortened_path: Vec::new(),
		}
	}
	/// Get the configuration
	pub fn get_config(&self) -> &PlannerConfig {
		&self.config
	}
	/// Get the solver, if a map exists
	pub fn get_path_finder(&self) -> Option<&PathFinder> {
		self.solver.as_ref()
	}
	/// Get the zone and readiness bookkeeping
	pub fn get_planner_state(&self) -> &PlannerState {
		&self.state
	}
	/// Get the solver or fail with [MapError::NoMap]
	fn solver(&self) -> Result<&PathFinder, MapError> {
		self.solver.as_ref().ok_or(MapError::NoMap)
	}
	/// Build a new map covering `start` to `end`. Any previous map and its solver are discarded,
	/// known zones are laid onto the new map and base penalties start at zero. Nothing changes if
	/// generation fails
	pub fn generate_map(
		&mut self,
		start: GeoCoord,
		end: GeoCoord,
		node_spacing: f64,
		width: f64,
		padding: f64,
	) -> Result<(usize, usize), MapError> {
		let grid = self
			.generator
			.generate_map(start, end, node_spacing, width, padding)?;
		let size = grid.get_size();
		let margin = self.config.zone_expansion_meters;
		let penalty = self.config.no_fly_penalty;
		let mut layers = PenaltyLayers::new(grid.node_count());
		let mut footprints = Vec::with_capacity(self.state.zone_count());
		for zone in self.state.get_zones() {
			let footprint = zone.get_shape().footprint(&grid, margin);
			if zone.get_status() == ZoneStatus::Active {
				for index in footprint.iter() {
					layers.add_zone(grid.try_flat(*index)?, penalty);
				}
			}
			footprints.push((zone.get_id(), footprint));
		}
		let updates: Vec<(NodeIndex, f64)> = (0..grid.node_count())
			.filter(|flat| layers.effective(*flat) != 0.0)
			.map(|flat| (grid.to_index(flat), layers.effective(flat)))
			.collect();
		// no workers exist yet so the burst lands before the first pass
		let solver = PathFinder::new(grid, &self.config);
		solver.update_penalties(&updates)?;
		for (id, footprint) in footprints {
			if let Some(zone) = self.state.get_zone_mut(id) {
				zone.set_footprint(footprint);
			}
		}
		// dropping the old solver joins its threads
		self.solver = Some(solver);
		self.layers = Some(layers);
		self.current_path.clear();
		self.shortened_path.clear();
		info!("Map ready with {} rows and {} columns", size.0, size.1);
		Ok(size)
	}
	/// `(rows, cols)` of the current map
	pub fn get_map_size(&self) -> Option<(usize, usize)> {
		self.solver.as_ref().map(|s| s.get_grid().get_size())
	}
	/// Start the solver towards the node closest to `goal`
	pub fn start_solver(&mut self, goal: GeoCoord) -> Result<NodeIndex, MapError> {
		if !goal.is_finite() {
			return Err(MapError::InvalidCoordinate);
		}
		let solver = self.solver.as_mut().ok_or(MapError::NoMap)?;
		let index = solver.get_grid().get_closest_node_index(&goal);
		solver.start_solver(index)?;
		self.goal_position = Some(goal);
		Ok(index)
	}
	/// Change the goal. A running solver is redirected immediately, otherwise the goal is used by
	/// the next [MapController::start_solver]
	pub fn set_goal_position(&mut self, goal: GeoCoord) -> Result<(), MapError> {
		if !goal.is_finite() {
			return Err(MapError::InvalidCoordinate);
		}
		self.goal_position = Some(goal);
		if let Some(solver) = self.solver.as_mut() {
			if solver.get_goal().is_some() {
				let index = solver.get_grid().get_closest_node_index(&goal);
				solver.start_solver(index)?;
			}
		}
		Ok(())
	}
	/// Get the goal coordinate
	pub fn get_goal_position(&self) -> Option<GeoCoord> {
		self.goal_position
	}
	/// Record where the vehicle is. Moves shorter than the configured minimum are ignored and
	/// report `false`
	pub fn set_current_position(&mut self, position: GeoCoord) -> bool {
		if !position.is_finite() {
			warn!("Ignoring non-finite position {:?}", position);
			return false;
		}
		if let Some(previous) = self.current_position {
			let moved = haversine_distance(&previous, &position, self.config.earth_radius_meters);
			if moved < self.config.minimum_distance_change_meters {
				return false;
			}
		}
		self.current_position = Some(position);
		true
	}
	/// Get the last accepted position
	pub fn get_current_position(&self) -> Option<GeoCoord> {
		self.current_position
	}
	/// Record the point the vehicle is heading towards
	pub fn set_current_heading(&mut self, heading: GeoCoord) {
		self.current_heading = Some(heading);
	}
	/// Get the heading
	pub fn get_current_heading(&self) -> Option<GeoCoord> {
		self.current_heading
	}
	/// Index of the node closest to `coord`
	pub fn get_closest_node_index(&self, coord: &GeoCoord) -> Result<NodeIndex, MapError> {
		Ok(self.solver()?.get_grid().get_closest_node_index(coord))
	}
	/// World coordinate of the node at `(row, col)`
	pub fn get_world_coord_at_index(&self, row: usize, col: usize) -> Result<GeoCoord, MapError> {
		let grid = self.solver()?.get_grid();
		let flat = grid.try_flat(NodeIndex::new(row, col))?;
		Ok(grid.node(flat).get_world_coordinate())
	}
	/// Is the signed `(row, col)` inside the map
	pub fn is_inside_map(&self, row: isize, col: isize) -> bool {
		self.solver
			.as_ref()
			.is_some_and(|s| s.get_grid().is_inside_map(row, col))
	}
	/// Is `coord` within one node spacing of a node of the map
	pub fn contains_coordinate(&self, coord: &GeoCoord) -> bool {
		let Some(solver) = self.solver.as_ref() else {
			return false;
		};
		let grid = solver.get_grid();
		let index = grid.get_closest_node_index(coord);
		grid.get_node(index).is_some_and(|n| {
			n.get_planar_position()
				.distance(&grid.get_projection().to_planar(coord))
				<= grid.get_spacing()
		})
	}
	/// Set the base penalty of one node
	pub fn update_penalty_of_node(&mut self, row: usize, col: usize, penalty: f64) -> Result<(), MapError> {
		if penalty.is_nan() || penalty < 0.0 {
			return Err(MapError::InvalidPenalty(penalty));
		}
		let (Some(solver), Some(layers)) = (self.solver.as_ref(), self.layers.as_mut()) else {
			return Err(MapError::NoMap);
		};
		let index = NodeIndex::new(row, col);
		let flat = solver.get_grid().try_flat(index)?;
		let effective = layers.set_base(flat, penalty);
		solver.update_penalty_of_node(index, effective)
	}
	/// Set the base penalty of every node within `radius_meters` of `center`, returning how many
	/// nodes were touched
	pub fn update_penalty_of_area(
		&mut self,
		center: GeoCoord,
		radius_meters: f64,
		penalty: f64,
	) -> Result<usize, MapError> {
		if penalty.is_nan() || penalty < 0.0 {
			return Err(MapError::InvalidPenalty(penalty));
		}
		if !radius_meters.is_finite() || radius_meters < 0.0 {
			return Err(MapError::InvalidDimension {
				name: "radius",
				value: radius_meters,
			});
		}
		let (Some(solver), Some(layers)) = (self.solver.as_ref(), self.layers.as_mut()) else {
			return Err(MapError::NoMap);
		};
		let grid = solver.get_grid();
		let area = ZoneShape::Circle {
			center,
			radius_meters,
		};
		let updates: Vec<(NodeIndex, f64)> = area
			.footprint(grid, 0.0)
			.into_iter()
			.map(|index| -> Result<(NodeIndex, f64), MapError> {
				let flat = grid.try_flat(index)?;
				Ok((index, layers.set_base(flat, penalty)))
			})
			.collect::<Result<_, MapError>>()?;
		apply_burst(solver, &updates)?;
		debug!("Penalised {} nodes around {:?}", updates.len(), center);
		Ok(updates.len())
	}
	/// Descend the stable cost field from the vehicle to the goal, returning the shortened path as
	/// coordinates. On failure the previously extracted path is kept
	pub fn get_path_to_destination(&mut self) -> Result<Vec<GeoCoord>, PathError> {
		let solver = self.solver.as_ref().ok_or(PathError::NoMap)?;
		let position = self.current_position.ok_or(PathError::PositionNotSet)?;
		let shortener = self.shortener;
		let (raw, shortened, waypoints) = solver.with_stable_field(|grid, goal| {
			let start = grid.get_closest_node_index(&position);
			let raw = make_path_to_destination(grid, start, goal)?;
			let shortened = shortener.shorten_path(&raw, grid);
			let waypoints: Vec<GeoCoord> = shortened
				.iter()
				.filter_map(|i| grid.get_node(*i).map(|n| n.get_world_coordinate()))
				.collect();
			Ok::<_, PathError>((raw, shortened, waypoints))
		})??;
		debug!(
			"Extracted a path of {} nodes shortened to {}",
			raw.len(),
			shortened.len()
		);
		self.current_path = raw;
		self.shortened_path = shortened;
		Ok(waypoints)
	}
	/// Node-by-node path from the last successful extraction
	pub fn get_current_path(&self) -> &[NodeIndex] {
		&self.current_path
	}
	/// Shortened path from the last successful extraction
	pub fn get_shortened_path(&self) -> &[NodeIndex] {
		&self.shortened_path
	}
	/// Time to fly the last shortened path at the vehicle's top speed
	pub fn estimate_flight_time(&self) -> Option<Duration> {
		let grid = self.solver.as_ref()?.get_grid();
		let length: f64 = self
			.shortened_path
			.windows(2)
			.filter_map(|pair| {
				let a = grid.get_node(pair[0])?.get_planar_position();
				let b = grid.get_node(pair[1])?.get_planar_position();
				Some(a.distance(&b))
			})
			.sum();
		Duration::try_from_secs_f64(length / self.config.vehicle_max_speed_mps).ok()
	}
	/// Report a circular no-fly zone
	pub fn add_no_fly_circle(
		&mut self,
		id: Option<ZoneId>,
		center: GeoCoord,
		radius_meters: f64,
		epoch_from: Option<Epoch>,
		epoch_to: Option<Epoch>,
		now: Epoch,
	) -> Result<ZoneReport, MapError> {
		if !center.is_finite() {
			return Err(MapError::InvalidCoordinate);
		}
		if !radius_meters.is_finite() || radius_meters < 0.0 {
			return Err(MapError::InvalidDimension {
				name: "radius",
				value: radius_meters,
			});
		}
		let shape = ZoneShape::Circle {
			center,
			radius_meters,
		};
		self.add_zone(id, shape, epoch_from, epoch_to, now)
	}
	/// Report a polygonal no-fly zone
	pub fn add_no_fly_area(
		&mut self,
		id: Option<ZoneId>,
		vertices: Vec<GeoCoord>,
		epoch_from: Option<Epoch>,
		epoch_to: Option<Epoch>,
		now: Epoch,
	) -> Result<ZoneReport, MapError> {
		if vertices.len() < 3 {
			return Err(MapError::InvalidPolygon(vertices.len()));
		}
		if vertices.iter().any(|v| !v.is_finite()) {
			return Err(MapError::InvalidCoordinate);
		}
		self.add_zone(id, ZoneShape::Polygon { vertices }, epoch_from, epoch_to, now)
	}
	/// Register a zone and apply it if its window is open
	fn add_zone(
		&mut self,
		id: Option<ZoneId>,
		shape: ZoneShape,
		epoch_from: Option<Epoch>,
		epoch_to: Option<Epoch>,
		now: Epoch,
	) -> Result<ZoneReport, MapError> {
		if let Some(existing) = id.and_then(|id| self.state.get_zone(id)) {
			debug!("Ignoring repeated report of zone {:?}", existing.get_id());
			return Ok(ZoneReport {
				id: existing.get_id(),
				created: false,
				status: existing.get_status(),
				nodes_covered: existing.get_footprint().len(),
				blocked: None,
			});
		}
		let id = id.unwrap_or_else(|| self.state.allocate_zone_id());
		let mut zone = DynamicNoFlightZone::new(id, shape, epoch_from, epoch_to);
		if let Some(solver) = self.solver.as_ref() {
			let footprint = zone
				.get_shape()
				.footprint(solver.get_grid(), self.config.zone_expansion_meters);
			zone.set_footprint(footprint);
		}
		let mut blocked = None;
		if zone.is_due(now) {
			self.apply_zone(zone.get_footprint(), true)?;
			zone.set_status(ZoneStatus::Active);
			blocked = self.check_blocked(id, epoch_to, zone.get_footprint());
		}
		let report = ZoneReport {
			id,
			created: true,
			status: zone.get_status(),
			nodes_covered: zone.get_footprint().len(),
			blocked,
		};
		self.state.insert_zone(zone);
		Ok(report)
	}
	/// Remove a zone now, whatever its window says
	pub fn retract_zone(&mut self, id: ZoneId) -> Result<bool, MapError> {
		let Some(zone) = self.state.remove_zone(id) else {
			return Ok(false);
		};
		if zone.get_status() == ZoneStatus::Active {
			self.apply_zone(zone.get_footprint(), false)?;
		}
		info!("Retracted no-fly zone {:?}", id);
		Ok(true)
	}
	/// Activate zones whose window has opened and retract zones whose window has closed
	pub fn sweep_zones(&mut self, now: Epoch) -> Result<ZoneSweep, MapError> {
		let mut sweep = ZoneSweep::default();
		let expired: Vec<ZoneId> = self
			.state
			.get_zones()
			.filter(|z| z.is_expired(now))
			.map(|z| z.get_id())
			.collect();
		for id in expired {
			self.retract_zone(id)?;
			sweep.retracted.push(id);
		}
		let due: Vec<(ZoneId, Option<Epoch>, Vec<NodeIndex>)> = self
			.state
			.get_zones()
			.filter(|z| z.get_status() == ZoneStatus::Pending && z.is_due(now))
			.map(|z| (z.get_id(), z.get_epoch_to(), z.get_footprint().to_vec()))
			.collect();
		for (id, epoch_to, footprint) in due {
			self.apply_zone(&footprint, true)?;
			if let Some(zone) = self.state.get_zone_mut(id) {
				zone.set_status(ZoneStatus::Active);
			}
			info!("Activated no-fly zone {:?}", id);
			if let Some(notice) = self.check_blocked(id, epoch_to, &footprint) {
				sweep.blocked.push(notice);
			}
			sweep.activated.push(id);
		}
		Ok(sweep)
	}
	/// Add or remove the no-fly penalty over `footprint` as one burst
	fn apply_zone(&mut self, footprint: &[NodeIndex], add: bool) -> Result<(), MapError> {
		let (Some(solver), Some(layers)) = (self.solver.as_ref(), self.layers.as_mut()) else {
			return Ok(());
		};
		let penalty = self.config.no_fly_penalty;
		let grid = solver.get_grid();
		let updates: Vec<(NodeIndex, f64)> = footprint
			.iter()
			.map(|index| -> Result<(NodeIndex, f64), MapError> {
				let flat = grid.try_flat(*index)?;
				let effective = if add {
					layers.add_zone(flat, penalty)
				} else {
					layers.remove_zone(flat, penalty)
				};
				Ok((*index, effective))
			})
			.collect::<Result<_, MapError>>()?;
		apply_burst(solver, &updates)
	}
	/// Does `footprint` cover the goal or the last extracted path
	fn check_blocked(
		&mut self,
		zone_id: ZoneId,
		until: Option<Epoch>,
		footprint: &[NodeIndex],
	) -> Option<BlockedNotice> {
		let goal = self.solver.as_ref().and_then(|s| s.get_goal());
		let covers_goal = goal.is_some_and(|g| footprint.contains(&g));
		let covers_path = self.current_path.iter().any(|i| footprint.contains(i));
		if !(covers_goal || covers_path) {
			return None;
		}
		if let Some(until) = until {
			self.state.record_blocked(until);
		}
		warn!("No-fly zone {:?} blocks the route until {:?}", zone_id, until);
		Some(BlockedNotice { zone_id, until })
	}
	/// The zone service announced how many zones it is about to report
	pub fn set_expected_zone_count(&mut self, count: usize, now: Epoch) {
		self.state.set_expected_zone_count(count, now);
	}
	/// Is the map stable and have the announced zones arrived (or waiting for them timed out)
	pub fn is_ready(&mut self, now: Epoch) -> bool {
		let timeout = self.config.readiness_timeout_secs;
		self.is_map_stable() && self.state.initial_zones_loaded(now, timeout)
	}
	/// Replace a blocked goal with the closest usable rally point. A rally point is usable when it
	/// lies on the map and outside every active zone. Returns the chosen point
	pub fn divert_to_rally_point(&mut self, rally_points: &[GeoCoord]) -> Result<Option<GeoCoord>, MapError> {
		let solver = self.solver()?;
		let projection = *solver.get_grid().get_projection();
		let margin = self.config.zone_expansion_meters;
		let reference = self.current_position.or(self.goal_position);
		let mut chosen: Option<(GeoCoord, f64)> = None;
		for point in rally_points.iter().filter(|p| p.is_finite()) {
			if !self.contains_coordinate(point) {
				continue;
			}
			let planar = projection.to_planar(point);
			let blocked = self
				.state
				.get_zones()
				.filter(|z| z.get_status() == ZoneStatus::Active)
				.any(|z| z.get_shape().covers(&planar, &projection, margin));
			if blocked {
				continue;
			}
			let distance = reference.map_or(0.0, |r| haversine_distance(&r, point, self.config.earth_radius_meters));
			if chosen.is_none_or(|(_, best)| distance < best) {
				chosen = Some((*point, distance));
			}
		}
		match chosen {
			Some((point, _)) => {
				info!("Diverting to rally point {:?}", point);
				self.set_goal_position(point)?;
				Ok(Some(point))
			}
			None => {
				warn!("None of {} rally points are usable", rally_points.len());
				Ok(None)
			}
		}
	}
	/// Is the cost field stable
	pub fn is_map_stable(&self) -> bool {
		self.solver.as_ref().is_some_and(|s| s.get_map_stable())
	}
	/// Block until the field is stable or `timeout` elapses
	pub fn wait_for_map_stable_timeout(&self, timeout: Duration) -> bool {
		self.solver
			.as_ref()
			.is_some_and(|s| s.wait_for_map_stable_timeout(timeout))
	}
	/// How long the last stabilisation took
	pub fn get_current_computation_time(&self) -> Option<Duration> {
		self.solver.as_ref().map(|s| s.get_current_computation_time())
	}
	/// Textual dump of the cost field
	pub fn render_cost_map(&self) -> Option<String> {
		self.solver.as_ref().map(|s| s.print_cost_map())
	}
}

/// Apply `updates` with the workers paused so they see the whole burst at once
fn apply_burst(solver: &PathFinder, updates: &[(NodeIndex, f64)]) -> Result<(), MapError> {
	let was_running = solver.is_running();
	solver.pause_solver();
	let result = solver.update_penalties(updates);
	if was_running {
		solver.resume_solver();
	}
	result
}

/// Walk from `start` to `goal` always stepping to the strictly cheaper neighbour that minimises
/// `cost + edge + penalty`
pub fn make_path_to_destination(grid: &Grid, start: NodeIndex, goal: NodeIndex) -> Result<Vec<NodeIndex>, PathError> {
	let stranded = |index: NodeIndex| PathError::Unreachable {
		row: index.get_row(),
		col: index.get_column(),
	};
	let mut flat = grid.to_flat(start).ok_or_else(|| stranded(start))?;
	let goal_flat = grid.to_flat(goal).ok_or(PathError::GoalNotSet)?;
	if grid.node(flat).get_cost().is_infinite() {
		return Err(stranded(start));
	}
	let mut path = vec![start];
	while flat != goal_flat {
		let cost = grid.node(flat).get_cost();
		let mut best: Option<(usize, f64)> = None;
		for (neighbour, distance) in grid.neighbours(flat) {
			let node = grid.node(neighbour);
			let penalty = node.get_penalty();
			let neighbour_cost = node.get_cost();
			if penalty.is_infinite() || neighbour_cost >= cost {
				continue;
			}
			let score = neighbour_cost + distance + penalty;
			if best.is_none_or(|(_, s)| score < s) {
				best = Some((neighbour, score));
			}
		}
		let Some((next, _)) = best else {
			let index = grid.to_index(flat);
			return Err(PathError::LocalMinimum {
				row: index.get_row(),
				col: index.get_column(),
			});
		};
		flat = next;
		path.push(grid.to_index(flat));
	}
	Ok(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	const SETTLE: Duration = Duration::from_secs(10);
	const START: GeoCoord = GeoCoord::new(57.0, 12.0);
	const END: GeoCoord = GeoCoord::new(57.0009, 12.0);

	fn controller() -> MapController {
		let config = PlannerConfig {
			zone_expansion_meters: 0.0,
			..Default::default()
		};
		let mut controller = MapController::new(config);
		controller.generate_map(START, END, 10.0, 60.0, 10.0).unwrap();
		controller
	}

	#[test]
	fn operations_before_map() {
		let mut controller = MapController::default();
		assert_eq!(controller.get_map_size(), None);
		assert_eq!(controller.start_solver(END), Err(MapError::NoMap));
		assert_eq!(controller.update_penalty_of_node(0, 0, 1.0), Err(MapError::NoMap));
		assert_eq!(controller.get_path_to_destination(), Err(PathError::NoMap));
		assert!(!controller.is_inside_map(0, 0));
	}
	#[test]
	fn failed_generation_keeps_previous_map() {
		let mut controller = controller();
		let before = controller.get_map_size();
		let actual = controller.generate_map(START, END, -1.0, 60.0, 10.0);
		assert!(actual.is_err());
		assert_eq!(controller.get_map_size(), before);
	}
	#[test]
	fn rejected_zone_penalty_leaves_state_untouched() {
		let config = PlannerConfig {
			zone_expansion_meters: 0.0,
			no_fly_penalty: -1.0,
			..Default::default()
		};
		let mut controller = MapController::new(config);
		let report = controller
			.add_no_fly_circle(Some(ZoneId(3)), START, 15.0, None, None, 0)
			.unwrap();
		assert_eq!(report.status, ZoneStatus::Active);
		let actual = controller.generate_map(START, END, 10.0, 60.0, 10.0);
		assert_eq!(actual, Err(MapError::InvalidPenalty(-1.0)));
		assert_eq!(controller.get_map_size(), None);
		let zone = controller.get_planner_state().get_zone(ZoneId(3)).unwrap();
		assert!(zone.get_footprint().is_empty());
	}
	#[test]
	fn pending_zone_over_path_reports_blocked() {
		let mut controller = controller();
		controller.start_solver(END).unwrap();
		controller.set_current_position(START);
		assert!(controller.wait_for_map_stable_timeout(SETTLE));
		controller.get_path_to_destination().unwrap();
		let goal = controller.get_closest_node_index(&END).unwrap();
		let crossed = controller.get_current_path()[2];
		assert_ne!(crossed, goal);
		let centre = controller
			.get_world_coord_at_index(crossed.get_row(), crossed.get_column())
			.unwrap();
		let report = controller
			.add_no_fly_circle(None, centre, 1.0, Some(100), Some(200), 50)
			.unwrap();
		assert_eq!(report.status, ZoneStatus::Pending);
		assert_eq!(report.blocked, None);
		let sweep = controller.sweep_zones(100).unwrap();
		assert_eq!(sweep.activated, vec![report.id]);
		let result = vec![BlockedNotice {
			zone_id: report.id,
			until: Some(200),
		}];
		assert_eq!(sweep.blocked, result);
		assert_eq!(controller.get_planner_state().get_blocked_until(), Some(200));
	}
	#[test]
	fn path_requires_position() {
		let mut controller = controller();
		controller.start_solver(END).unwrap();
		assert!(controller.wait_for_map_stable_timeout(SETTLE));
		assert_eq!(controller.get_path_to_destination(), Err(PathError::PositionNotSet));
	}
	#[test]
	fn straight_path_in_open_corridor() {
		let mut controller = controller();
		controller.start_solver(END).unwrap();
		controller.set_current_position(START);
		assert!(controller.wait_for_map_stable_timeout(SETTLE));
		let actual = controller.get_path_to_destination().unwrap();
		assert_eq!(actual.len(), 2);
		let raw = controller.get_current_path();
		assert_eq!(raw.first(), Some(&controller.get_closest_node_index(&START).unwrap()));
		assert_eq!(raw.last(), Some(&controller.get_closest_node_index(&END).unwrap()));
		assert!(controller.estimate_flight_time().unwrap() > Duration::ZERO);
	}
	#[test]
	fn small_moves_ignored() {
		let mut controller = MapController::default();
		assert!(controller.set_current_position(START));
		assert!(!controller.set_current_position(GeoCoord::new(57.000001, 12.0)));
		assert!(controller.set_current_position(END));
		assert_eq!(controller.get_current_position(), Some(END));
	}
	#[test]
	fn world_coord_lookup() {
		let controller = controller();
		let coord = controller.get_world_coord_at_index(1, 3).unwrap();
		let actual = controller.get_closest_node_index(&coord).unwrap();
		assert_eq!(actual, NodeIndex::new(1, 3));
		let (rows, _) = controller.get_map_size().unwrap();
		assert_eq!(
			controller.get_world_coord_at_index(rows, 0),
			Err(MapError::IndexOutOfBounds { row: rows, col: 0 })
		);
	}
	#[test]
	fn wall_forces_detour() {
		let mut controller = controller();
		let (rows, cols) = controller.get_map_size().unwrap();
		let wall = rows / 2;
		for col in 0..cols - 1 {
			controller.update_penalty_of_node(wall, col, f64::INFINITY).unwrap();
		}
		controller.start_solver(END).unwrap();
		controller.set_current_position(START);
		assert!(controller.wait_for_map_stable_timeout(SETTLE));
		controller.get_path_to_destination().unwrap();
		let raw = controller.get_current_path();
		assert!(raw.contains(&NodeIndex::new(wall, cols - 1)));
		assert!(controller.get_shortened_path().len() > 2);
	}
	#[test]
	fn sealed_goal_unreachable() {
		let mut controller = controller();
		let (rows, cols) = controller.get_map_size().unwrap();
		let wall = rows / 2;
		for col in 0..cols {
			controller.update_penalty_of_node(wall, col, f64::INFINITY).unwrap();
		}
		controller.start_solver(END).unwrap();
		controller.set_current_position(START);
		assert!(controller.wait_for_map_stable_timeout(SETTLE));
		let actual = controller.get_path_to_destination();
		assert!(matches!(actual, Err(PathError::Unreachable { .. })));
		assert!(controller.get_current_path().is_empty());
	}
	#[test]
	fn area_penalty_counts_nodes() {
		let mut controller = controller();
		let centre = controller.get_world_coord_at_index(4, 3).unwrap();
		let actual = controller.update_penalty_of_area(centre, 10.5, 5.0).unwrap();
		assert_eq!(actual, 5);
	}
	#[test]
	fn repeated_zone_ignored() {
		let mut controller = controller();
		let centre = controller.get_world_coord_at_index(4, 3).unwrap();
		let first = controller
			.add_no_fly_circle(Some(ZoneId(7)), centre, 10.5, None, None, 0)
			.unwrap();
		assert!(first.created);
		assert_eq!(first.status, ZoneStatus::Active);
		assert_eq!(first.nodes_covered, 5);
		let second = controller
			.add_no_fly_circle(Some(ZoneId(7)), centre, 50.0, None, None, 0)
			.unwrap();
		assert!(!second.created);
		assert_eq!(second.nodes_covered, 5);
	}
	#[test]
	fn zone_lifecycle() {
		let mut controller = controller();
		let centre = controller.get_world_coord_at_index(4, 3).unwrap();
		let flat = NodeIndex::new(4, 3);
		let report = controller
			.add_no_fly_circle(None, centre, 1.0, Some(100), Some(200), 50)
			.unwrap();
		assert_eq!(report.status, ZoneStatus::Pending);
		let penalty = |c: &MapController| {
			c.get_path_finder()
				.unwrap()
				.get_grid()
				.get_node(flat)
				.unwrap()
				.get_penalty()
		};
		assert_eq!(penalty(&controller), 0.0);
		let sweep = controller.sweep_zones(100).unwrap();
		assert_eq!(sweep.activated, vec![report.id]);
		assert!(penalty(&controller).is_infinite());
		let sweep = controller.sweep_zones(201).unwrap();
		assert_eq!(sweep.retracted, vec![report.id]);
		assert_eq!(penalty(&controller), 0.0);
		assert_eq!(controller.get_planner_state().zone_count(), 0);
	}
	#[test]
	fn overlapping_zone_survives_retraction() {
		let mut controller = controller();
		let centre = controller.get_world_coord_at_index(4, 3).unwrap();
		controller
			.add_no_fly_circle(Some(ZoneId(1)), centre, 1.0, None, Some(10), 0)
			.unwrap();
		controller
			.add_no_fly_circle(Some(ZoneId(2)), centre, 1.0, None, None, 0)
			.unwrap();
		controller.sweep_zones(11).unwrap();
		let actual = controller
			.get_path_finder()
			.unwrap()
			.get_grid()
			.get_node(NodeIndex::new(4, 3))
			.unwrap()
			.get_penalty();
		assert!(actual.is_infinite());
	}
	#[test]
	fn base_penalty_restored_after_zone() {
		let mut controller = controller();
		controller.update_penalty_of_node(4, 3, 2.5).unwrap();
		let centre = controller.get_world_coord_at_index(4, 3).unwrap();
		let report = controller
			.add_no_fly_circle(None, centre, 1.0, None, None, 0)
			.unwrap();
		controller.retract_zone(report.id).unwrap();
		let actual = controller
			.get_path_finder()
			.unwrap()
			.get_grid()
			.get_node(NodeIndex::new(4, 3))
			.unwrap()
			.get_penalty();
		assert_eq!(actual, 2.5);
	}
	#[test]
	fn zone_on_goal_reports_blocked() {
		let mut controller = controller();
		let goal = controller.start_solver(END).unwrap();
		let centre = controller
			.get_world_coord_at_index(goal.get_row(), goal.get_column())
			.unwrap();
		let report = controller
			.add_no_fly_circle(None, centre, 5.0, None, Some(500), 0)
			.unwrap();
		let result = Some(BlockedNotice {
			zone_id: report.id,
			until: Some(500),
		});
		assert_eq!(report.blocked, result);
		assert_eq!(controller.get_planner_state().get_blocked_until(), Some(500));
	}
	#[test]
	fn zones_survive_regeneration() {
		let mut controller = controller();
		let centre = controller.get_world_coord_at_index(4, 3).unwrap();
		controller
			.add_no_fly_circle(None, centre, 1.0, None, None, 0)
			.unwrap();
		controller.generate_map(START, END, 10.0, 60.0, 10.0).unwrap();
		let actual = controller
			.get_path_finder()
			.unwrap()
			.get_grid()
			.get_node(NodeIndex::new(4, 3))
			.unwrap()
			.get_penalty();
		assert!(actual.is_infinite());
	}
	#[test]
	fn readiness_waits_for_zones() {
		let mut controller = controller();
		controller.start_solver(END).unwrap();
		assert!(controller.wait_for_map_stable_timeout(SETTLE));
		controller.set_expected_zone_count(1, 0);
		assert!(!controller.is_ready(0));
		let centre = controller.get_world_coord_at_index(0, 0).unwrap();
		controller
			.add_no_fly_circle(None, centre, 1.0, None, None, 0)
			.unwrap();
		assert!(controller.wait_for_map_stable_timeout(SETTLE));
		assert!(controller.is_ready(0));
	}
	#[test]
	fn rally_point_avoids_zones() {
		let mut controller = controller();
		controller.start_solver(END).unwrap();
		let blocked = controller.get_world_coord_at_index(5, 1).unwrap();
		let open = controller.get_world_coord_at_index(5, 5).unwrap();
		controller
			.add_no_fly_circle(None, blocked, 5.0, None, None, 0)
			.unwrap();
		let far_away = GeoCoord::new(10.0, 10.0);
		let actual = controller
			.divert_to_rally_point(&[far_away, blocked, open])
			.unwrap();
		assert_eq!(actual, Some(open));
		assert_eq!(controller.get_goal_position(), Some(open));
	}
	#[test]
	fn descent_on_test_map() {
		let grid = MapGenerator::generate_test_map(3, 3, 1.0);
		grid.reseed(0);
		grid.node(1).set_cost(1.0, 0);
		grid.node(3).set_cost(1.0, 0);
		grid.node(4).set_cost(std::f64::consts::SQRT_2, 0);
		let actual = make_path_to_destination(&grid, NodeIndex::new(1, 1), NodeIndex::new(0, 0)).unwrap();
		assert_eq!(actual, vec![NodeIndex::new(1, 1), NodeIndex::new(0, 0)]);
	}
	#[test]
	fn descent_local_minimum() {
		let grid = MapGenerator::generate_test_map(1, 3, 1.0);
		grid.reseed(0);
		grid.node(2).set_cost(2.0, 1);
		// (0, 1) never relaxed so (0, 2) has nowhere cheaper to go
		let actual = make_path_to_destination(&grid, NodeIndex::new(0, 2), NodeIndex::new(0, 0));
		assert_eq!(actual, Err(PathError::LocalMinimum { row: 0, col: 2 }));
	}
}
