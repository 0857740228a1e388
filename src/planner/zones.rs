//! Dynamic no-fly zones reported while the vehicle is in the air.
//!
//! A zone is a circle or polygon with an optional validity window. Its footprint, the nodes it
//! covers once grown by the safety margin, carries the no-fly penalty for as long as the zone is
//! active:
//!
//! ```text
//!   report --> Pending --(epoch_from reached)--> Active --(epoch_to passed)--> retracted
//!                 \______________________________/^
//!                      window already open
//! ```
//!
//! Penalties of overlapping zones stack in [PenaltyLayers] so that retracting one zone never clears a
//! node still covered by another.

use std::collections::BTreeMap;

use bevy::log::{info, warn};

use crate::prelude::*;

/// Seconds since the UNIX epoch
pub type Epoch = i64;

/// Identifier of a no-fly zone, either supplied by the reporter or allocated by the planner
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ZoneId(pub u64);

/// Outline of a no-fly zone
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum ZoneShape {
	/// Everything within `radius_meters` of `center`
	Circle {
		/// Centre of the circle
		center: GeoCoord,
		/// Radius in metres
		radius_meters: f64,
	},
	/// The area enclosed by `vertices`, implicitly closed
	Polygon {
		/// Corners in order
		vertices: Vec<GeoCoord>,
	},
}

impl ZoneShape {
	/// Does the shape, grown by `margin` metres, cover `point`
	pub fn covers(&self, point: &PlanarPoint, projection: &LocalProjection, margin: f64) -> bool {
		match self {
			ZoneShape::Circle {
				center,
				radius_meters,
			} => projection.to_planar(center).distance(point) <= radius_meters + margin,
			ZoneShape::Polygon { vertices } => {
				let outline: Vec<PlanarPoint> = vertices.iter().map(|v| projection.to_planar(v)).collect();
				point_in_polygon(point, &outline) || distance_to_polygon_edge(point, &outline) <= margin
			}
		}
	}
	/// Indices of every node of `grid` the shape covers once grown by `margin` metres
	pub fn footprint(&self, grid: &Grid, margin: f64) -> Vec<NodeIndex> {
		let projection = grid.get_projection();
		match self {
			ZoneShape::Circle {
				center,
				radius_meters,
			} => {
				let centre = projection.to_planar(center);
				let reach = radius_meters + margin;
				grid.get_nodes()
					.iter()
					.filter(|n| n.get_planar_position().distance(&centre) <= reach)
					.map(|n| n.get_index())
					.collect()
			}
			ZoneShape::Polygon { vertices } => {
				// project once rather than per node
				let outline: Vec<PlanarPoint> = vertices.iter().map(|v| projection.to_planar(v)).collect();
				grid.get_nodes()
					.iter()
					.filter(|n| {
						let p = n.get_planar_position();
						point_in_polygon(&p, &outline) || distance_to_polygon_edge(&p, &outline) <= margin
					})
					.map(|n| n.get_index())
					.collect()
			}
		}
	}
}

/// Whether a zone currently contributes its penalty
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneStatus {
	/// Reported but its window has not opened yet
	Pending,
	/// Applied to the map
	Active,
}

/// A reported no-fly zone
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicNoFlightZone {
	/// Identifier
	id: ZoneId,
	/// Outline
	shape: ZoneShape,
	/// Start of the validity window, [None] is always
	epoch_from: Option<Epoch>,
	/// End of the validity window, [None] is never
	epoch_to: Option<Epoch>,
	/// Applied or waiting
	status: ZoneStatus,
	/// Nodes carrying this zone's penalty while active
	footprint: Vec<NodeIndex>,
}

impl DynamicNoFlightZone {
	/// Create a pending zone
	pub fn new(id: ZoneId, shape: ZoneShape, epoch_from: Option<Epoch>, epoch_to: Option<Epoch>) -> Self {
		DynamicNoFlightZone {
			id,
			shape,
			epoch_from,
			epoch_to,
			status: ZoneStatus::Pending,
			footprint: Vec::new(),
		}
	}
	/// Get the ID
	pub fn get_id(&self) -> ZoneId {
		self.id
	}
	/// Get the outline
	pub fn get_shape(&self) -> &ZoneShape {
		&self.shape
	}
	/// Get the start of the window
	pub fn get_epoch_from(&self) -> Option<Epoch> {
		self.epoch_from
	}
	/// Get the end of the window
	pub fn get_epoch_to(&self) -> Option<Epoch> {
		self.epoch_to
	}
	/// Get the status
	pub fn get_status(&self) -> ZoneStatus {
		self.status
	}
	/// Get the covered nodes of the current map
	pub fn get_footprint(&self) -> &[NodeIndex] {
		&self.footprint
	}
	/// Has the window opened by `now`
	pub fn has_started(&self, now: Epoch) -> bool {
		self.epoch_from.is_none_or(|from| from <= now)
	}
	/// Has the window closed by `now`
	pub fn is_expired(&self, now: Epoch) -> bool {
		self.epoch_to.is_some_and(|to| now > to)
	}
	/// Should the zone be applied at `now`
	pub fn is_due(&self, now: Epoch) -> bool {
		self.has_started(now) && !self.is_expired(now)
	}
	/// Replace the footprint
	pub(crate) fn set_footprint(&mut self, footprint: Vec<NodeIndex>) {
		self.footprint = footprint;
	}
	/// Replace the status
	pub(crate) fn set_status(&mut self, status: ZoneStatus) {
		self.status = status;
	}
}

/// Raised when a newly applied zone covers the planned path or the goal
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockedNotice {
	/// The zone in the way
	pub zone_id: ZoneId,
	/// When the zone lapses, [None] if it never does
	pub until: Option<Epoch>,
}

/// Outcome of reporting a zone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneReport {
	/// The zone's identifier
	pub id: ZoneId,
	/// `false` if the ID was already known and the report was ignored
	pub created: bool,
	/// Status after the report
	pub status: ZoneStatus,
	/// Number of nodes the zone covers on the current map
	pub nodes_covered: usize,
	/// Set if the zone blocks the current path or goal
	pub blocked: Option<BlockedNotice>,
}

/// Per node penalty composed of a base value and the contributions of active zones
#[derive(Clone, Debug)]
pub struct PenaltyLayers {
	/// Penalty set directly on the node
	base: Vec<f64>,
	/// Sum of finite zone penalties
	zone_sum: Vec<f64>,
	/// Number of finite zone penalties contributing to [PenaltyLayers::zone_sum]
	zone_count: Vec<u32>,
	/// Number of infinite zone penalties
	zone_blocking: Vec<u32>,
}

impl PenaltyLayers {
	/// Create layers for `node_count` nodes with no penalty
	pub fn new(node_count: usize) -> Self {
		PenaltyLayers {
			base: vec![0.0; node_count],
			zone_sum: vec![0.0; node_count],
			zone_count: vec![0; node_count],
			zone_blocking: vec![0; node_count],
		}
	}
	/// Penalty the solver should see for `flat`
	pub fn effective(&self, flat: usize) -> f64 {
		if self.zone_blocking[flat] > 0 {
			IMPASSABLE
		} else {
			self.base[flat] + self.zone_sum[flat]
		}
	}
	/// Get the base penalty
	pub fn get_base(&self, flat: usize) -> f64 {
		self.base[flat]
	}
	/// Replace the base penalty, returning the new effective penalty
	pub fn set_base(&mut self, flat: usize, penalty: f64) -> f64 {
		self.base[flat] = penalty;
		self.effective(flat)
	}
	/// Stack a zone penalty on `flat`, returning the new effective penalty
	pub fn add_zone(&mut self, flat: usize, penalty: f64) -> f64 {
		if penalty.is_infinite() {
			self.zone_blocking[flat] += 1;
		} else {
			self.zone_count[flat] += 1;
			self.zone_sum[flat] += penalty;
		}
		self.effective(flat)
	}
	/// Remove a zone penalty from `flat`, returning the new effective penalty
	pub fn remove_zone(&mut self, flat: usize, penalty: f64) -> f64 {
		if penalty.is_infinite() {
			self.zone_blocking[flat] = self.zone_blocking[flat].saturating_sub(1);
		} else {
			self.zone_count[flat] = self.zone_count[flat].saturating_sub(1);
			if self.zone_count[flat] == 0 {
				self.zone_sum[flat] = 0.0;
			} else {
				self.zone_sum[flat] = (self.zone_sum[flat] - penalty).max(0.0);
			}
		}
		self.effective(flat)
	}
}

/// Everything the planner remembers about reported zones and its own readiness
#[derive(Debug, Default)]
pub struct PlannerState {
	/// Every known zone, pending or active
	zones: BTreeMap<ZoneId, DynamicNoFlightZone>,
	/// Next candidate for an allocated [ZoneId]
	next_id: u64,
	/// Number of zones announced by the zone service and when the announcement arrived
	expected_zones: Option<(usize, Epoch)>,
	/// Number of zones created since the announcement
	zones_received: usize,
	/// The readiness timeout has already been reported
	timeout_warned: bool,
	/// Latest epoch until which the goal or path is known to be blocked
	blocked_until: Option<Epoch>,
}

impl PlannerState {
	/// Create an empty state
	pub fn new() -> Self {
		PlannerState::default()
	}
	/// Is a zone with this ID known
	pub fn contains_zone(&self, id: ZoneId) -> bool {
		self.zones.contains_key(&id)
	}
	/// Get a zone
	pub fn get_zone(&self, id: ZoneId) -> Option<&DynamicNoFlightZone> {
		self.zones.get(&id)
	}
	/// Get every zone ordered by ID
	pub fn get_zones(&self) -> impl Iterator<Item = &DynamicNoFlightZone> {
		self.zones.values()
	}
	/// Mutable access to a zone
	pub(crate) fn get_zone_mut(&mut self, id: ZoneId) -> Option<&mut DynamicNoFlightZone> {
		self.zones.get_mut(&id)
	}
	/// Number of known zones
	pub fn zone_count(&self) -> usize {
		self.zones.len()
	}
	/// Allocate an ID no known zone uses
	pub fn allocate_zone_id(&mut self) -> ZoneId {
		while self.zones.contains_key(&ZoneId(self.next_id)) {
			self.next_id += 1;
		}
		let id = ZoneId(self.next_id);
		self.next_id += 1;
		id
	}
	/// Store a new zone, counting it towards readiness
	pub(crate) fn insert_zone(&mut self, zone: DynamicNoFlightZone) {
		info!("Registered no-fly zone {:?}", zone.get_id());
		self.zones_received += 1;
		self.zones.insert(zone.get_id(), zone);
	}
	/// Forget a zone
	pub(crate) fn remove_zone(&mut self, id: ZoneId) -> Option<DynamicNoFlightZone> {
		self.zones.remove(&id)
	}
	/// The zone service announced how many zones it is about to report
	pub fn set_expected_zone_count(&mut self, count: usize, now: Epoch) {
		info!("Expecting {} no-fly zones", count);
		self.expected_zones = Some((count, now));
		self.zones_received = 0;
		self.timeout_warned = false;
	}
	/// Get the announced zone count
	pub fn get_expected_zone_count(&self) -> Option<usize> {
		self.expected_zones.map(|(count, _)| count)
	}
	/// Number of zones created since the announcement
	pub fn get_zones_received(&self) -> usize {
		self.zones_received
	}
	/// Have the announced zones arrived, or has waiting for them timed out
	pub fn initial_zones_loaded(&mut self, now: Epoch, timeout_secs: Option<u64>) -> bool {
		let Some((expected, since)) = self.expected_zones else {
			return true;
		};
		if self.zones_received >= expected {
			return true;
		}
		match timeout_secs {
			Some(timeout) if now.saturating_sub(since) >= timeout as Epoch => {
				if !self.timeout_warned {
					warn!(
						"Gave up waiting for no-fly zones, received {} of {}",
						self.zones_received, expected
					);
					self.timeout_warned = true;
				}
				true
			}
			_ => false,
		}
	}
	/// Get the latest known blocked epoch
	pub fn get_blocked_until(&self) -> Option<Epoch> {
		self.blocked_until
	}
	/// Remember a blocked goal, keeping the latest epoch
	pub(crate) fn record_blocked(&mut self, until: Epoch) {
		self.blocked_until = Some(self.blocked_until.map_or(until, |b| b.max(until)));
	}
}
