//! A [Node] is a single sample point of the map. Its cost and successor are rewritten concurrently by
//! solver workers so every mutable field is atomic.
//!

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::prelude::*;

/// `(row, column)` position of a [Node] within a [Grid]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct NodeIndex((usize, usize));

impl NodeIndex {
	/// Create a new instance of [NodeIndex]
	pub const fn new(row: usize, column: usize) -> Self {
		NodeIndex((row, column))
	}
	/// Get the `(row, column)` tuple
	pub fn get_row_col(&self) -> (usize, usize) {
		self.0
	}
	/// Get the row
	pub fn get_row(&self) -> usize {
		self.0 .0
	}
	/// Get the column
	pub fn get_column(&self) -> usize {
		self.0 .1
	}
	/// Using the Bresenham line algorithm get a list of [NodeIndex] that lie along a line between two points, ordered from `self` to `target` and including both ends
	pub fn get_nodes_between_points(&self, target: &NodeIndex) -> Vec<NodeIndex> {
		let source_col = self.get_column() as i64;
		let source_row = self.get_row() as i64;
		let target_col = target.get_column() as i64;
		let target_row = target.get_row() as i64;

		// optimise for orthognal line (horizontal or vertical)
		if source_col == target_col {
			let mut nodes: Vec<NodeIndex> = (source_row.min(target_row)..=source_row.max(target_row))
				.map(|row| NodeIndex::new(row as usize, source_col as usize))
				.collect();
			if source_row > target_row {
				nodes.reverse();
			}
			nodes
		} else if source_row == target_row {
			let mut nodes: Vec<NodeIndex> = (source_col.min(target_col)..=source_col.max(target_col))
				.map(|col| NodeIndex::new(source_row as usize, col as usize))
				.collect();
			if source_col > target_col {
				nodes.reverse();
			}
			nodes
		} else if (target_row - source_row).abs() < (target_col - source_col).abs() {
			if source_col > target_col {
				let mut nodes = walk_bresenham_shallow(target_col, target_row, source_col, source_row);
				// ensure list points in the direction of source to target
				nodes.reverse();
				nodes
			} else {
				walk_bresenham_shallow(source_col, source_row, target_col, target_row)
			}
		} else if source_row > target_row {
			let mut nodes = walk_bresenham_steep(target_col, target_row, source_col, source_row);
			nodes.reverse();
			nodes
		} else {
			walk_bresenham_steep(source_col, source_row, target_col, target_row)
		}
	}
}

/// When finding a shallow raster representation of a line we step through the columns and increment the row based on an error bound
fn walk_bresenham_shallow(col_0: i64, row_0: i64, col_1: i64, row_1: i64) -> Vec<NodeIndex> {
	let mut nodes = Vec::new();

	let delta_col = col_1 - col_0;
	let mut delta_row = row_1 - row_0;

	let mut row_increment = 1;
	if delta_row < 0 {
		row_increment = -1;
		delta_row *= -1;
	}
	let mut difference = 2 * delta_row - delta_col;
	let mut row = row_0;

	for col in col_0..=col_1 {
		nodes.push(NodeIndex::new(row as usize, col as usize));
		if difference > 0 {
			row += row_increment;
			difference += 2 * (delta_row - delta_col);
		} else {
			difference += 2 * delta_row;
		}
	}
	nodes
}

/// When finding a steep raster representation of a line we step through the rows and increment the column based on an error bound
fn walk_bresenham_steep(col_0: i64, row_0: i64, col_1: i64, row_1: i64) -> Vec<NodeIndex> {
	let mut nodes = Vec::new();

	let mut delta_col = col_1 - col_0;
	let delta_row = row_1 - row_0;

	let mut col_increment = 1;
	if delta_col < 0 {
		col_increment = -1;
		delta_col *= -1;
	}
	let mut difference = 2 * delta_col - delta_row;
	let mut col = col_0;

	for row in row_0..=row_1 {
		nodes.push(NodeIndex::new(row as usize, col as usize));
		if difference > 0 {
			col += col_increment;
			difference += 2 * (delta_col - delta_row);
		} else {
			difference += 2 * delta_col;
		}
	}
	nodes
}

/// An `f64` stored as its bit pattern so it can be shared between threads
#[derive(Debug)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
	/// Create a new instance
	pub(crate) fn new(value: f64) -> Self {
		AtomicF64(AtomicU64::new(value.to_bits()))
	}
	/// Read the value
	pub(crate) fn load(&self, order: Ordering) -> f64 {
		f64::from_bits(self.0.load(order))
	}
	/// Replace the value
	pub(crate) fn store(&self, value: f64, order: Ordering) {
		self.0.store(value.to_bits(), order)
	}
}

/// A sample point of the map.
///
/// `cost` is the length of the best known route from the node to the goal, `penalty` is an
/// additional price paid for entering the node (infinite marks a no-fly node) and `successor` is the
/// flat index of the neighbour the best known route continues through
#[derive(Debug)]
pub struct Node {
	/// Position within the [Grid]
	index: NodeIndex,
	/// Where the node sits in the world
	world_coordinate: GeoCoord,
	/// Where the node sits in the grid's local planar frame
	planar_position: PlanarPoint,
	/// Best known cost-to-goal
	cost: AtomicF64,
	/// Price of entering this node
	penalty: AtomicF64,
	/// Flat index of the next node towards the goal
	successor: AtomicUsize,
	/// Did the last relaxation of this node leave its cost unchanged
	stable: AtomicBool,
}

impl Node {
	/// Create an unreached [Node] with no penalty
	pub fn new(index: NodeIndex, world_coordinate: GeoCoord, planar_position: PlanarPoint) -> Self {
		Node {
			index,
			world_coordinate,
			planar_position,
			cost: AtomicF64::new(UNREACHED_COST),
			penalty: AtomicF64::new(0.0),
			successor: AtomicUsize::new(NO_SUCCESSOR),
			stable: AtomicBool::new(false),
		}
	}
	/// Get the [NodeIndex]
	pub fn get_index(&self) -> NodeIndex {
		self.index
	}
	/// Get the world coordinate
	pub fn get_world_coordinate(&self) -> GeoCoord {
		self.world_coordinate
	}
	/// Get the position in metres relative to the grid origin
	pub fn get_planar_position(&self) -> PlanarPoint {
		self.planar_position
	}
	/// Get the best known cost-to-goal, infinite when the goal has not been reached
	pub fn get_cost(&self) -> f64 {
		self.cost.load(Ordering::Acquire)
	}
	/// Get the penalty of entering this node
	pub fn get_penalty(&self) -> f64 {
		self.penalty.load(Ordering::Acquire)
	}
	/// Get the flat index of the successor, if any
	pub fn get_successor(&self) -> Option<usize> {
		match self.successor.load(Ordering::Acquire) {
			NO_SUCCESSOR => None,
			s => Some(s),
		}
	}
	/// Has the node stopped changing
	pub fn is_stable(&self) -> bool {
		self.stable.load(Ordering::Acquire)
	}
	/// Can the node be entered at all
	pub fn is_passable(&self) -> bool {
		!self.get_penalty().is_infinite()
	}
	/// Record an improved route
	pub(crate) fn set_cost(&self, cost: f64, successor: usize) {
		self.successor.store(successor, Ordering::Release);
		self.cost.store(cost, Ordering::Release);
	}
	/// Forget any route
	pub(crate) fn reset_cost(&self) {
		self.successor.store(NO_SUCCESSOR, Ordering::Release);
		self.cost.store(UNREACHED_COST, Ordering::Release);
		self.stable.store(false, Ordering::Release);
	}
	/// Mark this node as the goal
	pub(crate) fn make_goal(&self) {
		self.successor.store(NO_SUCCESSOR, Ordering::Release);
		self.cost.store(0.0, Ordering::Release);
		self.stable.store(false, Ordering::Release);
	}
	/// Replace the penalty
	pub(crate) fn set_penalty(&self, penalty: f64) {
		self.penalty.store(penalty, Ordering::Release);
		self.stable.store(false, Ordering::Release);
	}
	/// Flag whether the last relaxation changed the node
	pub(crate) fn set_stable(&self, stable: bool) {
		self.stable.store(stable, Ordering::Release);
	}
}
