//! A `rows` x `cols` arena of [Node]s. Nodes are addressed by [NodeIndex] publicly and by a flat
//! row-major `usize` internally, `flat = row * cols + col`.
//!
//! ```text
//!          col 0   col 1   col 2
//! row 0  ___________________________
//!       |       |       |       |
//!       |   0   |   1   |   2   |
//! row 1 |_______|_______|_______|
//!       |       |       |       |
//!       |   3   |   4   |   5   |
//!       |_______|_______|_______|
//! ```
//!
//! Moving between neighbours costs the node spacing for orthogonal steps and `sqrt(2)` times the
//! spacing for diagonal ones.

use std::collections::VecDeque;
use std::fmt::Write;

use bevy::log::trace;

use crate::prelude::*;

/// The sampled map
#[derive(Debug)]
pub struct Grid {
	/// Number of rows
	rows: usize,
	/// Number of columns
	cols: usize,
	/// Distance in metres between orthogonally adjacent nodes
	spacing: f64,
	/// Frame used to measure distances between coordinates and nodes
	projection: LocalProjection,
	/// Row-major storage
	nodes: Vec<Node>,
}

impl Grid {
	/// Assemble a grid, `nodes` must be in row-major order
	pub(crate) fn new(
		rows: usize,
		cols: usize,
		spacing: f64,
		projection: LocalProjection,
		nodes: Vec<Node>,
	) -> Self {
		debug_assert_eq!(rows * cols, nodes.len());
		Grid {
			rows,
			cols,
			spacing,
			projection,
			nodes,
		}
	}
	/// Get the number of rows
	pub fn get_rows(&self) -> usize {
		self.rows
	}
	/// Get the number of columns
	pub fn get_cols(&self) -> usize {
		self.cols
	}
	/// Get `(rows, cols)`
	pub fn get_size(&self) -> (usize, usize) {
		(self.rows, self.cols)
	}
	/// Get the distance in metres between orthogonal neighbours
	pub fn get_spacing(&self) -> f64 {
		self.spacing
	}
	/// Get the projection relating coordinates to the grid
	pub fn get_projection(&self) -> &LocalProjection {
		&self.projection
	}
	/// Get every node in row-major order
	pub fn get_nodes(&self) -> &[Node] {
		&self.nodes
	}
	/// Total number of nodes
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}
	/// Whether a signed `(row, column)` lies inside the grid
	pub fn is_inside_map(&self, row: isize, col: isize) -> bool {
		row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
	}
	/// Convert to a flat index, [None] when outside the grid
	pub fn to_flat(&self, index: NodeIndex) -> Option<usize> {
		let (row, col) = index.get_row_col();
		if row < self.rows && col < self.cols {
			Some(row * self.cols + col)
		} else {
			None
		}
	}
	/// Convert a flat index back into a [NodeIndex]
	pub fn to_index(&self, flat: usize) -> NodeIndex {
		NodeIndex::new(flat / self.cols, flat % self.cols)
	}
	/// Convert to a flat index or report which position was out of bounds
	pub fn try_flat(&self, index: NodeIndex) -> Result<usize, MapError> {
		self.to_flat(index).ok_or(MapError::IndexOutOfBounds {
			row: index.get_row(),
			col: index.get_column(),
		})
	}
	/// Get a [Node] by its [NodeIndex]
	pub fn get_node(&self, index: NodeIndex) -> Option<&Node> {
		self.to_flat(index).map(|flat| &self.nodes[flat])
	}
	/// Get a [Node] by its flat index
	pub(crate) fn node(&self, flat: usize) -> &Node {
		&self.nodes[flat]
	}
	/// Flat indices of the up to 8 neighbours of `flat` paired with the distance to each of them
	pub fn neighbours(&self, flat: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
		let position = (flat / self.cols, flat % self.cols);
		Ordinal::ALL.into_iter().filter_map(move |o| {
			o.step_from(position, self.rows, self.cols)
				.map(|(r, c)| (r * self.cols + c, o.distance_factor() * self.spacing))
		})
	}
	/// Snapshot of every cost in row-major order
	pub fn get_costs(&self) -> Vec<f64> {
		self.nodes.iter().map(|n| n.get_cost()).collect()
	}
	/// Snapshot of every penalty in row-major order
	pub fn get_penalties(&self) -> Vec<f64> {
		self.nodes.iter().map(|n| n.get_penalty()).collect()
	}
	/// Forget every route and seed `goal` with a cost of zero
	pub(crate) fn reseed(&self, goal: usize) {
		for node in self.nodes.iter() {
			node.reset_cost();
		}
		self.nodes[goal].make_goal();
	}
	/// After the penalty of `changed` has increased any route passing through it may be too cheap.
	/// Walk the successor links backwards and forget the route of every node that depends on
	/// `changed`, returning their flat indices. `changed` keeps its own cost.
	pub(crate) fn invalidate_dependents(&self, changed: usize) -> Vec<usize> {
		let mut reset = Vec::new();
		let mut queue = VecDeque::from([changed]);
		while let Some(current) = queue.pop_front() {
			for (neighbour, _) in self.neighbours(current) {
				let node = &self.nodes[neighbour];
				if node.get_successor() == Some(current) {
					node.reset_cost();
					reset.push(neighbour);
					queue.push_back(neighbour);
				}
			}
		}
		trace!("Penalty increase at {} invalidated {} nodes", changed, reset.len());
		reset
	}
	/// Is every node on the Bresenham line from `source` to `target`, excluding `source`, passable
	pub fn has_line_of_sight(&self, source: NodeIndex, target: NodeIndex) -> bool {
		source
			.get_nodes_between_points(&target)
			.into_iter()
			.skip(1)
			.all(|i| self.get_node(i).is_some_and(|n| n.is_passable()))
	}
	/// Index of the node closest to `coord`. Ties resolve to the first node in row-major order
	pub fn get_closest_node_index(&self, coord: &GeoCoord) -> NodeIndex {
		let target = self.projection.to_planar(coord);
		let mut closest = 0;
		let mut shortest = f64::INFINITY;
		for (i, node) in self.nodes.iter().enumerate() {
			let distance = node.get_planar_position().distance(&target);
			if distance < shortest {
				shortest = distance;
				closest = i;
			}
		}
		self.to_index(closest)
	}
	/// Render the costs as text, one line per row. Unreached nodes print as `inf` and no-fly nodes as `X`
	pub fn render_costs(&self) -> String {
		let mut out = String::new();
		for row in 0..self.rows {
			for col in 0..self.cols {
				let node = &self.nodes[row * self.cols + col];
				if col > 0 {
					out.push(' ');
				}
				if !node.is_passable() {
					let _ = write!(out, "{:>8}", "X");
				} else if node.get_cost().is_infinite() {
					let _ = write!(out, "{:>8}", "inf");
				} else {
					let _ = write!(out, "{:>8.1}", node.get_cost());
				}
			}
			out.push('\n');
		}
		out
	}
}
