//! Builds a [Grid] covering the corridor between a start and an end coordinate.
//!
//! The corridor is laid out in the local planar frame of the start. Rows advance along the
//! start->end direction and columns run across it, centred on the line between the two points:
//!
//! ```text
//!            pad                   pad
//!          |<--->|               |<--->|
//!          +-----+---------------+-----+  ^
//!          |     |               |     |  |
//!  row 0 ->|     S - - - - - - - E     |  width
//!          |     |               |     |  |
//!          +-----+---------------+-----+  v
//!          ------------- rows ------------>
//! ```
//!
//! When start and end coincide the corridor faces north.

use bevy::log::{debug, info};

use crate::prelude::*;

/// Builds grids, guarding against sizes that would exhaust memory
#[derive(Clone, Copy, Debug)]
pub struct MapGenerator {
	/// Largest number of nodes a generated grid may hold
	max_node_count: usize,
	/// Radius of the Earth used by the projection
	earth_radius: f64,
}

impl Default for MapGenerator {
	fn default() -> Self {
		MapGenerator::new(&PlannerConfig::default())
	}
}

impl MapGenerator {
	/// Create a generator from the planner configuration
	pub fn new(config: &PlannerConfig) -> Self {
		MapGenerator {
			max_node_count: config.max_node_count,
			earth_radius: config.earth_radius_meters,
		}
	}
	/// Get the node limit
	pub fn get_max_node_count(&self) -> usize {
		self.max_node_count
	}
	/// Generate a grid with nodes every `node_spacing` metres, spanning from `padding` metres behind
	/// `start` to `padding` metres beyond `end` and `width` metres across
	pub fn generate_map(
		&self,
		start: GeoCoord,
		end: GeoCoord,
		node_spacing: f64,
		width: f64,
		padding: f64,
	) -> Result<Grid, MapError> {
		if !node_spacing.is_finite() || node_spacing <= 0.0 {
			return Err(MapError::InvalidSpacing(node_spacing));
		}
		if !width.is_finite() || width < 0.0 {
			return Err(MapError::InvalidDimension {
				name: "width",
				value: width,
			});
		}
		if !padding.is_finite() || padding < 0.0 {
			return Err(MapError::InvalidDimension {
				name: "padding",
				value: padding,
			});
		}
		if !start.is_finite() || !end.is_finite() {
			return Err(MapError::InvalidCoordinate);
		}
		let projection = LocalProjection::new(start, self.earth_radius);
		let end_planar = projection.to_planar(&end);
		let length = end_planar.length();
		let along = if length > f64::EPSILON {
			end_planar.scale(1.0 / length)
		} else {
			PlanarPoint::new(0.0, 1.0)
		};
		// rotate clockwise so columns grow to the right of the direction of travel
		let across = PlanarPoint::new(along.north, -along.east);

		let row_steps = ((length + 2.0 * padding) / node_spacing).ceil();
		let col_steps = (width / node_spacing).ceil();
		// compare as floats first so absurd inputs don't overflow the cast
		if (row_steps + 1.0) * (col_steps + 1.0) > self.max_node_count as f64 {
			return Err(MapError::GridTooLarge {
				rows: row_steps + 1.0,
				cols: col_steps + 1.0,
				limit: self.max_node_count,
			});
		}
		let rows = row_steps as usize + 1;
		let cols = col_steps as usize + 1;

		let origin = along.scale(-padding) + across.scale(-width / 2.0);
		let mut nodes = Vec::with_capacity(rows * cols);
		for row in 0..rows {
			for col in 0..cols {
				let planar = origin
					+ along.scale(row as f64 * node_spacing)
					+ across.scale(col as f64 * node_spacing);
				let world = projection.to_geo(&planar);
				nodes.push(Node::new(NodeIndex::new(row, col), world, planar));
			}
		}
		info!(
			"Generated a {}x{} map with {}m spacing over {:.1}m",
			rows, cols, node_spacing, length
		);
		Ok(Grid::new(rows, cols, node_spacing, projection, nodes))
	}
	/// Generate a small north aligned grid anchored at `(0, 0)`, row 0 is the northernmost row and
	/// column 0 the westernmost column
	pub fn generate_test_map(rows: usize, cols: usize, node_spacing: f64) -> Grid {
		let config = PlannerConfig::default();
		let projection = LocalProjection::new(GeoCoord::new(0.0, 0.0), config.earth_radius_meters);
		let mut nodes = Vec::with_capacity(rows * cols);
		for row in 0..rows {
			for col in 0..cols {
				let planar = PlanarPoint::new(col as f64 * node_spacing, -(row as f64) * node_spacing);
				let world = projection.to_geo(&planar);
				nodes.push(Node::new(NodeIndex::new(row, col), world, planar));
			}
		}
		debug!("Generated a {}x{} test map", rows, cols);
		Grid::new(rows, cols, node_spacing, projection, nodes)
	}
}
