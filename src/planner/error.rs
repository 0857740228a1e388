//! Failures reported by the planner
//!

use thiserror::Error;

/// Problems building or mutating a map
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
	/// Node spacing must be a positive finite number of metres
	#[error("node spacing must be positive and finite, got {0}")]
	InvalidSpacing(f64),
	/// A map dimension was negative or not finite
	#[error("map {name} must be non-negative and finite, got {value}")]
	InvalidDimension {
		/// Which dimension
		name: &'static str,
		/// The rejected value
		value: f64,
	},
	/// A coordinate contained a NaN or infinite component
	#[error("coordinate is not finite")]
	InvalidCoordinate,
	/// The requested map would exceed the node limit
	#[error("a {rows}x{cols} map exceeds the limit of {limit} nodes")]
	GridTooLarge {
		/// Requested number of rows
		rows: f64,
		/// Requested number of columns
		cols: f64,
		/// Configured ceiling
		limit: usize,
	},
	/// An operation needed a map before one was generated
	#[error("no map has been generated")]
	NoMap,
	/// A `(row, column)` fell outside the grid
	#[error("node ({row}, {col}) lies outside the map")]
	IndexOutOfBounds {
		/// Requested row
		row: usize,
		/// Requested column
		col: usize,
	},
	/// Penalties may be zero, positive or infinite but never negative or NaN
	#[error("penalty must be non-negative, got {0}")]
	InvalidPenalty(f64),
	/// A no-fly area needs at least three vertices
	#[error("a no-fly area needs at least 3 vertices, got {0}")]
	InvalidPolygon(usize),
}

/// Reasons a path to the goal could not be produced
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
	/// No map has been generated yet
	#[error("no map has been generated")]
	NoMap,
	/// The solver was never given a goal
	#[error("no goal has been set")]
	GoalNotSet,
	/// The current position of the vehicle is unknown
	#[error("the current position has not been set")]
	PositionNotSet,
	/// The cost field is still being relaxed
	#[error("the map has not stabilised")]
	MapUnstable,
	/// The goal cannot be reached from the current node
	#[error("the goal is unreachable from node ({row}, {col})")]
	Unreachable {
		/// Row of the stranded node
		row: usize,
		/// Column of the stranded node
		col: usize,
	},
	/// Descent stopped at a node with no cheaper neighbour
	#[error("descent stalled at node ({row}, {col})")]
	LocalMinimum {
		/// Row of the stalled node
		row: usize,
		/// Column of the stalled node
		col: usize,
	},
}

/// Problems loading a [crate::prelude::PlannerConfig]
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The configuration file could not be read
	#[error("failed to read planner config: {0}")]
	Io(#[from] std::io::Error),
	/// The configuration file is malformed
	#[cfg(feature = "ron")]
	#[error("failed to parse planner config: {0}")]
	Parse(#[from] ron::error::SpannedError),
	/// A value was out of range
	#[error("invalid planner config: {0}")]
	Invalid(String),
}
