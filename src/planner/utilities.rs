//! Useful structures and tools shared by the grid, the solver and the shortener
//!

/// Cost of a node which has not (yet) been reached from the goal
pub const UNREACHED_COST: f64 = f64::INFINITY;
/// Penalty that marks a node as impassable
pub const IMPASSABLE: f64 = f64::INFINITY;
/// Sentinel stored in a node to indicate that it has no successor towards the goal
pub const NO_SUCCESSOR: usize = usize::MAX;

/// The 8 directions of movement between neighbouring nodes of a [crate::prelude::Grid].
///
/// Rows grow towards the [Ordinal::South] and columns grow towards the [Ordinal::East]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Ordinal {
	North,
	East,
	South,
	West,
	NorthEast,
	SouthEast,
	SouthWest,
	NorthWest,
}

impl Ordinal {
	/// Every direction, orthogonals first
	pub const ALL: [Ordinal; 8] = [
		Ordinal::North,
		Ordinal::East,
		Ordinal::South,
		Ordinal::West,
		Ordinal::NorthEast,
		Ordinal::SouthEast,
		Ordinal::SouthWest,
		Ordinal::NorthWest,
	];
	/// `(row, column)` step taken when moving in this direction
	pub fn offset(&self) -> (isize, isize) {
		match self {
			Ordinal::North => (-1, 0),
			Ordinal::East => (0, 1),
			Ordinal::South => (1, 0),
			Ordinal::West => (0, -1),
			Ordinal::NorthEast => (-1, 1),
			Ordinal::SouthEast => (1, 1),
			Ordinal::SouthWest => (1, -1),
			Ordinal::NorthWest => (-1, -1),
		}
	}
	/// Is this a diagonal step
	pub fn is_diagonal(&self) -> bool {
		!matches!(
			self,
			Ordinal::North | Ordinal::East | Ordinal::South | Ordinal::West
		)
	}
	/// Multiple of the node spacing travelled when stepping in this direction
	pub fn distance_factor(&self) -> f64 {
		if self.is_diagonal() {
			std::f64::consts::SQRT_2
		} else {
			1.0
		}
	}
	/// Returns the opposite [Ordinal] of the current
	pub fn inverse(&self) -> Ordinal {
		match self {
			Ordinal::North => Ordinal::South,
			Ordinal::East => Ordinal::West,
			Ordinal::South => Ordinal::North,
			Ordinal::West => Ordinal::East,
			Ordinal::NorthEast => Ordinal::SouthWest,
			Ordinal::SouthEast => Ordinal::NorthWest,
			Ordinal::SouthWest => Ordinal::NorthEast,
			Ordinal::NorthWest => Ordinal::SouthEast,
		}
	}
	/// For two `(row, column)` positions next to each other find the [Ordinal] pointing from the `source` to the `target`, [None] if they are not adjacent
	pub fn between(source: (usize, usize), target: (usize, usize)) -> Option<Self> {
		let delta = (
			target.0 as isize - source.0 as isize,
			target.1 as isize - source.1 as isize,
		);
		Ordinal::ALL.into_iter().find(|o| o.offset() == delta)
	}
	/// Step from `(row, column)` in this direction, [None] if it falls outside of a `rows` x `cols` grid
	pub fn step_from(&self, position: (usize, usize), rows: usize, cols: usize) -> Option<(usize, usize)> {
		let (d_row, d_col) = self.offset();
		let row = position.0.checked_add_signed(d_row)?;
		let col = position.1.checked_add_signed(d_col)?;
		if row < rows && col < cols {
			Some((row, col))
		} else {
			None
		}
	}
	/// Based on a `(row, column)` position find all neighbours, including diagonal ones, that lie inside a `rows` x `cols` grid
	pub fn get_all_neighbours(
		position: (usize, usize),
		rows: usize,
		cols: usize,
	) -> Vec<(Ordinal, (usize, usize))> {
		Ordinal::ALL
			.into_iter()
			.filter_map(|o| o.step_from(position, rows, cols).map(|n| (o, n)))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn corner_has_three_neighbours() {
		let actual = Ordinal::get_all_neighbours((0, 0), 5, 5);
		let result = vec![
			(Ordinal::East, (0, 1)),
			(Ordinal::South, (1, 0)),
			(Ordinal::SouthEast, (1, 1)),
		];
		assert_eq!(actual, result);
	}
	#[test]
	fn edge_has_five_neighbours() {
		let actual = Ordinal::get_all_neighbours((4, 2), 5, 5).len();
		assert_eq!(actual, 5);
	}
	#[test]
	fn centre_has_eight_neighbours() {
		let actual = Ordinal::get_all_neighbours((2, 2), 5, 5).len();
		assert_eq!(actual, 8);
	}
	#[test]
	fn single_node_grid_has_no_neighbours() {
		let actual = Ordinal::get_all_neighbours((0, 0), 1, 1);
		assert!(actual.is_empty());
	}
	#[test]
	fn direction_between_adjacent() {
		let actual = Ordinal::between((3, 3), (2, 4));
		assert_eq!(actual, Some(Ordinal::NorthEast));
	}
	#[test]
	fn direction_between_distant() {
		let actual = Ordinal::between((3, 3), (5, 3));
		assert_eq!(actual, None);
	}
	#[test]
	fn inverse_undoes_offset() {
		for o in Ordinal::ALL {
			let (r, c) = o.offset();
			let (ir, ic) = o.inverse().offset();
			assert_eq!((r + ir, c + ic), (0, 0));
		}
	}
	#[test]
	fn diagonal_distance() {
		assert_eq!(Ordinal::North.distance_factor(), 1.0);
		assert_eq!(Ordinal::SouthWest.distance_factor(), std::f64::consts::SQRT_2);
	}
}
