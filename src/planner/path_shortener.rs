//! Reduces a node-by-node path to the waypoints a vehicle actually needs to turn at.
//!
//! From each anchor the path is scanned forward for the furthest node that can still be seen in a
//! straight line, i.e. every node the Bresenham line crosses is passable. That node becomes the next
//! anchor:
//!
//! ```text
//!  A . . . . .          A
//!            .           \
//!     XXXX   .   ==>      \  XXXX
//!     XXXX   .             \ XXXX
//!            . . B          ----B
//! ```
//!
//! An adjacent node is always accepted so that a path produced by the solver never loses a step it
//! was allowed to take.

use crate::prelude::*;

/// Greedy line-of-sight path simplification
#[derive(Clone, Copy, Debug, Default)]
pub struct PathShortener;

impl PathShortener {
	/// Create a new instance of [PathShortener]
	pub fn new() -> Self {
		PathShortener
	}
	/// Shorten `path`, keeping its first and last node
	pub fn shorten_path(&self, path: &[NodeIndex], grid: &Grid) -> Vec<NodeIndex> {
		if path.len() <= 2 {
			return path.to_vec();
		}
		let mut shortened = vec![path[0]];
		let mut anchor = 0;
		while anchor < path.len() - 1 {
			let mut furthest = anchor + 1;
			for candidate in anchor + 2..path.len() {
				if grid.has_line_of_sight(path[anchor], path[candidate]) {
					furthest = candidate;
				} else {
					break;
				}
			}
			shortened.push(path[furthest]);
			anchor = furthest;
		}
		shortened
	}
}
