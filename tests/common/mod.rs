//! Shared helpers for the integration tests
//!

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use bevy_uav_costfield::prelude::*;

/// Generous bound for a test map to settle
pub const SETTLE: Duration = Duration::from_secs(30);

/// Entry of the Dijkstra frontier, ordered so the heap pops the cheapest first
#[derive(PartialEq)]
struct Frontier(f64, usize);

impl Eq for Frontier {}

impl PartialOrd for Frontier {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Frontier {
	fn cmp(&self, other: &Self) -> Ordering {
		other.0.total_cmp(&self.0).then_with(|| other.1.cmp(&self.1))
	}
}

/// Reference cost-to-goal of every node computed sequentially from the grid's current penalties
pub fn dijkstra(grid: &Grid, goal: NodeIndex) -> Vec<f64> {
	let penalties = grid.get_penalties();
	let mut costs = vec![f64::INFINITY; grid.node_count()];
	let Some(goal) = grid.to_flat(goal) else {
		return costs;
	};
	costs[goal] = 0.0;
	let mut heap = BinaryHeap::from([Frontier(0.0, goal)]);
	while let Some(Frontier(cost, current)) = heap.pop() {
		if cost > costs[current] {
			continue;
		}
		// routes end by entering `current`, impossible for a no-fly node
		if penalties[current].is_infinite() {
			continue;
		}
		for (neighbour, distance) in grid.neighbours(current) {
			let candidate = cost + distance + penalties[current];
			if candidate < costs[neighbour] {
				costs[neighbour] = candidate;
				heap.push(Frontier(candidate, neighbour));
			}
		}
	}
	costs
}

/// Compare two cost fields allowing for the different order floats were summed in
pub fn assert_costs_match(actual: &[f64], expected: &[f64]) {
	assert_eq!(actual.len(), expected.len());
	for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
		if e.is_infinite() {
			assert!(a.is_infinite(), "node {} expected unreachable, got {}", i, a);
		} else {
			assert!(
				(a - e).abs() <= 1e-6 * e.max(1.0),
				"node {} expected {}, got {}",
				i,
				e,
				a
			);
		}
	}
}
