//! Properties of the converged cost field and of the paths read from it
//!

mod common;

use bevy_uav_costfield::prelude::*;
use common::{assert_costs_match, dijkstra, SETTLE};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Scatter random finite penalties and no-fly nodes over a grid
fn scatter_penalties(finder: &PathFinder, rng: &mut StdRng, blocked_ratio: f64) {
	let (rows, cols) = finder.get_grid().get_size();
	let mut updates = Vec::new();
	for row in 0..rows {
		for col in 0..cols {
			let penalty = if rng.random_bool(blocked_ratio) {
				f64::INFINITY
			} else {
				rng.random_range(0.0..5.0)
			};
			updates.push((NodeIndex::new(row, col), penalty));
		}
	}
	finder.update_penalties(&updates).unwrap();
}

/// Solver over a randomly penalised grid that has already settled towards `goal`
fn settled_finder(rows: usize, cols: usize, goal: NodeIndex, seed: u64) -> PathFinder {
	let grid = MapGenerator::generate_test_map(rows, cols, 1.0);
	let mut finder = PathFinder::new(grid, &PlannerConfig::default());
	let mut rng = StdRng::seed_from_u64(seed);
	scatter_penalties(&finder, &mut rng, 0.15);
	finder.start_solver(goal).unwrap();
	assert!(finder.wait_for_map_stable_timeout(SETTLE));
	finder
}

#[test]
fn matches_dijkstra_on_random_penalties() {
	for seed in 0..5 {
		let goal = NodeIndex::new(7, 2);
		let finder = settled_finder(10, 10, goal, seed);
		let expected = dijkstra(finder.get_grid(), goal);
		assert_costs_match(&finder.get_grid().get_costs(), &expected);
	}
}

#[test]
fn matches_dijkstra_with_uneven_partition() {
	let grid = MapGenerator::generate_test_map(13, 7, 2.5);
	let config = PlannerConfig {
		collection_rows: 3,
		collection_cols: 4,
		..Default::default()
	};
	let mut finder = PathFinder::new(grid, &config);
	let mut rng = StdRng::seed_from_u64(99);
	scatter_penalties(&finder, &mut rng, 0.2);
	let goal = NodeIndex::new(0, 6);
	finder.start_solver(goal).unwrap();
	assert!(finder.wait_for_map_stable_timeout(SETTLE));
	let expected = dijkstra(finder.get_grid(), goal);
	assert_costs_match(&finder.get_grid().get_costs(), &expected);
}

#[test]
fn stable_field_is_a_fixpoint() {
	let goal = NodeIndex::new(0, 0);
	let mut finder = settled_finder(8, 8, goal, 3);
	let before = finder.get_grid().get_costs();
	finder.pause_solver();
	finder.resume_solver();
	finder.start_solver(goal).unwrap();
	std::thread::sleep(std::time::Duration::from_millis(50));
	assert!(finder.get_map_stable());
	assert_eq!(finder.get_grid().get_costs(), before);
}

#[test]
fn raising_a_penalty_never_lowers_a_cost() {
	let goal = NodeIndex::new(9, 9);
	let finder = settled_finder(10, 10, goal, 11);
	let before = finder.get_grid().get_costs();
	let target = NodeIndex::new(5, 5);
	let current = finder.get_grid().get_node(target).unwrap().get_penalty();
	finder
		.update_penalty_of_node(target, current + 50.0)
		.unwrap();
	assert!(finder.wait_for_map_stable_timeout(SETTLE));
	let after = finder.get_grid().get_costs();
	for (b, a) in before.iter().zip(after.iter()) {
		assert!(a >= b || (a - b).abs() < 1e-9, "cost dropped from {} to {}", b, a);
	}
	let expected = dijkstra(finder.get_grid(), goal);
	assert_costs_match(&after, &expected);
}

#[test]
fn lowering_a_penalty_never_raises_a_cost() {
	let goal = NodeIndex::new(0, 9);
	let finder = settled_finder(10, 10, goal, 12);
	let before = finder.get_grid().get_costs();
	for col in 0..10 {
		finder
			.update_penalty_of_node(NodeIndex::new(4, col), 0.0)
			.unwrap();
	}
	assert!(finder.wait_for_map_stable_timeout(SETTLE));
	let after = finder.get_grid().get_costs();
	for (b, a) in before.iter().zip(after.iter()) {
		assert!(a <= b || (a - b).abs() < 1e-9, "cost rose from {} to {}", b, a);
	}
}

#[test]
fn open_grid_path_round_trip() {
	let grid = MapGenerator::generate_test_map(5, 5, 1.0);
	let mut finder = PathFinder::new(grid, &PlannerConfig::default());
	let goal = NodeIndex::new(4, 4);
	finder.start_solver(goal).unwrap();
	assert!(finder.wait_for_map_stable_timeout(SETTLE));
	let path = finder
		.with_stable_field(|grid, goal| make_path_to_destination(grid, NodeIndex::new(0, 0), goal))
		.unwrap()
		.unwrap();
	let result: Vec<NodeIndex> = (0..5).map(|i| NodeIndex::new(i, i)).collect();
	assert_eq!(path, result);
	let shortened = finder
		.with_stable_field(|grid, _| PathShortener::new().shorten_path(&path, grid))
		.unwrap();
	assert_eq!(shortened, vec![NodeIndex::new(0, 0), NodeIndex::new(4, 4)]);
}

#[test]
fn descent_costs_strictly_decrease() {
	for seed in 20..25 {
		let goal = NodeIndex::new(11, 11);
		let finder = settled_finder(12, 12, goal, seed);
		let grid = finder.get_grid();
		let start = NodeIndex::new(0, 0);
		let reachable = grid.get_node(start).unwrap().get_cost().is_finite();
		let path = finder
			.with_stable_field(|grid, goal| make_path_to_destination(grid, start, goal))
			.unwrap();
		match path {
			Ok(path) => {
				assert!(reachable);
				assert_eq!(path.last(), Some(&goal));
				for pair in path.windows(2) {
					let a = grid.get_node(pair[0]).unwrap();
					let b = grid.get_node(pair[1]).unwrap();
					assert!(b.get_cost() < a.get_cost());
					assert!(b.is_passable());
					assert!(Ordinal::between(pair[0].get_row_col(), pair[1].get_row_col()).is_some());
				}
			}
			Err(e) => {
				assert!(!reachable);
				assert_eq!(e, PathError::Unreachable { row: 0, col: 0 });
			}
		}
	}
}

#[test]
fn shortened_paths_keep_line_of_sight() {
	for seed in 30..35 {
		let goal = NodeIndex::new(14, 14);
		let finder = settled_finder(15, 15, goal, seed);
		let result = finder
			.with_stable_field(|grid, goal| {
				let path = make_path_to_destination(grid, NodeIndex::new(0, 0), goal).ok()?;
				let shortened = PathShortener::new().shorten_path(&path, grid);
				Some((path, shortened))
			})
			.unwrap();
		let Some((path, shortened)) = result else {
			continue;
		};
		let grid = finder.get_grid();
		assert_eq!(shortened.first(), path.first());
		assert_eq!(shortened.last(), path.last());
		// an ordered subsequence of the raw path
		let mut cursor = path.iter();
		for waypoint in shortened.iter() {
			assert!(cursor.any(|p| p == waypoint));
		}
		for pair in shortened.windows(2) {
			assert!(grid.has_line_of_sight(pair[0], pair[1]));
		}
	}
}
