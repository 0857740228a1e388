//! The grid is divided into rectangular [NodeCollection]s, each relaxed by its own worker thread.
//!
//! ```text
//!  _______________________
//! |           |           |
//! |  coll 0   |  coll 1   |
//! |___________|___________|
//! |           |           |
//! |  coll 2   |  coll 3   |
//! |___________|___________|
//! ```
//!
//! A collection is `stable` once a full pass over its nodes changes nothing. When a node changes
//! every neighbouring collection that owns one of its neighbours is flagged `dirty`, forcing that
//! collection to run another pass before it may report itself stable again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::prelude::*;

/// A rectangular band of nodes relaxed together
#[derive(Debug)]
pub struct NodeCollection {
	/// Position within the [Partition]
	id: usize,
	/// First row of the band
	row_start: usize,
	/// One past the last row of the band
	row_end: usize,
	/// First column of the band
	col_start: usize,
	/// One past the last column of the band
	col_end: usize,
	/// The last pass changed nothing
	stable: AtomicBool,
	/// A neighbour changed something this collection depends on since its last pass began
	dirty: AtomicBool,
	/// Number of passes run, alternates the sweep direction
	passes: AtomicU64,
}

impl NodeCollection {
	/// Create a collection covering rows `row_start..row_end` and columns `col_start..col_end`
	pub fn new(id: usize, row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
		NodeCollection {
			id,
			row_start,
			row_end,
			col_start,
			col_end,
			stable: AtomicBool::new(false),
			dirty: AtomicBool::new(true),
			passes: AtomicU64::new(0),
		}
	}
	/// Get the ID
	pub fn get_id(&self) -> usize {
		self.id
	}
	/// Get the half-open row range
	pub fn get_rows(&self) -> std::ops::Range<usize> {
		self.row_start..self.row_end
	}
	/// Get the half-open column range
	pub fn get_cols(&self) -> std::ops::Range<usize> {
		self.col_start..self.col_end
	}
	/// Number of nodes in the collection
	pub fn len(&self) -> usize {
		(self.row_end - self.row_start) * (self.col_end - self.col_start)
	}
	/// Does the collection own no nodes
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
	/// Does the collection own `index`
	pub fn contains(&self, index: NodeIndex) -> bool {
		self.get_rows().contains(&index.get_row()) && self.get_cols().contains(&index.get_column())
	}
	/// Stable and not waiting on a neighbour
	pub fn is_stable(&self) -> bool {
		self.stable.load(Ordering::SeqCst) && !self.dirty.load(Ordering::SeqCst)
	}
	/// Should a worker run a pass over this collection
	pub fn needs_pass(&self) -> bool {
		!self.is_stable()
	}
	/// Force another pass
	pub(crate) fn mark_dirty(&self) {
		self.dirty.store(true, Ordering::SeqCst);
	}
	/// Number of passes run so far
	pub fn get_pass_count(&self) -> u64 {
		self.passes.load(Ordering::Relaxed)
	}
	/// Run one relaxation pass over the collection, returning whether any node changed.
	///
	/// Flags are cleared before the pass so that a neighbour dirtying this collection mid-pass is
	/// never lost
	pub(crate) fn run_pass(
		&self,
		grid: &Grid,
		goal: usize,
		partition: &Partition,
		generation: &AtomicU64,
	) -> bool {
		self.stable.store(false, Ordering::SeqCst);
		self.dirty.store(false, Ordering::SeqCst);
		let changed = self.relax(grid, goal, partition, generation);
		if !changed && !self.dirty.load(Ordering::SeqCst) {
			self.stable.store(true, Ordering::SeqCst);
		}
		changed
	}
	/// Visit every node once and lower its cost through the cheapest neighbour. Sweeps alternate
	/// between forward and reverse row-major order
	fn relax(&self, grid: &Grid, goal: usize, partition: &Partition, generation: &AtomicU64) -> bool {
		let reverse = self.passes.fetch_add(1, Ordering::Relaxed) % 2 == 1;
		let cols = grid.get_cols();
		let mut changed = false;
		let mut visit = |row: usize, col: usize| {
			let flat = row * cols + col;
			if relax_node(grid, flat, goal) {
				changed = true;
				for (neighbour, _) in grid.neighbours(flat) {
					let owner = partition.owner_of(neighbour);
					if owner != self.id {
						partition.get_collections()[owner].mark_dirty();
					}
				}
				generation.fetch_add(1, Ordering::SeqCst);
			}
		};
		if reverse {
			for row in self.get_rows().rev() {
				for col in self.get_cols().rev() {
					visit(row, col);
				}
			}
		} else {
			for row in self.get_rows() {
				for col in self.get_cols() {
					visit(row, col);
				}
			}
		}
		changed
	}
}

/// Apply `cost(n) = min(cost(n), cost(nb) + edge + penalty(nb))` over the neighbours of `flat`,
/// returning whether the cost dropped. Neighbours that are impassable or unreached are skipped
pub(crate) fn relax_node(grid: &Grid, flat: usize, goal: usize) -> bool {
	let node = grid.node(flat);
	if flat == goal {
		node.set_stable(true);
		return false;
	}
	let mut best = node.get_cost();
	let mut successor = None;
	for (neighbour, distance) in grid.neighbours(flat) {
		let n = grid.node(neighbour);
		let penalty = n.get_penalty();
		let cost = n.get_cost();
		if penalty.is_infinite() || cost.is_infinite() {
			continue;
		}
		let candidate = cost + distance + penalty;
		if candidate < best {
			best = candidate;
			successor = Some(neighbour);
		}
	}
	match successor {
		Some(s) => {
			node.set_cost(best, s);
			node.set_stable(false);
			true
		}
		None => {
			node.set_stable(true);
			false
		}
	}
}

/// Every [NodeCollection] of a grid and a lookup from node to owning collection
#[derive(Debug)]
pub struct Partition {
	/// Collections in row-major band order
	collections: Vec<NodeCollection>,
	/// Owning collection of each flat node index
	owners: Vec<usize>,
}

impl Partition {
	/// Split `grid` into up to `band_rows` x `band_cols` collections of near equal size.
	/// Bands never outnumber the rows or columns they divide
	pub fn divide_into_collections(grid: &Grid, band_rows: usize, band_cols: usize) -> Self {
		let (rows, cols) = grid.get_size();
		let band_rows = band_rows.clamp(1, rows.max(1));
		let band_cols = band_cols.clamp(1, cols.max(1));
		let mut collections = Vec::with_capacity(band_rows * band_cols);
		let mut owners = vec![0; rows * cols];
		for br in 0..band_rows {
			let (row_start, row_end) = get_slice(rows, band_rows, br);
			for bc in 0..band_cols {
				let (col_start, col_end) = get_slice(cols, band_cols, bc);
				let id = collections.len();
				for row in row_start..row_end {
					for col in col_start..col_end {
						owners[row * cols + col] = id;
					}
				}
				collections.push(NodeCollection::new(id, row_start, row_end, col_start, col_end));
			}
		}
		Partition {
			collections,
			owners,
		}
	}
	/// Get the collections
	pub fn get_collections(&self) -> &[NodeCollection] {
		&self.collections
	}
	/// ID of the collection owning flat node `flat`
	pub fn owner_of(&self, flat: usize) -> usize {
		self.owners[flat]
	}
	/// Flag the owner of `flat` and the owners of all its neighbours
	pub(crate) fn mark_dirty_around(&self, grid: &Grid, flat: usize) {
		self.collections[self.owners[flat]].mark_dirty();
		for (neighbour, _) in grid.neighbours(flat) {
			self.collections[self.owners[neighbour]].mark_dirty();
		}
	}
	/// Flag every collection
	pub(crate) fn mark_all_dirty(&self) {
		for collection in self.collections.iter() {
			collection.mark_dirty();
		}
	}
	/// Is every collection stable
	pub fn all_stable(&self) -> bool {
		self.collections.iter().all(|c| c.is_stable())
	}
}

/// Half-open range of the `part`th of `parts` near equal slices of `0..length`
fn get_slice(length: usize, parts: usize, part: usize) -> (usize, usize) {
	let base = length / parts;
	let remainder = length % parts;
	let start = part * base + part.min(remainder);
	let end = start + base + usize::from(part < remainder);
	(start, end)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn slices_cover_range() {
		let actual: Vec<(usize, usize)> = (0..3).map(|p| get_slice(10, 3, p)).collect();
		let result = vec![(0, 4), (4, 7), (7, 10)];
		assert_eq!(actual, result);
	}
	#[test]
	fn every_node_has_one_owner() {
		let grid = MapGenerator::generate_test_map(7, 5, 1.0);
		let partition = Partition::divide_into_collections(&grid, 2, 2);
		assert_eq!(partition.get_collections().len(), 4);
		let total: usize = partition.get_collections().iter().map(|c| c.len()).sum();
		assert_eq!(total, 35);
		for flat in 0..grid.node_count() {
			let owner = partition.owner_of(flat);
			assert!(partition.get_collections()[owner].contains(grid.to_index(flat)));
		}
	}
	#[test]
	fn bands_clamped_to_grid() {
		let grid = MapGenerator::generate_test_map(1, 3, 1.0);
		let partition = Partition::divide_into_collections(&grid, 4, 4);
		assert_eq!(partition.get_collections().len(), 3);
		assert!(partition.get_collections().iter().all(|c| !c.is_empty()));
	}
	#[test]
	fn new_collection_needs_a_pass() {
		let collection = NodeCollection::new(0, 0, 2, 0, 2);
		assert!(collection.needs_pass());
	}
	#[test]
	fn relax_lowers_cost() {
		let grid = MapGenerator::generate_test_map(1, 3, 2.0);
		grid.reseed(0);
		assert!(relax_node(&grid, 1, 0));
		assert_eq!(grid.node(1).get_cost(), 2.0);
		assert_eq!(grid.node(1).get_successor(), Some(0));
		// second relaxation finds nothing cheaper
		assert!(!relax_node(&grid, 1, 0));
	}
	#[test]
	fn relax_skips_impassable() {
		let grid = MapGenerator::generate_test_map(1, 3, 1.0);
		grid.reseed(0);
		grid.node(1).set_penalty(f64::INFINITY);
		relax_node(&grid, 1, 0);
		assert!(!relax_node(&grid, 2, 0));
		assert!(grid.node(2).get_cost().is_infinite());
	}
	#[test]
	fn single_collection_converges() {
		let grid = MapGenerator::generate_test_map(4, 4, 1.0);
		grid.reseed(0);
		let partition = Partition::divide_into_collections(&grid, 1, 1);
		let generation = AtomicU64::new(0);
		let collection = &partition.get_collections()[0];
		let mut passes: u64 = 0;
		while collection.needs_pass() {
			collection.run_pass(&grid, 0, &partition, &generation);
			passes += 1;
			assert!(passes < 20);
		}
		assert_eq!(collection.get_pass_count(), passes);
		let far = grid.to_flat(NodeIndex::new(3, 3)).unwrap();
		let actual = grid.node(far).get_cost();
		assert!((actual - 3.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
	}
	#[test]
	fn boundary_change_dirties_neighbour() {
		let grid = MapGenerator::generate_test_map(2, 2, 1.0);
		grid.reseed(0);
		let partition = Partition::divide_into_collections(&grid, 1, 2);
		let generation = AtomicU64::new(0);
		let [left, right] = partition.get_collections() else {
			panic!("expected two collections");
		};
		right.run_pass(&grid, 0, &partition, &generation);
		right.run_pass(&grid, 0, &partition, &generation);
		assert!(!right.needs_pass());
		// (1, 0) improves and borders the right band
		left.run_pass(&grid, 0, &partition, &generation);
		assert!(right.needs_pass());
		assert!(generation.load(Ordering::SeqCst) > 0);
	}
}
