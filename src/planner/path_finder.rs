//! The [PathFinder] keeps a cost-to-goal field up to date while penalties change underneath it.
//!
//! One worker thread per [NodeCollection] repeatedly relaxes its band of the grid and a monitor
//! thread watches for the moment every band has stopped changing:
//!
//! ```text
//!   start_solver(goal)
//!          |
//!          v
//!     +----------+   every collection stable, no change in between   +--------+
//!     | Unstable | ------------------------------------------------> | Stable |
//!     +----------+ <------------------------------------------------ +--------+
//!                      penalty update, goal change, boundary change
//! ```
//!
//! Penalty updates and goal changes take the grid gate exclusively so a worker never relaxes a
//! node against a half applied update, and path queries hold it shared so the field cannot move
//! while a path is being read.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bevy::log::{debug, error, info, trace};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::prelude::*;

/// Aggregate state of the cost field
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStatus {
	/// Costs may still change
	Unstable,
	/// Every cost is final for the current goal and penalties
	Stable,
}

/// Stability bookkeeping guarded by a single mutex
#[derive(Debug)]
struct Stability {
	/// Current aggregate state
	status: MapStatus,
	/// When the field last became unstable
	unstable_since: Instant,
	/// Time between the last unstable->stable transition and the instability preceding it
	computation_time: Duration,
}

/// State shared between the [PathFinder] handle and its threads
#[derive(Debug)]
struct Shared {
	/// The field being relaxed
	grid: Grid,
	/// Division of the grid between workers
	partition: Partition,
	/// Shared by passes and path reads, exclusive for penalty and goal changes
	gate: RwLock<()>,
	/// Flat index of the goal, [NO_SUCCESSOR] before a goal is set
	goal: AtomicUsize,
	/// Cleared while the solver is paused
	running: AtomicBool,
	/// Set when the threads must exit
	shutdown: AtomicBool,
	/// Bumped whenever any cost or penalty changes
	generation: AtomicU64,
	/// Aggregate state
	stability: Mutex<Stability>,
	/// Notified on every change of [Stability::status]
	stability_changed: Condvar,
	/// Idle workers park on [Shared::wake] with this lock
	wake_lock: Mutex<()>,
	/// Notified when there may be new work
	wake: Condvar,
	/// Monitor poll interval
	monitor_interval: Duration,
	/// Worker idle interval
	idle_interval: Duration,
}

impl Shared {
	/// Flip to [MapStatus::Unstable] straight away rather than waiting for the monitor
	fn mark_unstable(&self) {
		let mut stability = self.stability.lock();
		if stability.status == MapStatus::Stable {
			stability.status = MapStatus::Unstable;
			stability.unstable_since = Instant::now();
			self.stability_changed.notify_all();
		}
	}
	/// Wake every idle worker
	fn wake_workers(&self) {
		let _guard = self.wake_lock.lock();
		self.wake.notify_all();
	}
	/// Apply a penalty to a node. Caller holds the gate exclusively
	fn apply_penalty(&self, flat: usize, penalty: f64) {
		let node = self.grid.node(flat);
		let previous = node.get_penalty();
		node.set_penalty(penalty);
		if penalty > previous {
			for reset in self.grid.invalidate_dependents(flat) {
				self.partition.mark_dirty_around(&self.grid, reset);
			}
		}
		self.partition.mark_dirty_around(&self.grid, flat);
	}
	/// Compare the collections against the generation counter and record any transition
	fn refresh_stability(&self) {
		let generation = self.generation.load(Ordering::SeqCst);
		let settled = self.goal.load(Ordering::SeqCst) != NO_SUCCESSOR
			&& self.partition.all_stable()
			&& self.generation.load(Ordering::SeqCst) == generation;
		let mut stability = self.stability.lock();
		match (stability.status, settled) {
			(MapStatus::Unstable, true) => {
				// an update may have slipped in between the check and the lock
				if self.generation.load(Ordering::SeqCst) != generation {
					return;
				}
				stability.status = MapStatus::Stable;
				stability.computation_time = stability.unstable_since.elapsed();
				info!("Map stable after {:?}", stability.computation_time);
				self.stability_changed.notify_all();
			}
			(MapStatus::Stable, false) => {
				stability.status = MapStatus::Unstable;
				stability.unstable_since = Instant::now();
				debug!("Map unstable");
				self.stability_changed.notify_all();
			}
			_ => {}
		}
	}
}

/// Concurrent solver of the cost-to-goal field of a [Grid]
#[derive(Debug)]
pub struct PathFinder {
	/// State shared with the threads
	shared: Arc<Shared>,
	/// Workers followed by the monitor, empty until [PathFinder::start_solver]
	handles: Vec<JoinHandle<()>>,
}

impl PathFinder {
	/// Take ownership of `grid` and divide it into collections. No threads run until
	/// [PathFinder::start_solver] is called
	pub fn new(grid: Grid, config: &PlannerConfig) -> Self {
		let partition =
			Partition::divide_into_collections(&grid, config.collection_rows, config.collection_cols);
		debug!(
			"Divided a {:?} map into {} collections",
			grid.get_size(),
			partition.get_collections().len()
		);
		let shared = Shared {
			grid,
			partition,
			gate: RwLock::new(()),
			goal: AtomicUsize::new(NO_SUCCESSOR),
			running: AtomicBool::new(false),
			shutdown: AtomicBool::new(false),
			generation: AtomicU64::new(0),
			stability: Mutex::new(Stability {
				status: MapStatus::Unstable,
				unstable_since: Instant::now(),
				computation_time: Duration::ZERO,
			}),
			stability_changed: Condvar::new(),
			wake_lock: Mutex::new(()),
			wake: Condvar::new(),
			monitor_interval: config.monitor_poll_interval(),
			idle_interval: config.worker_idle_interval(),
		};
		PathFinder {
			shared: Arc::new(shared),
			handles: Vec::new(),
		}
	}
	/// Get the grid
	pub fn get_grid(&self) -> &Grid {
		&self.shared.grid
	}
	/// Get the collections the grid is divided into
	pub fn get_collections(&self) -> &[NodeCollection] {
		self.shared.partition.get_collections()
	}
	/// Get the goal, if one has been set
	pub fn get_goal(&self) -> Option<NodeIndex> {
		match self.shared.goal.load(Ordering::SeqCst) {
			NO_SUCCESSOR => None,
			flat => Some(self.shared.grid.to_index(flat)),
		}
	}
	/// Start (or resume) relaxing towards `goal`. A new goal discards every known route, the same
	/// goal carries on from the current field
	pub fn start_solver(&mut self, goal: NodeIndex) -> Result<(), MapError> {
		let flat = self.shared.grid.try_flat(goal)?;
		if self.shared.goal.load(Ordering::SeqCst) != flat {
			let _gate = self.shared.gate.write();
			self.shared.grid.reseed(flat);
			self.shared.goal.store(flat, Ordering::SeqCst);
			self.shared.partition.mark_all_dirty();
			self.shared.generation.fetch_add(1, Ordering::SeqCst);
			self.shared.mark_unstable();
			info!("Solving towards goal {:?}", goal);
		}
		self.shared.running.store(true, Ordering::SeqCst);
		if self.handles.is_empty() {
			self.spawn_threads();
		}
		self.shared.wake_workers();
		Ok(())
	}
	/// Spawn one worker per collection and the monitor
	fn spawn_threads(&mut self) {
		for id in 0..self.shared.partition.get_collections().len() {
			let shared = Arc::clone(&self.shared);
			let spawned = std::thread::Builder::new()
				.name(format!("path-finder-worker-{}", id))
				.spawn(move || worker_loop(shared, id));
			match spawned {
				Ok(handle) => self.handles.push(handle),
				Err(e) => error!("Failed spawning worker {}: {}", id, e),
			}
		}
		let shared = Arc::clone(&self.shared);
		let spawned = std::thread::Builder::new()
			.name("path-finder-monitor".to_string())
			.spawn(move || monitor_loop(shared));
		match spawned {
			Ok(handle) => self.handles.push(handle),
			Err(e) => error!("Failed spawning monitor: {}", e),
		}
	}
	/// Stop workers at the start of their next pass
	pub fn pause_solver(&self) {
		self.shared.running.store(false, Ordering::SeqCst);
		trace!("Solver paused");
	}
	/// Let workers carry on
	pub fn resume_solver(&self) {
		self.shared.running.store(true, Ordering::SeqCst);
		self.shared.wake_workers();
		trace!("Solver resumed");
	}
	/// Are workers allowed to run
	pub fn is_running(&self) -> bool {
		self.shared.running.load(Ordering::SeqCst)
	}
	/// Set the penalty of one node
	pub fn update_penalty_of_node(&self, index: NodeIndex, penalty: f64) -> Result<(), MapError> {
		self.update_penalties(&[(index, penalty)])
	}
	/// Set the penalties of many nodes as one atomic change. Nothing is applied if any entry is
	/// invalid
	pub fn update_penalties(&self, updates: &[(NodeIndex, f64)]) -> Result<(), MapError> {
		let mut flats = Vec::with_capacity(updates.len());
		for (index, penalty) in updates {
			if penalty.is_nan() || *penalty < 0.0 {
				return Err(MapError::InvalidPenalty(*penalty));
			}
			flats.push((self.shared.grid.try_flat(*index)?, *penalty));
		}
		if flats.is_empty() {
			return Ok(());
		}
		{
			let _gate = self.shared.gate.write();
			for (flat, penalty) in flats {
				self.shared.apply_penalty(flat, penalty);
			}
			self.shared.generation.fetch_add(1, Ordering::SeqCst);
			self.shared.mark_unstable();
		}
		self.shared.wake_workers();
		Ok(())
	}
	/// Is the field currently stable
	pub fn get_map_stable(&self) -> bool {
		self.get_status() == MapStatus::Stable
	}
	/// Get the aggregate state
	pub fn get_status(&self) -> MapStatus {
		self.shared.stability.lock().status
	}
	/// Block until the field is stable
	pub fn wait_for_map_stable(&self) {
		self.wait_for(MapStatus::Stable);
	}
	/// Block until the field is unstable
	pub fn wait_for_map_unstable(&self) {
		self.wait_for(MapStatus::Unstable);
	}
	/// Block until the field is stable or `timeout` elapses, returning whether it is stable
	pub fn wait_for_map_stable_timeout(&self, timeout: Duration) -> bool {
		self.wait_for_timeout(MapStatus::Stable, timeout)
	}
	/// Block until the field is unstable or `timeout` elapses, returning whether it is unstable
	pub fn wait_for_map_unstable_timeout(&self, timeout: Duration) -> bool {
		self.wait_for_timeout(MapStatus::Unstable, timeout)
	}
	/// Park on the condition variable until `status` is reached
	fn wait_for(&self, status: MapStatus) {
		let mut stability = self.shared.stability.lock();
		while stability.status != status {
			self.shared.stability_changed.wait(&mut stability);
		}
	}
	/// Park on the condition variable until `status` is reached or the deadline passes
	fn wait_for_timeout(&self, status: MapStatus, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut stability = self.shared.stability.lock();
		while stability.status != status {
			if self
				.shared
				.stability_changed
				.wait_until(&mut stability, deadline)
				.timed_out()
			{
				return stability.status == status;
			}
		}
		true
	}
	/// How long the last stabilisation took
	pub fn get_current_computation_time(&self) -> Duration {
		self.shared.stability.lock().computation_time
	}
	/// Run `read` against the field while holding it still. Fails when the field is not stable or
	/// no goal has been set
	pub fn with_stable_field<R>(&self, read: impl FnOnce(&Grid, NodeIndex) -> R) -> Result<R, PathError> {
		let _gate = self.shared.gate.read();
		if self.get_status() != MapStatus::Stable {
			return Err(PathError::MapUnstable);
		}
		let goal = self.get_goal().ok_or(PathError::GoalNotSet)?;
		Ok(read(&self.shared.grid, goal))
	}
	/// Render the current costs, see [Grid::render_costs]
	pub fn print_cost_map(&self) -> String {
		let _gate = self.shared.gate.read();
		self.shared.grid.render_costs()
	}
}

impl Drop for PathFinder {
	fn drop(&mut self) {
		self.shared.shutdown.store(true, Ordering::SeqCst);
		self.shared.wake_workers();
		for handle in self.handles.drain(..) {
			if handle.join().is_err() {
				error!("A path finder thread panicked");
			}
		}
	}
}

/// Relax one collection until shutdown, parking whenever there is nothing to do
#[cfg(not(tarpaulin_include))]
fn worker_loop(shared: Arc<Shared>, id: usize) {
	let collection = &shared.partition.get_collections()[id];
	while !shared.shutdown.load(Ordering::SeqCst) {
		if !shared.running.load(Ordering::SeqCst) || !collection.needs_pass() {
			let mut guard = shared.wake_lock.lock();
			if shared.shutdown.load(Ordering::SeqCst) {
				break;
			}
			shared.wake.wait_for(&mut guard, shared.idle_interval);
			continue;
		}
		let changed = {
			let _gate = shared.gate.read();
			let goal = shared.goal.load(Ordering::SeqCst);
			if goal == NO_SUCCESSOR {
				false
			} else {
				collection.run_pass(&shared.grid, goal, &shared.partition, &shared.generation)
			}
		};
		if changed {
			// neighbours may have been dirtied
			shared.wake_workers();
		}
	}
	trace!("Worker {} exiting", id);
}

/// Poll the collections for stability until shutdown
#[cfg(not(tarpaulin_include))]
fn monitor_loop(shared: Arc<Shared>) {
	while !shared.shutdown.load(Ordering::SeqCst) {
		shared.refresh_stability();
		std::thread::sleep(shared.monitor_interval);
	}
	trace!("Monitor exiting");
}
