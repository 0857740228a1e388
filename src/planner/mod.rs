//! Live path planning for a UAV flying between two coordinates.
//!
//! The corridor between the start and the goal is sampled into a [crate::prelude::Grid] of nodes.
//! Every node knows the cost of the cheapest route from it to the goal, and that cost field is kept
//! converged by worker threads while no-fly zones and penalties change around the vehicle. A path is
//! read by descending the field and then shortened to the waypoints the vehicle has to turn at.
//!
//! Definitions:
//!
//! * Node - a sample point of the map with a world coordinate, a penalty paid for entering it, the
//! best known cost-to-goal and the neighbour that cost was reached through
//! * Penalty - extra cost of entering a node, infinite for a no-fly node
//! * Node collection - a rectangular band of the grid relaxed by one worker
//! * Stable - no cost changes under further relaxation for the current goal and penalties
//!
//! A 4x10 grid split into 2x2 collections, `V` marks the vehicle and `G` the goal:
//!
//! ```text
//!  _________________________________
//! |                |                |
//! | .  .  .  .  .  | .  .  .  G  .  |
//! |     coll 0     |     coll 1     |
//! | .  .  .  .  .  | .  .  .  .  .  |
//! |________________|________________|
//! |                |                |
//! | .  .  .  .  .  | .  .  .  .  .  |
//! |     coll 2     |     coll 3     |
//! | .  V  .  .  .  | .  .  .  .  .  |
//! |________________|________________|
//! ```
//!

pub mod error;
pub mod geo;
pub mod grid;
pub mod map_controller;
pub mod map_generator;
pub mod node;
pub mod node_collection;
pub mod path_finder;
pub mod path_shortener;
pub mod utilities;
pub mod zones;
