//! `use bevy_uav_costfield::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::planner::{
	error::*, geo::*, grid::*, map_controller::*, map_generator::*, node::*, node_collection::*,
	path_finder::*, path_shortener::*, utilities::*, zones::*,
};

#[doc(hidden)]
pub use crate::{
	config::*,
	plugin::{path_layer::*, zone_layer::*, *},
};
