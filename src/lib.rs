//! A live, concurrently relaxed cost field for UAV path planning, usable on its own or as a plugin
//! to the Bevy game engine
//!

pub mod config;
pub mod planner;
pub mod plugin;

pub mod prelude;
