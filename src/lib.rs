pub mod api;
pub mod dates;
pub mod persist;
pub mod planner;
pub mod settings;
pub mod sync;
