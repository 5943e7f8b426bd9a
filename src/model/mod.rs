pub mod config;
pub mod duration;
pub mod mappings;
pub mod pitch;
pub mod tune;
