pub mod config;
pub mod sessions;
pub mod sound;
pub mod start;
pub mod stats;
