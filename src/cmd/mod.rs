pub mod config;
pub mod stubgen;
