pub mod stubgen;
