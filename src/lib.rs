pub mod config;
pub mod detection;
pub mod geometry;
pub mod io;
pub mod system;
pub mod tracking;
