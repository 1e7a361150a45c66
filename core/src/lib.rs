pub mod action;
pub mod challenge;
pub mod config;
pub mod normalize;
pub mod style;
pub mod testing;

pub use crate::config::Config;
