//! Monitors a classifieds listing page, extracts new property ads and
//! forwards them to a remote collector.

pub mod blacklist;
pub mod config;
pub mod cookies;
pub mod error;
pub mod exclusion;
pub mod models;
pub mod monitor;
pub mod normalize;
pub mod pacing;
pub mod scrapers;
pub mod sender;

pub use config::Config;
pub use monitor::{Monitor, Statistics};
