//! Configuration management for true-stretch
//!
//! - **profile**: the TOML config file and the stretch profile it carries
//! - **locate**: discovery of the game's settings files on disk

pub mod locate;
pub mod profile;

// Re-export commonly used types
pub use locate::{GameConfigLayout, TargetFile};
pub use profile::{Config, StretchProfile};
