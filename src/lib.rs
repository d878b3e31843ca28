//! Config patch engine for applying a lower resolution as a true stretch
//!
//! Stages, each callable on its own:
//! - `validator`: check the (native, target) pair and the game's last saved state
//! - `planner`: derive the field mutations from the parsed settings files
//! - `diff`: render the plan for review without touching disk
//! - `apply`: back up, write and atomically commit each file
//!
//! `engine::StretchEngine` wires them together for the CLI.

#![forbid(unsafe_code)]

pub mod apply;
pub mod config;
pub mod constants;
pub mod diff;
pub mod display;
pub mod document;
pub mod engine;
pub mod error;
pub mod planner;
pub mod resolution;
pub mod validator;

pub use apply::{ApplyResult, DiskOps, FileOps};
pub use diff::DiffLine;
pub use document::ConfigDocument;
pub use engine::StretchEngine;
pub use error::{ApplyError, ApplyStage, PlanWarning, ValidationError};
pub use planner::{FieldReason, PatchField, PatchPlan};
pub use resolution::ResolutionSpec;
pub use validator::ValidatedPair;
