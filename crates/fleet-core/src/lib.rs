pub mod aggregator;
pub mod config;
pub mod error;
pub mod git_output;
pub mod status_cache;
pub mod topic;
pub mod types;
pub mod validate;

pub use error::{FleetError, Result, ValidationError};
