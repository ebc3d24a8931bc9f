//! Command line front end

pub mod cli;
pub mod config;
pub mod error;
pub mod startup;

pub use config::{EngineConfig, TargetsFile};
pub use error::{AppError, AppResult};
