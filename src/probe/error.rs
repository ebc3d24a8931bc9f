//! Probe, check and transport errors
//!
//! None of these cross the engine boundary: the runner records them in the
//! result tree.

use crate::params::ConfigurationError;
use crate::result::ResultError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Timeout after {seconds:.1}s: {url}")]
    Timeout { url: String, seconds: f64 },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Cannot read response body: {0}")]
    Body(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// The probe captured no response to inspect
    #[error("No response available to check")]
    NoResponse,

    /// The response could not be parsed
    #[error("{0}")]
    Protocol(String),

    #[error(transparent)]
    Parameter(#[from] ConfigurationError),

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parameter(#[from] ConfigurationError),

    #[error("Result error: {0}")]
    Result(#[from] ResultError),
}
