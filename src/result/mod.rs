//! Hierarchical probe results
//!
//! A [`ProbeResult`] is the root of one probe execution. It holds named
//! sub-results for multi-step probes and one [`CheckResult`] leaf per check,
//! in the order they ran.

pub mod error;
pub mod node;
pub mod report;

pub use error::{ResultError, ResultResult};
pub use node::{CheckResult, ProbeResult, ResultEntry, ResultNode, DEFAULT_MESSAGE};
pub use report::ResultReport;
