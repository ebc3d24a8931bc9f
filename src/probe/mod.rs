//! Probe execution
//!
//! [`runner::ProbeRunner`] drives one probe plugin against one target and
//! returns the result tree. Requests go through a [`transport::Transport`],
//! so the engine itself never opens a socket.

pub mod cancel;
pub mod error;
pub mod runner;
pub mod session;
pub mod target;
pub mod template;
pub mod traits;
pub mod transport;

pub use cancel::CancelSignal;
pub use error::{CheckError, ProbeError, TransportError};
pub use runner::{ExecutionPlan, ProbeRunner, RunnerOptions};
pub use session::ProbeSession;
pub use target::{CheckUsage, TargetConfig};
pub use traits::{Check, CheckContext, CheckOutcome, Probe};
pub use transport::{
    HttpTransport, ProbeRequest, ProbeResponse, RequestMethod, Transport, TransportOptions,
};
