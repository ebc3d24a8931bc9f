//! Result lifecycle misuse errors

use thiserror::Error;

pub type ResultResult<T> = std::result::Result<T, ResultError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResultError {
    #[error("result already started")]
    AlreadyStarted,

    #[error("result was never started")]
    NotStarted,

    #[error("result already stopped")]
    AlreadyStopped,

    #[error("result not stopped yet")]
    NotStopped,

    #[error("result is finalized and cannot change")]
    Finalized,
}
