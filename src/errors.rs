//! Typed error taxonomy. One enum per failure domain, composed into
//! [`WaveScoutError`] and derived with `thiserror` instead of hand-rolled
//! `From` impls.

use thiserror::Error;

use crate::types::SignalHandle;

/// Input errors: unsupported/missing file, malformed session document,
/// invalid configuration value.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("unsupported waveform format: {0}")]
    UnsupportedFormat(String),
    #[error("malformed session document: {0}")]
    MalformedDocument(String),
    #[error("invalid tick density {0} (must be in (0.0, 2.0])")]
    InvalidTickDensity(f64),
}

/// Data errors: corrupt signal block, negative time, unknown var type.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("corrupt waveform record for handle {0}")]
    Corrupt(SignalHandle),
    #[error("negative time value: {0}")]
    NegativeTime(i64),
    #[error("unknown variable type: {0}")]
    UnknownVarType(String),
    #[error("unknown signal handle: {0}")]
    UnknownHandle(SignalHandle),
}

/// State errors: operation targets a stale/missing instance id.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("node instance id {0} does not exist")]
    MissingNode(u64),
    #[error("no active session")]
    NoSession,
}

/// Resource errors: allocation/worker pool problems.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("worker pool is shut down")]
    WorkerPoolShutdown,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error composed from every domain, returned by fallible public
/// operations (DB open, controller operations, persistence).
#[derive(Debug, Error)]
pub enum WaveScoutError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("vcd parse error: {0}")]
    VcdParse(String),
}

pub type WaveScoutResult<T> = Result<T, WaveScoutError>;
