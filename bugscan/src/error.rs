//! Error types for bugscan.

use std::path::PathBuf;
use thiserror::Error;

use crate::scanner::RunState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("concurrency limit must be at least 1")]
    InvalidConcurrency,

    #[error("cannot add job {name:?}: run is already {state}")]
    JobAfterStart { name: String, state: RunState },

    #[error("cannot start run: it is already {0}")]
    AlreadyStarted(RunState),

    #[error("blocking start called from inside an async runtime, use run instead")]
    InsideRuntime,

    #[error("failed to start worker runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("worker stopped abnormally: {0}")]
    Worker(String),

    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: &'static str },

    #[error("cannot resolve {host}: {reason}")]
    Dns { host: String, reason: String },

    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("server list is empty")]
    EmptyServerList,

    #[error("failed to read {}: {source}", path.display())]
    ReadTargets {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
