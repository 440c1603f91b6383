//! Error types for the ingestion pipeline

use std::fmt;

/// Error opening an input file's gzip stream, or connecting a shard writer's
/// memcached client before any lines are read.
#[derive(Debug)]
pub enum OpenError {
    Io(std::io::Error),
    Connect(String),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to open input file: {e}"),
            Self::Connect(msg) => write!(f, "failed to connect shard writer: {msg}"),
        }
    }
}

impl std::error::Error for OpenError {}

impl From<std::io::Error> for OpenError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Error from a single `set_multi` call against a memcached endpoint.
#[derive(Debug)]
pub enum WriteError {
    /// The client failed to connect or the call raised before returning
    /// a per-key result at all. The whole batch is treated as failed.
    Connect(String),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "memcached write failed: {msg}"),
        }
    }
}

impl std::error::Error for WriteError {}

/// Error constructing a `DeviceRouting` from CLI/config host:port strings.
#[derive(Debug)]
pub enum RoutingError {
    InvalidAddress { field: &'static str, value: String },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { field, value } => {
                write!(f, "invalid {field} address: `{value}`")
            }
        }
    }
}

impl std::error::Error for RoutingError {}
