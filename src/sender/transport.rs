use crate::domain::TimeUnit;
use bytes::Bytes;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Write rejected: HTTP {status} - {message}")]
    Rejected { status: u16, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// How a transport wants records grouped into payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// All pending records in one payload.
    #[default]
    Batch,
    /// One payload per record, for size-limited datagrams.
    PerRecord,
}

/// Ships encoded line-protocol payloads to the database.
///
/// Implementations own their network timeouts; a send that fails is
/// reported as an error and never retried here.
pub trait Transport: Send + Sync {
    fn send(&self, payload: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn framing(&self) -> Framing {
        Framing::Batch
    }

    /// Timestamp precision the receiving end expects.
    fn precision(&self) -> TimeUnit {
        TimeUnit::Milliseconds
    }
}
