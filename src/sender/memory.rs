use super::transport::{Framing, Transport, TransportError};
use crate::domain::TimeUnit;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Recorded {
    payloads: Mutex<Vec<Bytes>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

/// Keeps every payload in memory. Clones share the same recording, so a
/// test can hand one clone to a sender and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    recorded: Arc<Recorded>,
    framing: Framing,
    precision: Option<TimeUnit>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that wants one payload per record, like UDP.
    pub fn per_record() -> Self {
        Self {
            framing: Framing::PerRecord,
            ..Self::default()
        }
    }

    pub fn with_precision(mut self, precision: TimeUnit) -> Self {
        self.precision = Some(precision);
        self
    }

    /// While failing, every send returns an error and records nothing.
    pub fn set_failing(&self, failing: bool) {
        self.recorded.failing.store(failing, Ordering::SeqCst);
    }

    /// Successfully delivered payloads, oldest first.
    pub fn payloads(&self) -> Vec<String> {
        self.recorded
            .payloads
            .lock()
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect()
    }

    /// Number of send calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.recorded.attempts.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.recorded.payloads.lock().clear();
    }
}

impl Transport for MemoryTransport {
    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        self.recorded.attempts.fetch_add(1, Ordering::SeqCst);
        if self.recorded.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable(
                "memory transport set to fail".to_string(),
            ));
        }
        self.recorded.payloads.lock().push(payload);
        Ok(())
    }

    fn framing(&self) -> Framing {
        self.framing
    }

    fn precision(&self) -> TimeUnit {
        self.precision.unwrap_or(TimeUnit::Milliseconds)
    }
}
