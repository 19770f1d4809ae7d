//! Bounded queueing of measurements and delivery through a [`Transport`].

pub mod any;
pub mod http;
pub mod memory;
pub mod transport;
pub mod udp;

pub use any::AnyTransport;
pub use http::{HttpConfig, HttpTransport};
pub use memory::MemoryTransport;
pub use transport::{Framing, Transport, TransportError};
pub use udp::UdpTransport;

use crate::buffer::{BoundedBatchQueue, BufferError};
use crate::domain::Measurement;
use crate::protocol::{Encoder, LineProtocolEncoder};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

/// Running totals for one sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SenderStats {
    pub flushes_succeeded: u64,
    pub flushes_failed: u64,
    pub records_sent: u64,
    pub records_evicted: u64,
    pub bytes_sent: u64,
}

/// Result of one [`Sender::flush`].
#[derive(Debug)]
pub enum FlushOutcome {
    /// Nothing was pending; the transport was not called.
    Empty,
    Sent { records: usize, bytes: usize },
    /// The transport failed; the records stay queued for the next flush.
    Retained {
        records: usize,
        error: TransportError,
    },
}

impl FlushOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, FlushOutcome::Retained { .. })
    }
}

/// Owns the pending measurements and hands them to a transport on flush.
///
/// Offering never blocks: once `capacity` records are pending the oldest
/// one is dropped for every new one. A failed flush keeps everything, so
/// the records are retried together with newer ones on the next flush.
pub struct Sender<T: Transport> {
    queue: BoundedBatchQueue<Measurement>,
    encoder: LineProtocolEncoder,
    transport: T,
    stats: SenderStats,
}

impl<T: Transport> Sender<T> {
    pub fn new(transport: T, capacity: usize) -> Result<Self, BufferError> {
        Ok(Self {
            queue: BoundedBatchQueue::new(capacity)?,
            encoder: LineProtocolEncoder::new(transport.precision()),
            transport,
            stats: SenderStats::default(),
        })
    }

    pub fn offer(&mut self, measurement: Measurement) {
        if let Some(dropped) = self.queue.offer(measurement) {
            debug!(
                measurement = dropped.name(),
                capacity = self.queue.capacity(),
                "Queue full, dropped oldest measurement"
            );
        }
    }

    pub fn offer_all<I>(&mut self, measurements: I)
    where
        I: IntoIterator<Item = Measurement>,
    {
        for measurement in measurements {
            self.offer(measurement);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> SenderStats {
        SenderStats {
            records_evicted: self.queue.evicted(),
            ..self.stats
        }
    }

    pub async fn flush(&mut self) -> FlushOutcome {
        if self.queue.is_empty() {
            return FlushOutcome::Empty;
        }

        let flush_id = Uuid::new_v4();
        let records = self.queue.len();
        let result = match self.transport.framing() {
            Framing::Batch => self.send_batch().await,
            Framing::PerRecord => self.send_each().await,
        };

        match result {
            Ok(bytes) => {
                self.queue.clear();
                self.stats.flushes_succeeded += 1;
                self.stats.records_sent += records as u64;
                self.stats.bytes_sent += bytes as u64;
                debug!(%flush_id, records, bytes, "Flushed measurements");
                FlushOutcome::Sent { records, bytes }
            }
            Err(error) => {
                self.stats.flushes_failed += 1;
                warn!(
                    %flush_id,
                    records,
                    error = %error,
                    "Failed to send measurements, keeping them for the next flush"
                );
                FlushOutcome::Retained { records, error }
            }
        }
    }

    /// Discards pending records without sending them. Returns how many were
    /// dropped.
    pub fn close(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        if dropped > 0 {
            debug!(dropped, "Sender closed with pending measurements");
        }
        dropped
    }

    async fn send_batch(&mut self) -> Result<usize, TransportError> {
        let payload = Bytes::from(self.encoder.encode_all(self.queue.as_slice()));
        let bytes = payload.len();
        self.transport.send(payload).await?;
        Ok(bytes)
    }

    /// Succeeds if at least one record got through.
    async fn send_each(&mut self) -> Result<usize, TransportError> {
        let payloads: Vec<Bytes> = self
            .queue
            .iter()
            .map(|m| Bytes::from(self.encoder.encode(m)))
            .collect();

        let mut sent_bytes = 0;
        let mut sent_any = false;
        let mut last_error = None;
        for payload in payloads {
            let bytes = payload.len();
            match self.transport.send(payload).await {
                Ok(()) => {
                    sent_any = true;
                    sent_bytes += bytes;
                }
                Err(error) => last_error = Some(error),
            }
        }

        match last_error {
            Some(error) if !sent_any => Err(error),
            _ => Ok(sent_bytes),
        }
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("queue", &self.queue)
            .field("encoder", &self.encoder)
            .field("transport", &self.transport)
            .field("stats", &self.stats)
            .finish()
    }
}
