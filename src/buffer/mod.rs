pub mod bounded;
pub mod error;

pub use bounded::BoundedBatchQueue;
pub use error::BufferError;

/// Queue size used when none is configured; also the largest batch handed
/// to a transport in one call.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5_000;
