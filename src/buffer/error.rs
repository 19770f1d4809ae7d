use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Invalid buffer capacity: {capacity}")]
    InvalidCapacity { capacity: usize },
}

impl BufferError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            BufferError::InvalidCapacity { .. } => false,
        }
    }
}
