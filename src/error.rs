use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MotifError>;

#[derive(Debug, Error)]
pub enum MotifError {
    #[error("Invalid grouping criterion: {0}")]
    InvalidCriterion(String),

    #[error("Invalid motif size {size} for criterion '{criterion}'")]
    InvalidMotifSize { criterion: String, size: usize },

    #[error("Group {0} has no events")]
    EmptyGroup(String),

    #[error("Window {start}..{end} exceeds sequence {sequence} of length {len}")]
    WindowOutOfBounds {
        sequence: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Sequence index {index} out of range ({count} sequences)")]
    SequenceOutOfRange { index: usize, count: usize },

    #[error("Invalid structural label: {0}")]
    InvalidTier(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to render group {group}: {message}")]
    Render { group: String, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<MotifError> for io::Error {
    fn from(err: MotifError) -> Self {
        let kind = match &err {
            MotifError::Io(e) => e.kind(),
            MotifError::InvalidCriterion(_)
            | MotifError::InvalidMotifSize { .. }
            | MotifError::InvalidTier(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::InvalidData,
        };
        match err {
            MotifError::Io(e) => e,
            other => io::Error::new(kind, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motif_size_message_carries_values() {
        let err = MotifError::InvalidMotifSize {
            criterion: "distance".into(),
            size: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("distance"));
        assert!(msg.contains('1'));
    }

    #[test]
    fn test_conversion_to_io_error_kind() {
        let err: io::Error = MotifError::InvalidCriterion("bogus".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("bogus"));

        let err: io::Error = MotifError::EmptyGroup("id1=3".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
