use thiserror::Error;

/// Errors raised by the note model, the commitment accumulator and note
/// encryption.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    #[error("commitment tree is full ({capacity} leaves)")]
    CapacityExceeded { capacity: u64 },

    #[error("position {position} is not tracked by this tree (latest leaf is {latest:?})")]
    UntrackedPosition { position: u64, latest: Option<u64> },

    #[error("cannot witness an empty tree")]
    EmptyTree,

    #[error("note decryption failed")]
    DecryptionFailed,

    #[error("note encryption failed")]
    EncryptionFailed,

    #[error("malformed note plaintext: {0}")]
    MalformedPlaintext(&'static str),
}

pub type Result<T> = std::result::Result<T, PrivacyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PrivacyError::CapacityExceeded { capacity: 16 };
        assert_eq!(err.to_string(), "commitment tree is full (16 leaves)");

        let err = PrivacyError::UntrackedPosition {
            position: 3,
            latest: Some(5),
        };
        assert!(err.to_string().contains("position 3"));
    }
}
