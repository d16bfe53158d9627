use std::path::PathBuf;

use shade_privacy::PrivacyError;
use thiserror::Error;

/// Which half of the key pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Proving,
    Verifying,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyKind::Proving => f.write_str("proving key"),
            KeyKind::Verifying => f.write_str("verifying key"),
        }
    }
}

/// The caller handed the engine mutually inconsistent data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("input {index}: witness root does not match the anchor")]
    AnchorMismatch { index: usize },

    #[error("input {index}: witness does not witness the note commitment")]
    WitnessMismatch { index: usize },

    #[error("input {index}: note is not owned by the spending key")]
    OwnerMismatch { index: usize },

    #[error("output {index}: paying key is not a canonical field element")]
    NonCanonicalAddress { index: usize },

    #[error("anchor is not a canonical field element")]
    NonCanonicalAnchor,

    #[error("value sum overflows u64")]
    ValueOverflow,

    #[error("unbalanced joinsplit: inputs {inputs} != outputs {outputs}")]
    Unbalanced { inputs: u64, outputs: u64 },

    #[error("malformed proof bytes")]
    MalformedProof,

    #[error("malformed joinsplit description: {0}")]
    MalformedDescription(&'static str),
}

/// Errors raised while preparing, proving or verifying JoinSplits and while
/// managing their keys.
#[derive(Debug, Error)]
pub enum JoinSplitError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{0} is not loaded")]
    KeyNotLoaded(KeyKind),

    #[error("cannot save {0}: it does not exist")]
    KeyAbsent(KeyKind),

    #[error("{0} path unknown")]
    KeyPathUnknown(KeyKind),

    #[error("{kind} I/O failed at {}: {source}", path.display())]
    Io {
        kind: KeyKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("witness does not satisfy the joinsplit constraint system")]
    UnsatisfiedWitness,

    #[error("constraint synthesis failed: {0}")]
    Synthesis(String),

    #[error(transparent)]
    Privacy(#[from] PrivacyError),
}

pub type Result<T> = std::result::Result<T, JoinSplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = JoinSplitError::KeyNotLoaded(KeyKind::Proving);
        assert_eq!(err.to_string(), "proving key is not loaded");

        let err = JoinSplitError::KeyAbsent(KeyKind::Verifying);
        assert_eq!(err.to_string(), "cannot save verifying key: it does not exist");

        let err: JoinSplitError = ProtocolError::Unbalanced {
            inputs: 5,
            outputs: 4,
        }
        .into();
        assert_eq!(err.to_string(), "unbalanced joinsplit: inputs 5 != outputs 4");
    }

    #[test]
    fn test_io_error_names_path() {
        let err = JoinSplitError::Io {
            kind: KeyKind::Verifying,
            path: PathBuf::from("/tmp/missing.vk"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/tmp/missing.vk"));
    }
}
