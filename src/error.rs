//! Crate-level error and the four-way failure taxonomy.
//!
//! Each component owns its error enum; `Error` wraps them so callers that
//! drive several components can use a single `?` chain.

use crate::descriptor::DescriptorError;
use crate::engine::EngineError;
use crate::invoice::InvoiceError;
use crate::router::RejectReason;
use crate::sync::SyncError;
use crate::xkey::KeyError;
use thiserror::Error;

/// How a failure should be surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsupported key/invoice input. Shown as "invalid input".
    Format,
    /// Endpoint unreachable or timed out. Retry is user-initiated.
    Connectivity,
    /// Network or wallet-type mismatch. Never auto-corrected.
    Compatibility,
    /// Unexpected failure inside the chain wallet engine.
    Engine,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Format => "format",
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::Compatibility => "compatibility",
            ErrorKind::Engine => "engine",
        }
    }

    pub fn is_retryable(&self) -> bool { matches!(self, ErrorKind::Connectivity) }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    #[error("Payment rejected: {0}")]
    Rejected(RejectReason),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Key(_) => ErrorKind::Format,
            Error::Descriptor(e) => e.kind(),
            Error::Engine(e) => e.kind(),
            Error::Sync(e) => e.kind(),
            Error::Invoice(_) => ErrorKind::Format,
            Error::Rejected(_) => ErrorKind::Compatibility,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Network;

    #[test]
    fn test_kind_mapping() {
        let e: Error = KeyError::MalformedLength(12).into();
        assert_eq!(e.kind(), ErrorKind::Format);

        let e: Error = SyncError::Connection {
            endpoint: "ssl://example.invalid:50002".into(),
            source: EngineError::Connection("refused".into()),
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::Connectivity);
        assert!(e.kind().is_retryable());
        assert!(e.to_string().contains("ssl://example.invalid:50002"));

        let e = Error::Rejected(RejectReason::NetworkMismatch { wallet: Network::Testnet, invoice: Network::Bitcoin });
        assert_eq!(e.kind(), ErrorKind::Compatibility);
    }
}
