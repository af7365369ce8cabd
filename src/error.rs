// error.rs
// Error taxonomy shared across the negotiation core

use crate::acl::PeerId;

/// Payload encode/decode errors.
///
/// Always local to the message carrying the payload: the receiving peer
/// drops that one message and keeps serving others.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("payload is not a serialized blob")]
    NotBinary,

    #[error("payload is not a text value")]
    NotText,

    #[error("payload does not decode: {0}")]
    Json(#[from] serde_json::Error),
}

/// Directory (yellow pages) errors. Retryable, never peer-fatal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("capability '{capability}' is not advertised by peer '{peer}'")]
    NotAdvertised { peer: PeerId, capability: String },
}

/// Why a buyer negotiation session ended without a purchase.
///
/// Surfaced to the session owner through the completion notification; a
/// failed session never affects other sessions or peers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("no sellers advertise the requested capability")]
    NoSellers,

    #[error("not available")]
    NoOffers,

    #[error("sold to another buyer")]
    LostRace,

    #[error("directory lookup failed: {0}")]
    Directory(String),

    #[error("payload codec failure: {0}")]
    Codec(String),

    #[error("cancelled by owner")]
    Cancelled,

    #[error("timed out waiting for replies")]
    TimedOut,
}
