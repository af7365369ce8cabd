// lib.rs - Decentralized buyer/seller negotiation agents
//
// Autonomous buyer and seller peers discover each other through a
// directory service, exchange call-for-proposal / offer / purchase-order
// envelopes, and settle one transaction per negotiation round. Each peer
// is an actor processing one message at a time; peers coordinate only by
// exchanging envelopes.

pub mod acl;
pub mod buyer;
pub mod catalog;
pub mod correlation;
pub mod directory;
pub mod error;
pub mod matcher;
pub mod model;
pub mod router;
pub mod seller;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use acl::{ConversationId, Envelope, Payload, PeerId, Performative};
pub use buyer::{
    BuyerAgent, CancelSession, NegotiationCompleted, OpenSessions, Session, SessionEffect,
    SessionOutcome, SessionState, StartNegotiation,
};
pub use catalog::Catalog;
pub use correlation::{CorrelationToken, ReplyRouter, SessionId};
pub use directory::{Advertise, Directory, Lookup, Withdraw};
pub use error::{CodecError, DirectoryError, FailureReason};
pub use model::{ItemRecord, Platform, RequestCriteria, SMARTPHONE_MARKET};
pub use router::{Attach, DeliverEnvelope, Detach, Dispatch, Router};
pub use seller::{InsertItem, Inventory, ReplaceItem, SellerAgent, SellerConfig, SellerEvent};
pub use telemetry::{TracingConfig, TracingFormat, init_tracing};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::acl::{ConversationId, Envelope, Payload, PeerId, Performative};
    pub use crate::buyer::{BuyerAgent, NegotiationCompleted, SessionOutcome, StartNegotiation};
    pub use crate::catalog::Catalog;
    pub use crate::correlation::{CorrelationToken, SessionId};
    pub use crate::directory::Directory;
    pub use crate::error::FailureReason;
    pub use crate::model::{ItemRecord, Platform, RequestCriteria};
    pub use crate::router::Router;
    pub use crate::seller::{SellerAgent, SellerConfig};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
