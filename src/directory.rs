// directory.rs - Yellow pages service
//
//! Capability directory: sellers advertise an opaque capability string,
//! buyers look capabilities up to discover peers. Discovery failures are
//! retryable and never fatal to the peer that hit them.

use actix::prelude::*;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::acl::PeerId;
use crate::error::DirectoryError;

/// One advertised capability.
#[derive(Debug, Clone)]
pub struct Registration {
    pub peer: PeerId,
    pub registered_at: Instant,
}

/// Directory counters.
#[derive(Debug, Default, Clone)]
pub struct DirectoryStats {
    pub registrations: u64,
    pub withdrawals: u64,
    pub lookups: u64,
}

/// Directory actor: capability -> advertising peers.
#[derive(Default)]
pub struct Directory {
    services: HashMap<String, Vec<Registration>>,
    stats: DirectoryStats,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    fn advertise(&mut self, peer: PeerId, capability: String) {
        let entries = self.services.entry(capability.clone()).or_default();
        // re-advertising refreshes the existing entry
        entries.retain(|r| r.peer != peer);
        entries.push(Registration {
            peer: peer.clone(),
            registered_at: Instant::now(),
        });
        self.stats.registrations += 1;
        info!(peer = %peer, capability = %capability, "capability advertised");
    }

    fn withdraw(&mut self, peer: &PeerId, capability: &str) -> Result<(), DirectoryError> {
        let Some(entries) = self.services.get_mut(capability) else {
            return Err(DirectoryError::NotAdvertised {
                peer: peer.clone(),
                capability: capability.to_string(),
            });
        };

        let before = entries.len();
        entries.retain(|r| r.peer != *peer);
        if entries.len() == before {
            return Err(DirectoryError::NotAdvertised {
                peer: peer.clone(),
                capability: capability.to_string(),
            });
        }
        if entries.is_empty() {
            self.services.remove(capability);
        }

        self.stats.withdrawals += 1;
        info!(peer = %peer, capability = %capability, "capability withdrawn");
        Ok(())
    }

    fn search(&mut self, capability: &str) -> Vec<PeerId> {
        self.stats.lookups += 1;
        let peers: Vec<PeerId> = self
            .services
            .get(capability)
            .map(|entries| entries.iter().map(|r| r.peer.clone()).collect())
            .unwrap_or_default();
        debug!(capability = %capability, found = peers.len(), "directory lookup");
        peers
    }

    pub fn stats(&self) -> &DirectoryStats {
        &self.stats
    }
}

impl Actor for Directory {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("directory started");
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Advertise a capability for a peer. Re-advertising is idempotent.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Advertise {
    pub peer: PeerId,
    pub capability: String,
}

/// Withdraw a peer's capability advertisement.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<(), DirectoryError>")]
pub struct Withdraw {
    pub peer: PeerId,
    pub capability: String,
}

/// Find every peer advertising a capability.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Vec<PeerId>")]
pub struct Lookup {
    pub capability: String,
}

/// Fetch directory counters.
#[derive(Debug, Clone, Message)]
#[rtype(result = "DirectoryStats")]
pub struct GetStats;

// =============================================================================
// Message Handlers
// =============================================================================

impl Handler<Advertise> for Directory {
    type Result = ();

    fn handle(&mut self, msg: Advertise, _ctx: &mut Self::Context) {
        self.advertise(msg.peer, msg.capability);
    }
}

impl Handler<Withdraw> for Directory {
    type Result = Result<(), DirectoryError>;

    fn handle(&mut self, msg: Withdraw, _ctx: &mut Self::Context) -> Self::Result {
        self.withdraw(&msg.peer, &msg.capability)
    }
}

impl Handler<Lookup> for Directory {
    type Result = MessageResult<Lookup>;

    fn handle(&mut self, msg: Lookup, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.search(&msg.capability))
    }
}

impl Handler<GetStats> for Directory {
    type Result = MessageResult<GetStats>;

    fn handle(&mut self, _msg: GetStats, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.stats.clone())
    }
}
