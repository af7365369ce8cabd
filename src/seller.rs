// seller.rs - Seller negotiation server
//
//! Long-lived responder owning one catalog. Serves call-for-proposal
//! requests read-only through the matcher, and purchase orders through an
//! atomic catalog removal. Both responders run inside the same actor
//! context, so catalog access is serialized and at most one of any number
//! of racing purchase orders for an item can succeed.

use actix::prelude::*;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::acl::{Envelope, Payload, PeerId, Performative};
use crate::catalog::Catalog;
use crate::directory::{Advertise, Directory, Withdraw};
use crate::model::{ItemRecord, SMARTPHONE_MARKET};
use crate::router::{Attach, DeliverEnvelope, Detach, Dispatch, Router};

/// Reply text for an empty match and for a lost purchase race.
pub const NOT_AVAILABLE: &str = "not-available";

/// Seller policy knobs. All are host choices, not protocol requirements.
#[derive(Debug, Clone)]
pub struct SellerConfig {
    /// Capability advertised in the directory.
    pub capability: String,

    /// Stop this peer once a sale empties the catalog.
    pub retire_when_sold_out: bool,

    /// Log the stock on a fixed cadence when set.
    pub report_interval: Option<Duration>,
}

impl Default for SellerConfig {
    fn default() -> Self {
        Self {
            capability: SMARTPHONE_MARKET.to_string(),
            retire_when_sold_out: false,
            report_interval: None,
        }
    }
}

/// Lifecycle events surfaced to the hosting collaborator, which decides
/// what (if anything) to do about them.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub enum SellerEvent {
    SoldOut { seller: PeerId },
}

/// Seller peer actor.
pub struct SellerAgent {
    id: PeerId,
    catalog: Catalog,
    config: SellerConfig,
    directory: Addr<Directory>,
    router: Addr<Router>,
    lifecycle: Option<Recipient<SellerEvent>>,
    sales: u64,
}

impl SellerAgent {
    pub fn new(
        id: PeerId,
        config: SellerConfig,
        directory: Addr<Directory>,
        router: Addr<Router>,
    ) -> Self {
        Self {
            id,
            catalog: Catalog::new(),
            config,
            directory,
            router,
            lifecycle: None,
            sales: 0,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_lifecycle(mut self, recipient: Recipient<SellerEvent>) -> Self {
        self.lifecycle = Some(recipient);
        self
    }

    /// Offer responder: evaluate a call-for-proposal against the catalog.
    /// Read-only; an undecodable criteria payload drops that one message.
    fn serve_offer_request(&mut self, request: Envelope) {
        let criteria = match request.payload.decode_criteria() {
            Ok(criteria) => criteria,
            Err(e) => {
                warn!(peer = %self.id, error = %e, "dropping call-for-proposal with undecodable criteria");
                return;
            }
        };

        let offers = self.catalog.matching(&criteria);
        debug!(peer = %self.id, buyer = %request.sender, offers = offers.len(), "served offer request");

        // zero matches must travel as a refusal, never as an empty proposal
        let reply = if offers.is_empty() {
            request
                .reply(self.id.clone(), Performative::Refuse)
                .with_payload(Payload::text(NOT_AVAILABLE))
        } else {
            match Payload::items(&offers) {
                Ok(payload) => request
                    .reply(self.id.clone(), Performative::Propose)
                    .with_payload(payload),
                Err(e) => {
                    warn!(peer = %self.id, error = %e, "failed to encode offer list");
                    return;
                }
            }
        };

        self.router.do_send(Dispatch { envelope: reply });
    }

    /// Order responder: atomically take the named item off the catalog.
    /// The removal is the only mutation and happens-or-not as one step.
    fn serve_purchase_order(&mut self, order: Envelope, ctx: &mut Context<Self>) {
        let Some(key) = order.payload.as_text().map(str::to_owned) else {
            warn!(peer = %self.id, buyer = %order.sender, "dropping purchase order without an item key");
            return;
        };

        match self.catalog.remove_first(&key) {
            Some(item) => {
                self.sales += 1;
                info!(peer = %self.id, item = %item.name, price = item.price, buyer = %order.sender, "item sold");
                self.router.do_send(Dispatch {
                    envelope: order.reply(self.id.clone(), Performative::Inform),
                });

                if self.catalog.is_empty() {
                    info!(peer = %self.id, "catalog sold out");
                    if let Some(lifecycle) = &self.lifecycle {
                        lifecycle.do_send(SellerEvent::SoldOut {
                            seller: self.id.clone(),
                        });
                    }
                    if self.config.retire_when_sold_out {
                        ctx.stop();
                    }
                }
            }
            None => {
                // either a buyer lost the race or the order names a key we
                // never had; both get FAILURE, and the anomaly is logged
                warn!(peer = %self.id, item = %key, buyer = %order.sender, "purchase order for absent item");
                self.router.do_send(Dispatch {
                    envelope: order
                        .reply(self.id.clone(), Performative::Failure)
                        .with_payload(Payload::text(NOT_AVAILABLE)),
                });
            }
        }
    }
}

impl Actor for SellerAgent {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(peer = %self.id, capability = %self.config.capability, stock = self.catalog.len(), "seller ready");

        self.router.do_send(Attach {
            peer: self.id.clone(),
            mailbox: ctx.address().recipient(),
        });

        let advertise = self.directory.send(Advertise {
            peer: self.id.clone(),
            capability: self.config.capability.clone(),
        });
        ctx.spawn(advertise.into_actor(self).map(|result, act, _ctx| {
            if let Err(e) = result {
                // stays up, just invisible to buyers until re-advertised
                warn!(peer = %act.id, error = %e, "directory advertisement failed");
            }
        }));

        if let Some(every) = self.config.report_interval {
            ctx.run_interval(every, |act, _ctx| {
                if !act.catalog.is_empty() {
                    let stock: Vec<String> = act
                        .catalog
                        .iter()
                        .map(|r| format!("{} @ {}", r.name, r.price))
                        .collect();
                    info!(peer = %act.id, stock = ?stock, "items on sale");
                }
            });
        }
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        self.directory.do_send(Withdraw {
            peer: self.id.clone(),
            capability: self.config.capability.clone(),
        });
        self.router.do_send(Detach {
            peer: self.id.clone(),
        });
        info!(peer = %self.id, sales = self.sales, "seller terminating");
        Running::Stop
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Operator action: add a record to the catalog (duplicates shelve).
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct InsertItem {
    pub record: ItemRecord,
}

/// Operator action: insert-or-overwrite a record by its key.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct ReplaceItem {
    pub record: ItemRecord,
}

/// Snapshot of the records currently on sale.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Vec<ItemRecord>")]
pub struct Inventory;

// =============================================================================
// Message Handlers
// =============================================================================

impl Handler<DeliverEnvelope> for SellerAgent {
    type Result = ();

    fn handle(&mut self, msg: DeliverEnvelope, ctx: &mut Self::Context) {
        let envelope = msg.envelope;
        match envelope.performative {
            Performative::Cfp => self.serve_offer_request(envelope),
            Performative::AcceptProposal => self.serve_purchase_order(envelope, ctx),
            other => debug!(
                peer = %self.id,
                performative = other.as_str(),
                "ignoring envelope no seller responder handles"
            ),
        }
    }
}

impl Handler<InsertItem> for SellerAgent {
    type Result = ();

    fn handle(&mut self, msg: InsertItem, _ctx: &mut Self::Context) {
        info!(peer = %self.id, item = %msg.record.name, price = msg.record.price, "item inserted into catalog");
        self.catalog.insert(msg.record);
    }
}

impl Handler<ReplaceItem> for SellerAgent {
    type Result = ();

    fn handle(&mut self, msg: ReplaceItem, _ctx: &mut Self::Context) {
        info!(peer = %self.id, item = %msg.record.name, price = msg.record.price, "item replaced in catalog");
        self.catalog.replace(msg.record);
    }
}

impl Handler<Inventory> for SellerAgent {
    type Result = MessageResult<Inventory>;

    fn handle(&mut self, _msg: Inventory, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.catalog.iter().cloned().collect())
    }
}
