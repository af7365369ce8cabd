// router.rs - In-process envelope transport
//
//! Delivers envelopes to peer mailboxes by address. Delivery is
//! best-effort: an unknown receiver drops that copy with a warning, and
//! nothing here guarantees at-least-once semantics.

use actix::prelude::*;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::acl::{Envelope, PeerId};

/// Deliver one envelope into a peer's mailbox.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct DeliverEnvelope {
    pub envelope: Envelope,
}

/// Attach a peer mailbox under its address.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Attach {
    pub peer: PeerId,
    pub mailbox: Recipient<DeliverEnvelope>,
}

/// Detach a peer's mailbox.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Detach {
    pub peer: PeerId,
}

/// Fan an envelope out to each of its receivers.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Dispatch {
    pub envelope: Envelope,
}

/// Transport actor: peer address -> mailbox.
#[derive(Default)]
pub struct Router {
    peers: DashMap<PeerId, Recipient<DeliverEnvelope>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for Router {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("router started");
    }
}

impl Handler<Attach> for Router {
    type Result = ();

    fn handle(&mut self, msg: Attach, _ctx: &mut Self::Context) {
        debug!(peer = %msg.peer, "peer attached");
        self.peers.insert(msg.peer, msg.mailbox);
    }
}

impl Handler<Detach> for Router {
    type Result = ();

    fn handle(&mut self, msg: Detach, _ctx: &mut Self::Context) {
        debug!(peer = %msg.peer, "peer detached");
        self.peers.remove(&msg.peer);
    }
}

impl Handler<Dispatch> for Router {
    type Result = ();

    fn handle(&mut self, msg: Dispatch, _ctx: &mut Self::Context) {
        for receiver in &msg.envelope.receivers {
            match self.peers.get(receiver) {
                Some(mailbox) => mailbox.do_send(DeliverEnvelope {
                    envelope: msg.envelope.clone(),
                }),
                None => warn!(
                    receiver = %receiver,
                    performative = msg.envelope.performative.as_str(),
                    "dropping envelope for unknown receiver"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{ConversationId, Performative};
    use crate::testutil::Collector;
    use std::time::Duration;
    use tokio::time::timeout;

    fn envelope_to(receivers: &[&str]) -> Envelope {
        Envelope::new(
            Performative::Inform,
            PeerId::from("sender"),
            ConversationId::for_topic("smartphone-market"),
        )
        .to_all(receivers.iter().map(|r| PeerId::from(*r)))
    }

    #[actix_rt::test]
    async fn test_dispatch_reaches_every_attached_receiver() {
        let router = Router::new().start();
        let (probe_a, mut rx_a) = Collector::<DeliverEnvelope>::channel();
        let (probe_b, mut rx_b) = Collector::<DeliverEnvelope>::channel();

        router
            .send(Attach {
                peer: PeerId::from("a"),
                mailbox: probe_a.start().recipient(),
            })
            .await
            .unwrap();
        router
            .send(Attach {
                peer: PeerId::from("b"),
                mailbox: probe_b.start().recipient(),
            })
            .await
            .unwrap();

        router
            .send(Dispatch {
                envelope: envelope_to(&["a", "b"]),
            })
            .await
            .unwrap();

        let got_a = timeout(Duration::from_secs(1), rx_a.recv()).await.unwrap().unwrap();
        let got_b = timeout(Duration::from_secs(1), rx_b.recv()).await.unwrap().unwrap();
        assert_eq!(got_a.envelope.sender, PeerId::from("sender"));
        assert_eq!(got_b.envelope.sender, PeerId::from("sender"));
    }

    #[actix_rt::test]
    async fn test_unknown_receiver_is_dropped_silently() {
        let router = Router::new().start();
        let (probe, mut rx) = Collector::<DeliverEnvelope>::channel();

        router
            .send(Attach {
                peer: PeerId::from("a"),
                mailbox: probe.start().recipient(),
            })
            .await
            .unwrap();

        router
            .send(Dispatch {
                envelope: envelope_to(&["ghost", "a"]),
            })
            .await
            .unwrap();

        // the known receiver still gets its copy
        let got = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(got.envelope.receivers.len(), 2);
    }

    #[actix_rt::test]
    async fn test_detached_peer_no_longer_receives() {
        let router = Router::new().start();
        let (probe, mut rx) = Collector::<DeliverEnvelope>::channel();

        router
            .send(Attach {
                peer: PeerId::from("a"),
                mailbox: probe.start().recipient(),
            })
            .await
            .unwrap();
        router.send(Detach { peer: PeerId::from("a") }).await.unwrap();
        router
            .send(Dispatch {
                envelope: envelope_to(&["a"]),
            })
            .await
            .unwrap();

        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }
}
