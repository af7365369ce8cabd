// buyer.rs - Buyer negotiation sessions and their driving peer
//
//! One `Session` per purchase attempt: discover sellers, broadcast a
//! call-for-proposal, collect every reply of the round, order from the
//! cheapest proposer, await the confirmation. The session itself is a
//! pure tagged-state value; `BuyerAgent` is the single-threaded driver
//! that owns all sessions of one buyer peer and routes replies to them
//! through correlation tokens. No session ever sees another session's
//! replies.

use actix::prelude::*;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::acl::{ConversationId, Envelope, Payload, PeerId, Performative};
use crate::correlation::{CorrelationToken, ReplyRouter, SessionId};
use crate::directory::{Directory, Lookup};
use crate::error::{CodecError, FailureReason};
use crate::matcher;
use crate::model::{ItemRecord, RequestCriteria};
use crate::router::{Attach, DeliverEnvelope, Detach, Dispatch, Router};

/// Best offer seen so far in a round.
#[derive(Debug, Clone, PartialEq)]
pub struct BestOffer {
    pub item: ItemRecord,
    pub seller: PeerId,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Purchased { item: ItemRecord, seller: PeerId },
    Failed(FailureReason),
}

/// Session step. The reply-collection states carry their own outstanding
/// token; everything a step needs lives in its variant.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Waiting for one reply per seller the round was broadcast to.
    Collecting {
        reply_with: CorrelationToken,
        expected: usize,
        received: usize,
        best: Option<BestOffer>,
    },
    /// Purchase order sent to the winning seller, awaiting confirmation.
    Confirming {
        reply_with: CorrelationToken,
        offer: BestOffer,
    },
    /// Terminal; the session processes nothing further.
    Closed(SessionOutcome),
}

/// What the driver must do after feeding a session an event.
#[derive(Debug)]
pub enum SessionEffect {
    Idle,
    Send(Envelope),
    Done(SessionOutcome),
}

/// One buyer-side negotiation, owned exclusively by its driving peer.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    buyer: PeerId,
    conversation: ConversationId,
    criteria: RequestCriteria,
    sellers: Vec<PeerId>,
    state: SessionState,
}

impl Session {
    /// Open a session over the sellers discovered for this round.
    ///
    /// The expected reply count is frozen here: sellers discovered later
    /// do not participate. An empty seller set closes the session at
    /// once.
    pub fn open(
        id: SessionId,
        buyer: PeerId,
        conversation: ConversationId,
        criteria: RequestCriteria,
        sellers: Vec<PeerId>,
    ) -> Result<(Self, SessionEffect), CodecError> {
        if sellers.is_empty() {
            let outcome = SessionOutcome::Failed(FailureReason::NoSellers);
            let session = Self {
                id,
                buyer,
                conversation,
                criteria,
                sellers,
                state: SessionState::Closed(outcome.clone()),
            };
            return Ok((session, SessionEffect::Done(outcome)));
        }

        let payload = Payload::criteria(&criteria)?;
        let token = CorrelationToken::fresh();
        let cfp = Envelope::new(Performative::Cfp, buyer.clone(), conversation.clone())
            .to_all(sellers.iter().cloned())
            .with_reply_token(token.clone())
            .with_payload(payload);

        let session = Self {
            id,
            buyer,
            conversation,
            criteria,
            state: SessionState::Collecting {
                reply_with: token,
                expected: sellers.len(),
                received: 0,
                best: None,
            },
            sellers,
        };
        Ok((session, SessionEffect::Send(cfp)))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn criteria(&self) -> &RequestCriteria {
        &self.criteria
    }

    pub fn sellers(&self) -> &[PeerId] {
        &self.sellers
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed(_))
    }

    /// The token a reply must carry to be accepted right now.
    pub fn outstanding_token(&self) -> Option<&CorrelationToken> {
        match &self.state {
            SessionState::Collecting { reply_with, .. }
            | SessionState::Confirming { reply_with, .. } => Some(reply_with),
            SessionState::Closed(_) => None,
        }
    }

    /// A reply advances the session only when both the conversation id
    /// and `in_reply_to` match the current outstanding request.
    pub fn accepts(&self, envelope: &Envelope) -> bool {
        if envelope.conversation != self.conversation {
            return false;
        }
        match self.outstanding_token() {
            Some(outstanding) => envelope.in_reply_to.as_ref() == Some(outstanding),
            None => false,
        }
    }

    /// Feed one inbound envelope to the session.
    pub fn on_reply(&mut self, envelope: &Envelope) -> SessionEffect {
        if !self.accepts(envelope) {
            debug!(session = %self.id, "ignoring reply that does not correlate");
            return SessionEffect::Idle;
        }
        if matches!(self.state, SessionState::Collecting { .. }) {
            self.on_collect_reply(envelope)
        } else {
            self.on_confirm_reply(envelope)
        }
    }

    fn on_collect_reply(&mut self, envelope: &Envelope) -> SessionEffect {
        let SessionState::Collecting {
            expected,
            received,
            best,
            ..
        } = &mut self.state
        else {
            return SessionEffect::Idle;
        };

        match envelope.performative {
            Performative::Propose => match envelope.payload.decode_items() {
                Ok(items) => {
                    if items.is_empty() {
                        // zero matches should have been a refusal; count it as one
                        debug!(session = %self.id, seller = %envelope.sender, "empty proposal counted as refusal");
                    } else if let Some(offer) = matcher::cheapest(&items) {
                        let better = best.as_ref().is_none_or(|b| offer.price < b.item.price);
                        if better {
                            *best = Some(BestOffer {
                                item: offer.clone(),
                                seller: envelope.sender.clone(),
                            });
                        }
                    }
                    *received += 1;
                }
                Err(e) => {
                    // dropped message: the seller effectively never replied
                    warn!(session = %self.id, seller = %envelope.sender, error = %e, "dropping proposal with undecodable item list");
                    return SessionEffect::Idle;
                }
            },
            Performative::Refuse => *received += 1,
            other => {
                debug!(session = %self.id, performative = other.as_str(), "unexpected reply while collecting");
                return SessionEffect::Idle;
            }
        }

        if *received < *expected {
            return SessionEffect::Idle;
        }

        match best.take() {
            None => self.close(SessionOutcome::Failed(FailureReason::NoOffers)),
            Some(offer) => {
                let token = CorrelationToken::fresh();
                let order = Envelope::new(
                    Performative::AcceptProposal,
                    self.buyer.clone(),
                    self.conversation.clone(),
                )
                .to(offer.seller.clone())
                .with_reply_token(token.clone())
                .with_payload(Payload::text(offer.item.name.clone()));

                self.state = SessionState::Confirming {
                    reply_with: token,
                    offer,
                };
                SessionEffect::Send(order)
            }
        }
    }

    fn on_confirm_reply(&mut self, envelope: &Envelope) -> SessionEffect {
        let SessionState::Confirming { offer, .. } = &self.state else {
            return SessionEffect::Idle;
        };

        match envelope.performative {
            Performative::Inform => {
                let offer = offer.clone();
                self.close(SessionOutcome::Purchased {
                    item: offer.item,
                    seller: offer.seller,
                })
            }
            Performative::Failure => self.close(SessionOutcome::Failed(FailureReason::LostRace)),
            other => {
                debug!(session = %self.id, performative = other.as_str(), "unexpected reply while confirming");
                SessionEffect::Idle
            }
        }
    }

    fn close(&mut self, outcome: SessionOutcome) -> SessionEffect {
        self.state = SessionState::Closed(outcome.clone());
        SessionEffect::Done(outcome)
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Start a purchase attempt. Resolves immediately to the session handle;
/// the outcome arrives later at `notify`.
#[derive(Message)]
#[rtype(result = "SessionId")]
pub struct StartNegotiation {
    pub capability: String,
    pub criteria: RequestCriteria,
    pub notify: Option<Recipient<NegotiationCompleted>>,
    /// Bounded-wait fallback. `None` keeps the protocol's own semantics:
    /// a round only advances once every expected reply arrived.
    pub deadline: Option<Duration>,
}

/// Completion notification for one session.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct NegotiationCompleted {
    pub session: SessionId,
    pub outcome: SessionOutcome,
}

/// Abort one session. Other sessions keep their correlation state.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct CancelSession {
    pub session: SessionId,
}

/// Handles of the sessions this peer is still driving.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Vec<SessionId>")]
pub struct OpenSessions;

// =============================================================================
// Buyer peer actor
// =============================================================================

/// Buyer peer: owns its sessions and drives each one to a terminal step.
pub struct BuyerAgent {
    id: PeerId,
    directory: Addr<Directory>,
    router: Addr<Router>,
    sessions: HashMap<SessionId, Session>,
    replies: ReplyRouter,
    listeners: HashMap<SessionId, Recipient<NegotiationCompleted>>,
}

impl BuyerAgent {
    pub fn new(id: PeerId, directory: Addr<Directory>, router: Addr<Router>) -> Self {
        Self {
            id,
            directory,
            router,
            sessions: HashMap::new(),
            replies: ReplyRouter::new(),
            listeners: HashMap::new(),
        }
    }

    fn open_session(
        &mut self,
        id: SessionId,
        capability: String,
        criteria: RequestCriteria,
        sellers: Vec<PeerId>,
        deadline: Option<Duration>,
        ctx: &mut Context<Self>,
    ) {
        info!(peer = %self.id, session = %id, sellers = sellers.len(), "sellers discovered");
        let conversation = ConversationId::for_topic(&capability);
        match Session::open(id, self.id.clone(), conversation, criteria, sellers) {
            Ok((session, effect)) => {
                self.sessions.insert(id, session);
                self.apply_effect(id, effect);
                if let Some(after) = deadline {
                    ctx.run_later(after, move |act, _ctx| act.expire(id));
                }
            }
            Err(e) => self.finish(id, SessionOutcome::Failed(FailureReason::Codec(e.to_string()))),
        }
    }

    /// Carry out whatever the session asked for, keeping the reply router
    /// in lockstep with the session's outstanding token.
    fn apply_effect(&mut self, id: SessionId, effect: SessionEffect) {
        match effect {
            SessionEffect::Idle => {}
            SessionEffect::Send(envelope) => {
                self.router.do_send(Dispatch { envelope });
                self.sync_token(id);
            }
            SessionEffect::Done(outcome) => self.finish(id, outcome),
        }
    }

    fn sync_token(&mut self, id: SessionId) {
        self.replies.release_session(id);
        if let Some(token) = self
            .sessions
            .get(&id)
            .and_then(|session| session.outstanding_token())
        {
            self.replies.expect(token.clone(), id);
        }
    }

    fn finish(&mut self, id: SessionId, outcome: SessionOutcome) {
        self.replies.release_session(id);
        self.sessions.remove(&id);

        match &outcome {
            SessionOutcome::Purchased { item, seller } => {
                info!(peer = %self.id, session = %id, item = %item.name, price = item.price, seller = %seller, "purchase completed");
            }
            SessionOutcome::Failed(reason) => {
                info!(peer = %self.id, session = %id, reason = %reason, "negotiation failed");
            }
        }

        if let Some(listener) = self.listeners.remove(&id) {
            listener.do_send(NegotiationCompleted {
                session: id,
                outcome,
            });
        }
    }

    fn expire(&mut self, id: SessionId) {
        if self.sessions.contains_key(&id) {
            warn!(peer = %self.id, session = %id, "session deadline elapsed");
            self.finish(id, SessionOutcome::Failed(FailureReason::TimedOut));
        }
    }
}

impl Actor for BuyerAgent {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(peer = %self.id, "buyer ready");
        self.router.do_send(Attach {
            peer: self.id.clone(),
            mailbox: ctx.address().recipient(),
        });
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        self.router.do_send(Detach {
            peer: self.id.clone(),
        });
        info!(peer = %self.id, open_sessions = self.sessions.len(), "buyer terminating");
        Running::Stop
    }
}

impl Handler<StartNegotiation> for BuyerAgent {
    type Result = MessageResult<StartNegotiation>;

    fn handle(&mut self, msg: StartNegotiation, ctx: &mut Self::Context) -> Self::Result {
        let StartNegotiation {
            capability,
            criteria,
            notify,
            deadline,
        } = msg;

        let id = SessionId::fresh();
        info!(peer = %self.id, session = %id, capability = %capability, "starting negotiation");

        if let Some(notify) = notify {
            self.listeners.insert(id, notify);
        }

        let lookup = self.directory.send(Lookup {
            capability: capability.clone(),
        });
        ctx.spawn(lookup.into_actor(self).map(move |found, act, ctx| {
            match found {
                Ok(sellers) => act.open_session(id, capability, criteria, sellers, deadline, ctx),
                Err(e) => {
                    warn!(peer = %act.id, session = %id, error = %e, "directory unreachable");
                    act.finish(
                        id,
                        SessionOutcome::Failed(FailureReason::Directory(e.to_string())),
                    );
                }
            }
        }));

        MessageResult(id)
    }
}

impl Handler<DeliverEnvelope> for BuyerAgent {
    type Result = ();

    fn handle(&mut self, msg: DeliverEnvelope, _ctx: &mut Self::Context) {
        let envelope = msg.envelope;
        let Some(id) = self.replies.resolve(&envelope) else {
            debug!(peer = %self.id, performative = envelope.performative.as_str(), "no session awaits this reply");
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            self.replies.release_session(id);
            return;
        };

        let effect = session.on_reply(&envelope);
        self.apply_effect(id, effect);
    }
}

impl Handler<CancelSession> for BuyerAgent {
    type Result = ();

    fn handle(&mut self, msg: CancelSession, _ctx: &mut Self::Context) {
        if self.sessions.contains_key(&msg.session) {
            info!(peer = %self.id, session = %msg.session, "session cancelled");
            self.finish(
                msg.session,
                SessionOutcome::Failed(FailureReason::Cancelled),
            );
        }
    }
}

impl Handler<OpenSessions> for BuyerAgent {
    type Result = MessageResult<OpenSessions>;

    fn handle(&mut self, _msg: OpenSessions, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.sessions.keys().copied().collect())
    }
}
