// correlation.rs
// Request/reply correlation: opaque tokens plus the reply router

use std::collections::HashMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::acl::Envelope;

/// Opaque token binding a reply to exactly one outstanding request.
///
/// The sender of a request generates a fresh token as `reply_with`; the
/// responder copies it into `in_reply_to`. Tokens are unique per request,
/// never per conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of one buyer negotiation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Maps outstanding correlation tokens to the session waiting on them.
///
/// A token routes to at most one session, so no reply is ever delivered
/// to more than one waiting session. Routing is a candidate lookup only;
/// the session still performs the full `(conversation, in_reply_to)`
/// check before accepting the reply.
#[derive(Debug, Default)]
pub struct ReplyRouter {
    waiting: HashMap<CorrelationToken, SessionId>,
}

impl ReplyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outstanding request token for a session.
    pub fn expect(&mut self, token: CorrelationToken, session: SessionId) {
        self.waiting.insert(token, session);
    }

    /// Find the session waiting on this envelope's `in_reply_to`, if any.
    pub fn resolve(&self, envelope: &Envelope) -> Option<SessionId> {
        let token = envelope.in_reply_to.as_ref()?;
        self.waiting.get(token).copied()
    }

    pub fn release(&mut self, token: &CorrelationToken) {
        self.waiting.remove(token);
    }

    /// Drop every token owned by one session, leaving all other sessions'
    /// correlation state untouched.
    pub fn release_session(&mut self, session: SessionId) {
        self.waiting.retain(|_, waiting| *waiting != session);
    }

    pub fn outstanding(&self) -> usize {
        self.waiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{ConversationId, PeerId, Performative};

    fn reply_for(token: &CorrelationToken) -> Envelope {
        let request = Envelope::new(
            Performative::Cfp,
            PeerId::from("buyer-1"),
            ConversationId::for_topic("smartphone-market"),
        )
        .with_reply_token(token.clone());
        request.reply(PeerId::from("seller-1"), Performative::Propose)
    }

    #[test]
    fn test_resolve_requires_exact_token() {
        let mut router = ReplyRouter::new();
        let token = CorrelationToken::fresh();
        let session = SessionId::fresh();
        router.expect(token.clone(), session);

        assert_eq!(router.resolve(&reply_for(&token)), Some(session));
        assert_eq!(router.resolve(&reply_for(&CorrelationToken::fresh())), None);
    }

    #[test]
    fn test_missing_in_reply_to_never_routes() {
        let mut router = ReplyRouter::new();
        router.expect(CorrelationToken::fresh(), SessionId::fresh());

        let unsolicited = Envelope::new(
            Performative::Inform,
            PeerId::from("seller-1"),
            ConversationId::for_topic("smartphone-market"),
        );
        assert_eq!(router.resolve(&unsolicited), None);
    }

    #[test]
    fn test_release_session_is_isolated() {
        let mut router = ReplyRouter::new();
        let (s1, s2) = (SessionId::fresh(), SessionId::fresh());
        let t1 = CorrelationToken::fresh();
        let t2 = CorrelationToken::fresh();
        router.expect(t1.clone(), s1);
        router.expect(t2.clone(), s2);

        router.release_session(s1);

        assert_eq!(router.resolve(&reply_for(&t1)), None);
        assert_eq!(router.resolve(&reply_for(&t2)), Some(s2));
        assert_eq!(router.outstanding(), 1);
    }

    #[test]
    fn test_release_single_token() {
        let mut router = ReplyRouter::new();
        let token = CorrelationToken::fresh();
        router.expect(token.clone(), SessionId::fresh());
        router.release(&token);
        assert_eq!(router.outstanding(), 0);
    }
}
