// acl.rs
// Core ACL envelope structures for the negotiation protocol

use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationToken;
use crate::error::CodecError;
use crate::model::{ItemRecord, RequestCriteria};

/// Peer address. Opaque to the core; the router resolves it to a mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Speech-act tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Performative {
    Cfp,
    Propose,
    Refuse,
    AcceptProposal,
    Inform,
    Failure,
}

impl Performative {
    pub fn as_str(&self) -> &'static str {
        match self {
            Performative::Cfp => "cfp",
            Performative::Propose => "propose",
            Performative::Refuse => "refuse",
            Performative::AcceptProposal => "accept-proposal",
            Performative::Inform => "inform",
            Performative::Failure => "failure",
        }
    }
}

/// Groups every message of one negotiation topic.
///
/// All rounds about one capability share a conversation id; concurrent
/// requests inside it are told apart only by correlation tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn for_topic(capability: &str) -> Self {
        Self(format!("trade:{capability}"))
    }
}

/// Envelope payload.
///
/// The encoding of criteria and item lists is a local choice (JSON here);
/// correlation semantics never depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn criteria(criteria: &RequestCriteria) -> Result<Self, CodecError> {
        Ok(Payload::Bytes(serde_json::to_vec(criteria)?))
    }

    pub fn items(items: &[ItemRecord]) -> Result<Self, CodecError> {
        Ok(Payload::Bytes(serde_json::to_vec(items)?))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    pub fn decode_criteria(&self) -> Result<RequestCriteria, CodecError> {
        match self {
            Payload::Bytes(bytes) => Ok(serde_json::from_slice(bytes)?),
            _ => Err(CodecError::NotBinary),
        }
    }

    pub fn decode_items(&self) -> Result<Vec<ItemRecord>, CodecError> {
        match self {
            Payload::Bytes(bytes) => Ok(serde_json::from_slice(bytes)?),
            _ => Err(CodecError::NotBinary),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Immutable message unit exchanged between peers.
///
/// Correlation invariant: a responder copies the request's `reply_with`
/// into the reply's `in_reply_to`; a session accepts a reply only when
/// both the conversation id and `in_reply_to` match its outstanding
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub performative: Performative,
    pub sender: PeerId,
    pub receivers: Vec<PeerId>,
    pub conversation: ConversationId,
    pub reply_with: Option<CorrelationToken>,
    pub in_reply_to: Option<CorrelationToken>,
    pub payload: Payload,
    pub sent_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(performative: Performative, sender: PeerId, conversation: ConversationId) -> Self {
        Self {
            performative,
            sender,
            receivers: Vec::new(),
            conversation,
            reply_with: None,
            in_reply_to: None,
            payload: Payload::Empty,
            sent_at: Utc::now(),
        }
    }

    pub fn to(mut self, receiver: PeerId) -> Self {
        self.receivers.push(receiver);
        self
    }

    pub fn to_all(mut self, receivers: impl IntoIterator<Item = PeerId>) -> Self {
        self.receivers.extend(receivers);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_reply_token(mut self, token: CorrelationToken) -> Self {
        self.reply_with = Some(token);
        self
    }

    /// Build a reply addressed back at this envelope's sender, keeping the
    /// conversation and copying `reply_with` into `in_reply_to`.
    pub fn reply(&self, sender: PeerId, performative: Performative) -> Envelope {
        Envelope {
            performative,
            sender,
            receivers: vec![self.sender.clone()],
            conversation: self.conversation.clone(),
            reply_with: None,
            in_reply_to: self.reply_with.clone(),
            payload: Payload::Empty,
            sent_at: Utc::now(),
        }
    }
}
