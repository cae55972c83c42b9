//! Side-effect intents emitted by the core for the gateway to execute
//!
//! Handlers never call the chat API; they append intents to an [`Outbox`]
//! and the gateway performs them in order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Send a plain text message to a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendTextIntent {
    pub channel_id: u64,
    pub text: String,
}

/// Add a reaction to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddReactionIntent {
    pub channel_id: u64,
    pub message_id: u64,
    /// Unicode emoji or custom emoji in format `name:id`
    pub emoji: String,
}

/// A store entry changed and was persisted. Informational for the gateway;
/// durability itself is handled by the keyed store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistChangeIntent {
    /// Store name (backing file name)
    pub store: String,
    /// Entry key within the store
    pub key: String,
    /// The entry's new value
    pub value: Value,
}

/// Envelope for the outbound intent stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    SendText(SendTextIntent),
    AddReaction(AddReactionIntent),
    PersistChange(PersistChangeIntent),
}

/// Ordered intent collector passed through a handler call
#[derive(Debug, Default)]
pub struct Outbox {
    intents: Vec<Intent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    pub fn send_text(&mut self, channel_id: u64, text: impl Into<String>) {
        self.push(Intent::SendText(SendTextIntent {
            channel_id,
            text: text.into(),
        }));
    }

    pub fn add_reaction(&mut self, channel_id: u64, message_id: u64, emoji: impl Into<String>) {
        self.push(Intent::AddReaction(AddReactionIntent {
            channel_id,
            message_id,
            emoji: emoji.into(),
        }));
    }

    pub fn persist_change(&mut self, store: impl Into<String>, key: impl Into<String>, value: Value) {
        self.push(Intent::PersistChange(PersistChangeIntent {
            store: store.into(),
            key: key.into(),
            value,
        }));
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn into_intents(self) -> Vec<Intent> {
        self.intents
    }
}
