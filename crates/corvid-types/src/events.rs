//! Inbound events consumed by the bot core
//!
//! The gateway translates raw chat-platform payloads into these shapes and
//! resolves the acting user's capabilities before handing the event over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base event metadata shared across all inbound events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMetadata {
    /// Unique event ID
    pub event_id: Uuid,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Monotonic sequence number
    pub sequence: u64,
}

impl EventMetadata {
    /// Create new event metadata
    pub fn new(sequence: u64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sequence,
        }
    }
}

/// Capabilities the gateway resolved for the acting user in the event's
/// channel. All flags default to false when absent from the payload.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    /// The configured process owner (bypasses every gate check)
    #[serde(default)]
    pub owner: bool,
    /// Manage Server permission
    #[serde(default)]
    pub manage_guild: bool,
    /// Manage Channels permission
    #[serde(default)]
    pub manage_channels: bool,
    /// Manage Messages permission
    #[serde(default)]
    pub manage_messages: bool,
    /// Administrator permission
    #[serde(default)]
    pub administrator: bool,
}

/// The acting user behind an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: u64,
    /// True if the author is itself an automated account
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub caps: Capabilities,
}

/// A message was created in a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEvent {
    pub metadata: EventMetadata,
    pub message_id: u64,
    pub channel_id: u64,
    /// Absent for direct messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
    pub author: Actor,
    pub content: String,
}

impl MessageEvent {
    /// True if the message arrived outside any guild (direct message)
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }
}

/// A reaction was added to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReactionAddEvent {
    pub metadata: EventMetadata,
    pub user_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
    /// Unicode emoji or custom emoji in format `name:id`
    pub emoji: String,
}

/// Envelope for the inbound event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(MessageEvent),
    ReactionAdd(ReactionAddEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_meta() -> EventMetadata {
        EventMetadata::new(1)
    }

    fn test_actor() -> Actor {
        Actor {
            id: 42,
            bot: false,
            caps: Capabilities::default(),
        }
    }

    fn roundtrip<
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + PartialEq + std::fmt::Debug,
    >(
        val: &T,
    ) {
        let json = serde_json::to_string(val).expect("serialize");
        let back: T = serde_json::from_str(&json).expect("deserialize");
        let json2 = serde_json::to_string(&back).expect("re-serialize");
        assert_eq!(json, json2, "roundtrip produced different JSON");
    }

    #[test]
    fn test_event_metadata_new() {
        let meta = EventMetadata::new(7);
        assert_eq!(meta.sequence, 7);
        assert_ne!(
            meta.event_id.to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_capabilities_default_all_false() {
        let caps = Capabilities::default();
        assert!(!caps.owner);
        assert!(!caps.manage_guild);
        assert!(!caps.manage_channels);
        assert!(!caps.manage_messages);
        assert!(!caps.administrator);
    }

    #[test]
    fn test_capabilities_missing_fields_default() {
        let caps: Capabilities = serde_json::from_str("{\"owner\": true}").unwrap();
        assert!(caps.owner);
        assert!(!caps.administrator);
    }

    #[test]
    fn test_message_event_roundtrip() {
        roundtrip(&MessageEvent {
            metadata: test_meta(),
            message_id: 1,
            channel_id: 100,
            guild_id: Some(200),
            author: test_actor(),
            content: "Hello".to_string(),
        });
    }

    #[test]
    fn test_message_event_guild_id_omitted_when_none() {
        let event = MessageEvent {
            metadata: test_meta(),
            message_id: 1,
            channel_id: 100,
            guild_id: None,
            author: test_actor(),
            content: "dm".to_string(),
        };
        assert!(event.is_direct());
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("guild_id"), "guild_id must be omitted in DMs");
    }

    #[test]
    fn test_reaction_add_event_roundtrip() {
        roundtrip(&ReactionAddEvent {
            metadata: test_meta(),
            user_id: 42,
            channel_id: 100,
            message_id: 1,
            guild_id: Some(200),
            emoji: "🎉".to_string(),
        });
    }

    #[test]
    fn test_inbound_event_tagged_encoding() {
        let event = InboundEvent::Message(MessageEvent {
            metadata: test_meta(),
            message_id: 1,
            channel_id: 100,
            guild_id: None,
            author: test_actor(),
            content: "hi".to_string(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"message\""));
        roundtrip(&event);

        let event = InboundEvent::ReactionAdd(ReactionAddEvent {
            metadata: test_meta(),
            user_id: 42,
            channel_id: 100,
            message_id: 1,
            guild_id: None,
            emoji: "👍".to_string(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"reaction_add\""));
    }
}
