//! Shared types for the corvid bot core
//!
//! Inbound events come from whatever gateway owns the real chat session;
//! outbound intents go back to it. The core itself never touches the chat
//! API.

pub mod errors;
pub mod events;
pub mod intents;
pub mod tables;

pub use errors::{StoreError, TriggerError};
pub use events::{Actor, Capabilities, EventMetadata, InboundEvent, MessageEvent, ReactionAddEvent};
pub use intents::{AddReactionIntent, Intent, Outbox, PersistChangeIntent, SendTextIntent};
pub use tables::{BanList, CommandStats, DisabledCommands, IgnoreList, Trigger, TriggerTable};
