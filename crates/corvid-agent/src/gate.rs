//! Dispatch gating
//!
//! Every inbound message passes one allow/deny decision before it reaches a
//! command handler or the trigger matcher. Precedence, each step
//! short-circuiting: bot filter, owner bypass, ban list, channel ignore
//! list, command disable list. A denial is normal control flow, never an
//! error.

use std::sync::Arc;

use corvid_store::{GuildScopedTable, KeyedStore};
use corvid_types::{BanList, DisabledCommands, IgnoreList, MessageEvent};

/// Outcome of a gate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny(DenyReason),
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Why an event was filtered out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The author is itself an automated account
    BotAuthor,
    /// The author is on the guild's ban list
    Banned,
    /// The channel is on the global ignore list
    IgnoredChannel,
    /// The invoked command is disabled in the guild
    DisabledCommand,
}

/// Store-backed state a decision runs against, fetched at decision time.
pub(crate) struct GateState {
    /// Global ignored channel ids
    pub ignored: IgnoreList,
    /// Ban list for the event's guild (empty for direct messages)
    pub banned: BanList,
    /// Disabled commands for the event's guild (empty for direct messages)
    pub disabled: DisabledCommands,
}

/// Pure decision over an event, the invoked command root (if any) and the
/// fetched state.
pub(crate) fn decide(
    event: &MessageEvent,
    command: Option<&str>,
    state: &GateState,
) -> GateDecision {
    if event.author.bot {
        return GateDecision::Deny(DenyReason::BotAuthor);
    }

    let caps = event.author.caps;

    // The owner is checked before the ban list so they can never be locked
    // out by their own ban-list data.
    if caps.owner {
        return GateDecision::Allow;
    }

    // Ban and disable lists are guild-scoped concepts; both are skipped
    // entirely for direct messages.
    if event.guild_id.is_some()
        && state.banned.contains(&event.author.id)
        && !caps.manage_guild
    {
        return GateDecision::Deny(DenyReason::Banned);
    }

    if state.ignored.contains(&event.channel_id) && !caps.administrator {
        return GateDecision::Deny(DenyReason::IgnoredChannel);
    }

    if let Some(name) = command {
        let root = name.split_whitespace().next().unwrap_or(name);
        if event.guild_id.is_some() && state.disabled.contains(root) {
            return GateDecision::Deny(DenyReason::DisabledCommand);
        }
    }

    GateDecision::Allow
}

/// Gate bound to the admin store. State is read through the store accessors
/// at every decision; nothing is cached across events.
pub struct DispatchGate {
    admin: Arc<KeyedStore>,
    plonks: GuildScopedTable<BanList>,
    disabled: GuildScopedTable<DisabledCommands>,
}

impl DispatchGate {
    pub fn new(admin: Arc<KeyedStore>) -> Self {
        let plonks = GuildScopedTable::new(admin.clone(), "plonks");
        let disabled = GuildScopedTable::new(admin.clone(), "commands");
        Self {
            admin,
            plonks,
            disabled,
        }
    }

    /// Decide whether the event should be routed at all. `command` is the
    /// invoked command name when the event is a command invocation.
    pub async fn should_process(
        &self,
        event: &MessageEvent,
        command: Option<&str>,
    ) -> GateDecision {
        let state = match event.guild_id {
            Some(guild_id) => GateState {
                ignored: self.admin.get_or_default("ignored").await,
                banned: self.plonks.get(guild_id).await,
                disabled: self.disabled.get(guild_id).await,
            },
            None => GateState {
                ignored: self.admin.get_or_default("ignored").await,
                banned: BanList::default(),
                disabled: DisabledCommands::default(),
            },
        };
        decide(event, command, &state)
    }
}
