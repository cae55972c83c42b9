//! Bot administration: per-guild command disabling, the global channel
//! ignore list, and per-guild bot bans ("plonks").

use std::sync::Arc;

use tracing::info;

use corvid_store::{GuildScopedTable, KeyedStore};
use corvid_types::{BanList, DisabledCommands, IgnoreList, Outbox};

/// Commands that must stay reachable so a guild can always undo a disable.
const PROTECTED_COMMANDS: [&str; 2] = ["enable", "disable"];

pub struct Admin {
    store: Arc<KeyedStore>,
    plonks: GuildScopedTable<BanList>,
    disabled: GuildScopedTable<DisabledCommands>,
}

impl Admin {
    pub fn new(store: Arc<KeyedStore>) -> Self {
        let plonks = GuildScopedTable::new(store.clone(), "plonks");
        let disabled = GuildScopedTable::new(store.clone(), "commands");
        Self {
            store,
            plonks,
            disabled,
        }
    }

    /// `disable <command>` — disable a command root for this guild.
    pub async fn disable(
        &self,
        channel_id: u64,
        guild_id: u64,
        command: &str,
        known_commands: &[&str],
        out: &mut Outbox,
    ) {
        let command = command.to_lowercase();
        if PROTECTED_COMMANDS.contains(&command.as_str()) {
            out.send_text(channel_id, "Cannot disable that command.");
            return;
        }
        if !known_commands.contains(&command.as_str()) {
            out.send_text(channel_id, format!("Command \"{}\" was not found.", command));
            return;
        }

        let mut entries = self.disabled.get(guild_id).await;
        entries.insert(command.clone());
        match self.disabled.put(guild_id, &entries).await {
            Ok(value) => {
                info!(guild_id, %command, "command disabled");
                out.persist_change(self.disabled.store_name(), self.disabled.entry_key(), value);
                out.send_text(
                    channel_id,
                    format!("\"{}\" command disabled in this server.", command),
                );
            }
            Err(e) => {
                tracing::error!(guild_id, %command, "failed to persist disable list: {}", e);
                out.send_text(channel_id, "Something went wrong saving that change.");
            }
        }
    }

    /// `enable <command>` — re-enable a previously disabled command.
    pub async fn enable(&self, channel_id: u64, guild_id: u64, command: &str, out: &mut Outbox) {
        let command = command.to_lowercase();
        let mut entries = self.disabled.get(guild_id).await;
        if !entries.remove(command.as_str()) {
            out.send_text(channel_id, "The command does not exist or is not disabled.");
            return;
        }
        match self.disabled.put(guild_id, &entries).await {
            Ok(value) => {
                info!(guild_id, %command, "command enabled");
                out.persist_change(self.disabled.store_name(), self.disabled.entry_key(), value);
                out.send_text(
                    channel_id,
                    format!("\"{}\" command enabled in this server.", command),
                );
            }
            Err(e) => {
                tracing::error!(guild_id, %command, "failed to persist disable list: {}", e);
                out.send_text(channel_id, "Something went wrong saving that change.");
            }
        }
    }

    /// `ignore` / `ignore <channel>` — suppress command processing in a
    /// channel. The ignore list is global across guilds.
    pub async fn ignore_channel(&self, reply_channel: u64, target: u64, out: &mut Outbox) {
        let mut ignored: IgnoreList = self.store.get_or_default("ignored").await;
        if !ignored.insert(target) {
            out.send_text(reply_channel, "That channel is already ignored.");
            return;
        }
        match self.store.put("ignored", &ignored).await {
            Ok(()) => {
                info!(channel = target, "channel ignored");
                out.persist_change(
                    self.store.name(),
                    "ignored",
                    serde_json::to_value(&ignored).unwrap_or_default(),
                );
                out.send_text(reply_channel, format!("Channel <#{}> will be ignored.", target));
            }
            Err(e) => {
                tracing::error!(channel = target, "failed to persist ignore list: {}", e);
                out.send_text(reply_channel, "Something went wrong saving that change.");
            }
        }
    }

    /// `ignore list` — report the currently ignored channels.
    pub async fn ignore_list(&self, reply_channel: u64, out: &mut Outbox) {
        let ignored: IgnoreList = self.store.get_or_default("ignored").await;
        if ignored.is_empty() {
            out.send_text(reply_channel, "I am not ignoring any channels here.");
            return;
        }
        let mentions: Vec<String> = ignored.iter().map(|id| format!("<#{}>", id)).collect();
        out.send_text(
            reply_channel,
            format!("Ignored Channels: {}", mentions.join(", ")),
        );
    }

    /// `unignore [channels...]` — remove channels from the ignore list.
    pub async fn unignore(&self, reply_channel: u64, targets: &[u64], out: &mut Outbox) {
        let mut ignored: IgnoreList = self.store.get_or_default("ignored").await;
        let removed: Vec<u64> = targets
            .iter()
            .copied()
            .filter(|id| ignored.remove(id))
            .collect();

        if removed.is_empty() {
            out.send_text(reply_channel, "None of those channels were ignored.");
            return;
        }
        match self.store.put("ignored", &ignored).await {
            Ok(()) => {
                out.persist_change(
                    self.store.name(),
                    "ignored",
                    serde_json::to_value(&ignored).unwrap_or_default(),
                );
                let mentions: Vec<String> =
                    removed.iter().map(|id| format!("<#{}>", id)).collect();
                out.send_text(
                    reply_channel,
                    format!("Channel(s) {} will no longer be ignored.", mentions.join(", ")),
                );
            }
            Err(e) => {
                tracing::error!("failed to persist ignore list: {}", e);
                out.send_text(reply_channel, "Something went wrong saving that change.");
            }
        }
    }

    /// `plonk <member>` — ban a user from invoking the bot in this guild.
    pub async fn plonk(&self, channel_id: u64, guild_id: u64, member: u64, out: &mut Outbox) {
        let mut banned = self.plonks.get(guild_id).await;
        if !banned.insert(member) {
            out.send_text(channel_id, "That user is already bot banned in this server.");
            return;
        }
        match self.plonks.put(guild_id, &banned).await {
            Ok(value) => {
                info!(guild_id, member, "user plonked");
                out.persist_change(self.plonks.store_name(), self.plonks.entry_key(), value);
                out.send_text(
                    channel_id,
                    format!("<@{}> has been banned from using the bot in this server.", member),
                );
            }
            Err(e) => {
                tracing::error!(guild_id, member, "failed to persist ban list: {}", e);
                out.send_text(channel_id, "Something went wrong saving that change.");
            }
        }
    }

    /// `unplonk <member>`
    pub async fn unplonk(&self, channel_id: u64, guild_id: u64, member: u64, out: &mut Outbox) {
        let mut banned = self.plonks.get(guild_id).await;
        if !banned.remove(&member) {
            out.send_text(
                channel_id,
                format!("<@{}> is not banned from using the bot in this server.", member),
            );
            return;
        }
        match self.plonks.put(guild_id, &banned).await {
            Ok(value) => {
                info!(guild_id, member, "user unplonked");
                out.persist_change(self.plonks.store_name(), self.plonks.entry_key(), value);
                out.send_text(
                    channel_id,
                    format!("<@{}> has been unbanned from using the bot in this server.", member),
                );
            }
            Err(e) => {
                tracing::error!(guild_id, member, "failed to persist ban list: {}", e);
                out.send_text(channel_id, "Something went wrong saving that change.");
            }
        }
    }

    /// `plonks` — report banned users in this guild.
    pub async fn plonks_list(&self, channel_id: u64, guild_id: u64, out: &mut Outbox) {
        let banned = self.plonks.get(guild_id).await;
        if banned.is_empty() {
            out.send_text(channel_id, "No members are banned in this server.");
            return;
        }
        let mentions: Vec<String> = banned.iter().map(|id| format!("<@{}>", id)).collect();
        out.send_text(channel_id, format!("Plonked Users: {}", mentions.join(", ")));
    }
}
