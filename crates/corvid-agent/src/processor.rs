//! Event processor - routes gated inbound events to the feature handlers

#[path = "processor_tests.rs"]
mod processor_tests;

use tokio::time::Instant;
use tracing::{debug, info};

use corvid_store::StoreRegistry;
use corvid_types::{Intent, MessageEvent, Outbox, ReactionAddEvent, StoreError};

use crate::admin::Admin;
use crate::gate::DispatchGate;
use crate::reactions::Reactions;
use crate::stats::Stats;

/// Command root names the bot answers to, for disable-list validation.
pub const KNOWN_COMMANDS: [&str; 13] = [
    "addreaction",
    "commandstats",
    "deleteallreactions",
    "deletereaction",
    "disable",
    "enable",
    "ignore",
    "listreactions",
    "plonk",
    "plonks",
    "unignore",
    "unplonk",
    "viewreaction",
];

/// Resolve a typed command token to its canonical root name.
fn resolve_command(token: &str) -> Option<&'static str> {
    let token = token.to_lowercase();
    let canonical = match token.as_str() {
        "acr" => "addreaction",
        "lcr" => "listreactions",
        "vcr" => "viewreaction",
        "dcr" => "deletereaction",
        "dcrall" => "deleteallreactions",
        other => KNOWN_COMMANDS.iter().copied().find(|&c| c == other)?,
    };
    Some(canonical)
}

pub struct EventProcessor {
    prefix: String,
    owner_id: Option<u64>,
    gate: DispatchGate,
    reactions: Reactions,
    admin: Admin,
    stats: Stats,
}

impl EventProcessor {
    /// Open the feature stores through the registry and wire the pipeline.
    pub async fn new(
        prefix: impl Into<String>,
        owner_id: Option<u64>,
        registry: &StoreRegistry,
    ) -> Result<Self, StoreError> {
        let admin_store = registry.open("botadmin.json").await?;
        let reactions_store = registry.open("reactions.json").await?;
        let stats_store = registry.open("stats.json").await?;

        Ok(Self {
            prefix: prefix.into(),
            owner_id,
            gate: DispatchGate::new(admin_store.clone()),
            reactions: Reactions::new(reactions_store),
            admin: Admin::new(admin_store),
            stats: Stats::new(stats_store),
        })
    }

    /// Handle one message event: gate it, then route it to a command
    /// handler or the trigger matcher.
    pub async fn process_message(&self, event: &MessageEvent) -> Vec<Intent> {
        self.process_message_at(event, Instant::now()).await
    }

    /// Clock-parameterized variant used by the event loop and tests.
    pub async fn process_message_at(&self, event: &MessageEvent, now: Instant) -> Vec<Intent> {
        let mut event = event.clone();
        if self.owner_id == Some(event.author.id) {
            event.author.caps.owner = true;
        }

        let command = self.parse_command(&event.content);
        let command_name = command.map(|(name, _)| name);

        let decision = self.gate.should_process(&event, command_name).await;
        if !decision.is_allow() {
            debug!(
                author = event.author.id,
                channel = event.channel_id,
                "event filtered: {:?}",
                decision
            );
            return Vec::new();
        }

        let mut out = Outbox::new();

        // A pending acquisition claims the requester's next message in its
        // channel before normal routing sees it.
        if self.reactions.intercept_message(&event, now, &mut out).await {
            return out.into_intents();
        }

        match command {
            Some((name, args)) => {
                self.dispatch_command(&event, name, args, now, &mut out).await;
            }
            None if !event.content.starts_with(&self.prefix) => {
                self.reactions.on_free_text(&event, &mut out).await;
            }
            None => {
                // prefixed but unknown: neither a command nor trigger text
                debug!(content = %event.content, "unknown command");
            }
        }

        out.into_intents()
    }

    /// Handle a reaction-add event (feeds pending acquisitions).
    pub async fn process_reaction(&self, event: &ReactionAddEvent) -> Vec<Intent> {
        self.process_reaction_at(event, Instant::now()).await
    }

    pub async fn process_reaction_at(&self, event: &ReactionAddEvent, now: Instant) -> Vec<Intent> {
        let mut out = Outbox::new();
        self.reactions.on_reaction(event, now, &mut out).await;
        out.into_intents()
    }

    /// Expire overdue interactive flows.
    pub async fn sweep(&self, now: Instant) -> Vec<Intent> {
        let mut out = Outbox::new();
        self.reactions.sweep(now, &mut out).await;
        out.into_intents()
    }

    /// Split `content` into a canonical command name and its argument rest.
    /// Returns None for non-prefixed text and for unknown command tokens.
    fn parse_command<'a>(&self, content: &'a str) -> Option<(&'static str, &'a str)> {
        let rest = content.strip_prefix(&self.prefix)?;
        let mut parts = rest.splitn(2, char::is_whitespace);
        let token = parts.next()?;
        let name = resolve_command(token)?;
        let args = parts.next().unwrap_or("").trim();
        Some((name, args))
    }

    async fn dispatch_command(
        &self,
        event: &MessageEvent,
        name: &'static str,
        args: &str,
        now: Instant,
        out: &mut Outbox,
    ) {
        let Some(guild_id) = event.guild_id else {
            out.send_text(
                event.channel_id,
                "This command cannot be used in private messages.",
            );
            return;
        };

        let caps = event.author.caps;
        let channel_id = event.channel_id;

        let permitted = match name {
            "disable" | "enable" | "plonk" | "unplonk" | "plonks" => {
                caps.owner || caps.manage_guild
            }
            "ignore" | "unignore" => caps.owner || caps.manage_channels,
            "addreaction" | "deletereaction" | "deleteallreactions" | "listreactions"
            | "viewreaction" => caps.owner || caps.manage_messages,
            _ => true,
        };
        if !permitted {
            out.send_text(channel_id, "You don't have permission to use this command.");
            return;
        }

        info!(author = event.author.id, guild_id, command = name, "dispatching command");

        match name {
            "disable" => {
                if args.is_empty() {
                    out.send_text(channel_id, "Which command should I disable?");
                } else {
                    self.admin
                        .disable(channel_id, guild_id, args, &KNOWN_COMMANDS, out)
                        .await;
                }
            }
            "enable" => {
                if args.is_empty() {
                    out.send_text(channel_id, "Which command should I enable?");
                } else {
                    self.admin.enable(channel_id, guild_id, args, out).await;
                }
            }
            "ignore" => match args {
                "" => self.admin.ignore_channel(channel_id, channel_id, out).await,
                "list" => self.admin.ignore_list(channel_id, out).await,
                other => match parse_channel(other) {
                    Some(target) => self.admin.ignore_channel(channel_id, target, out).await,
                    None => out.send_text(channel_id, "I couldn't read that channel."),
                },
            },
            "unignore" => {
                let targets: Vec<u64> = if args.is_empty() {
                    vec![channel_id]
                } else {
                    args.split_whitespace().filter_map(parse_channel).collect()
                };
                if targets.is_empty() {
                    out.send_text(channel_id, "I couldn't read those channels.");
                } else {
                    self.admin.unignore(channel_id, &targets, out).await;
                }
            }
            "plonk" => match parse_member(args) {
                Some(member) => self.admin.plonk(channel_id, guild_id, member, out).await,
                None => out.send_text(channel_id, "I couldn't read that member."),
            },
            "unplonk" => match parse_member(args) {
                Some(member) => self.admin.unplonk(channel_id, guild_id, member, out).await,
                None => out.send_text(channel_id, "I couldn't read that member."),
            },
            "plonks" => self.admin.plonks_list(channel_id, guild_id, out).await,
            "addreaction" => {
                if args.is_empty() {
                    out.send_text(channel_id, "What should I react to?");
                } else {
                    self.reactions.add(event, guild_id, args, now, out).await;
                }
            }
            "listreactions" => self.reactions.list(channel_id, guild_id, out).await,
            "viewreaction" => {
                if args.is_empty() {
                    out.send_text(channel_id, "Which reaction should I show?");
                } else {
                    self.reactions.view(channel_id, guild_id, args, out).await;
                }
            }
            "deletereaction" => {
                if args.is_empty() {
                    out.send_text(channel_id, "Which reaction should I delete?");
                } else {
                    self.reactions.delete(channel_id, guild_id, args, out).await;
                }
            }
            "deleteallreactions" => self.reactions.delete_all(channel_id, guild_id, out).await,
            "commandstats" => self.stats.report(channel_id, guild_id, out).await,
            _ => unreachable!("resolve_command only yields known names"),
        }

        self.stats.record(guild_id, name).await;
    }
}

/// Parse `<#123>` or a raw id.
fn parse_channel(token: &str) -> Option<u64> {
    let token = token
        .strip_prefix("<#")
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(token);
    token.parse().ok()
}

/// Parse `<@123>`, `<@!123>` or a raw id.
fn parse_member(token: &str) -> Option<u64> {
    let token = token
        .strip_prefix("<@")
        .map(|t| t.strip_prefix('!').unwrap_or(t))
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(token);
    token.parse().ok()
}
