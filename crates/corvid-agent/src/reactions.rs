//! Reaction triggers: respond to configured phrases with a message and/or
//! emoji reactions, plus the commands that manage them.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};

use corvid_store::{GuildScopedTable, KeyedStore};
use corvid_types::{MessageEvent, Outbox, ReactionAddEvent, TriggerTable};

use crate::acquire::{
    AcquisitionManager, AcquisitionOutcome, TriggerAcquisition, NO_RESPONSE_SENTINEL, STOP_EMOJI,
};
use crate::matcher::match_triggers;

pub struct Reactions {
    triggers: GuildScopedTable<TriggerTable>,
    acquisitions: AcquisitionManager,
}

impl Reactions {
    pub fn new(store: Arc<KeyedStore>) -> Self {
        Self {
            triggers: GuildScopedTable::new(store, "triggers"),
            acquisitions: AcquisitionManager::new(),
        }
    }

    /// Free-text path: run the matcher and emit each matched trigger's
    /// response and reactions as separate intents.
    pub async fn on_free_text(&self, event: &MessageEvent, out: &mut Outbox) {
        let Some(guild_id) = event.guild_id else {
            return;
        };
        let table = self.triggers.get(guild_id).await;
        if table.is_empty() {
            return;
        }

        for keyword in match_triggers(&event.content, &table) {
            let Some(trigger) = table.get(&keyword) else {
                continue;
            };
            debug!(guild_id, %keyword, "trigger matched");
            if let Some(response) = trigger.response.as_deref() {
                if !response.is_empty() {
                    out.send_text(event.channel_id, response);
                }
            }
            for emoji in &trigger.reactions {
                out.add_reaction(event.channel_id, event.message_id, emoji.clone());
            }
        }
    }

    /// `addreaction <keyword>` — start the interactive acquisition flow.
    pub async fn add(
        &self,
        event: &MessageEvent,
        guild_id: u64,
        keyword: &str,
        now: Instant,
        out: &mut Outbox,
    ) {
        let table = self.triggers.get(guild_id).await;
        if table.get(keyword).is_some() {
            out.send_text(
                event.channel_id,
                format!("Reaction '{}' already exists.", keyword),
            );
            return;
        }

        let acq = TriggerAcquisition::begin(
            keyword,
            guild_id,
            event.channel_id,
            event.author.id,
            now,
        );
        if !self.acquisitions.begin(acq).await {
            out.send_text(
                event.channel_id,
                "Finish your current reaction setup in this channel first.",
            );
            return;
        }

        out.send_text(
            event.channel_id,
            format!(
                "Okay, I'll react to '{}'. What do you want me to say? (Type {} for no response)",
                keyword, NO_RESPONSE_SENTINEL
            ),
        );
    }

    /// Offer a gated message to the pending acquisitions. Returns true when
    /// the message was consumed as a phase-1 reply.
    pub async fn intercept_message(
        &self,
        event: &MessageEvent,
        now: Instant,
        out: &mut Outbox,
    ) -> bool {
        let Some(guild_id) = event.guild_id else {
            return false;
        };
        let outcome = self
            .acquisitions
            .offer_message(guild_id, event.channel_id, event.author.id, &event.content, now)
            .await;
        match outcome {
            Some(AcquisitionOutcome::PromptReactions { keyword, channel_id }) => {
                out.send_text(
                    channel_id,
                    format!(
                        "Awesome! Now react to this message with any reactions I should \
                         have to '{}'. (React {} to stop)",
                        keyword, STOP_EMOJI
                    ),
                );
                true
            }
            Some(outcome) => {
                self.apply_outcome(outcome, out).await;
                true
            }
            None => false,
        }
    }

    /// Feed a reaction-add event to the pending acquisitions.
    pub async fn on_reaction(&self, event: &ReactionAddEvent, now: Instant, out: &mut Outbox) {
        let outcomes = self
            .acquisitions
            .offer_reaction(event.channel_id, event.user_id, &event.emoji, now)
            .await;
        for outcome in outcomes {
            self.apply_outcome(outcome, out).await;
        }
    }

    /// Expire overdue acquisition flows.
    pub async fn sweep(&self, now: Instant, out: &mut Outbox) {
        for outcome in self.acquisitions.sweep(now).await {
            self.apply_outcome(outcome, out).await;
        }
    }

    async fn apply_outcome(&self, outcome: AcquisitionOutcome, out: &mut Outbox) {
        match outcome {
            AcquisitionOutcome::Completed {
                guild_id,
                channel_id,
                keyword,
                trigger,
            } => {
                let mut table = self.triggers.get(guild_id).await;
                // the keyword may have been created by someone else while
                // the flow was collecting; first writer wins
                if table.insert(keyword.clone(), trigger).is_err() {
                    out.send_text(channel_id, format!("Reaction '{}' already exists.", keyword));
                    return;
                }
                match self.triggers.put(guild_id, &table).await {
                    Ok(value) => {
                        info!(guild_id, %keyword, "trigger added");
                        out.persist_change(
                            self.triggers.store_name(),
                            self.triggers.entry_key(),
                            value,
                        );
                        out.send_text(channel_id, format!("Reaction '{}' has been added.", keyword));
                    }
                    Err(e) => {
                        tracing::error!(guild_id, %keyword, "failed to persist trigger: {}", e);
                        out.send_text(channel_id, "Something went wrong saving that reaction.");
                    }
                }
            }
            AcquisitionOutcome::Expired {
                channel_id,
                keyword,
                ..
            } => {
                debug!(%keyword, "acquisition timed out");
                out.send_text(
                    channel_id,
                    format!("Setup for reaction '{}' timed out. Nothing was saved.", keyword),
                );
            }
            AcquisitionOutcome::PromptReactions { .. } => {
                // handled at the interception site
            }
        }
    }

    /// `listreactions`
    pub async fn list(&self, channel_id: u64, guild_id: u64, out: &mut Outbox) {
        let table = self.triggers.get(guild_id).await;
        if table.is_empty() {
            out.send_text(channel_id, "There are no reactions on this server.");
            return;
        }
        let keywords: Vec<&str> = table.keywords().collect();
        out.send_text(channel_id, format!("Reactions: {}", keywords.join(", ")));
    }

    /// `viewreaction <keyword>`
    pub async fn view(&self, channel_id: u64, guild_id: u64, keyword: &str, out: &mut Outbox) {
        let table = self.triggers.get(guild_id).await;
        let Some(trigger) = table.get(keyword) else {
            out.send_text(channel_id, format!("Reaction '{}' was not found.", keyword));
            return;
        };
        let response = trigger.response.as_deref().filter(|r| !r.is_empty()).unwrap_or("-");
        let reacts = if trigger.reactions.is_empty() {
            "-".to_string()
        } else {
            trigger.reactions.join(" ")
        };
        out.send_text(
            channel_id,
            format!(
                "Here's what I say to '{}': {}\nReactions: {}",
                keyword, response, reacts
            ),
        );
    }

    /// `deletereaction <keyword>`
    pub async fn delete(&self, channel_id: u64, guild_id: u64, keyword: &str, out: &mut Outbox) {
        let mut table = self.triggers.get(guild_id).await;
        if table.remove(keyword).is_none() {
            out.send_text(channel_id, format!("Reaction '{}' was not found.", keyword));
            return;
        }
        match self.triggers.put(guild_id, &table).await {
            Ok(value) => {
                out.persist_change(self.triggers.store_name(), self.triggers.entry_key(), value);
                out.send_text(channel_id, format!("Reaction '{}' has been deleted.", keyword));
            }
            Err(e) => {
                tracing::error!(guild_id, %keyword, "failed to persist deletion: {}", e);
                out.send_text(channel_id, "Something went wrong deleting that reaction.");
            }
        }
    }

    /// `deleteallreactions`
    pub async fn delete_all(&self, channel_id: u64, guild_id: u64, out: &mut Outbox) {
        let table = self.triggers.get(guild_id).await;
        if table.is_empty() {
            out.send_text(channel_id, "This server has no reactions.");
            return;
        }
        match self.triggers.put(guild_id, &TriggerTable::new()).await {
            Ok(value) => {
                out.persist_change(self.triggers.store_name(), self.triggers.entry_key(), value);
                out.send_text(channel_id, "All reactions have been deleted.");
            }
            Err(e) => {
                tracing::error!(guild_id, "failed to clear triggers: {}", e);
                out.send_text(channel_id, "Something went wrong deleting the reactions.");
            }
        }
    }
}
