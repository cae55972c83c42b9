//! Interactive trigger acquisition
//!
//! Building a trigger takes two bounded phases: capture one text reply from
//! the requester (the response), then collect reaction tokens until the
//! requester applies the stop token. Each waiting state carries its own
//! deadline; the flow is driven entirely by inbound events and a clock
//! parameter, never by blocking waits, so a walked-away requester costs a
//! map entry until the next sweep instead of a hung task.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

use corvid_types::Trigger;

/// Reply meaning "no response text"
pub const NO_RESPONSE_SENTINEL: &str = "$none";

/// Reaction token that ends phase 2 when applied by the requester
pub const STOP_EMOJI: &str = "\u{23F9}";

/// Bound on each waiting phase
pub const PHASE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    AwaitingResponse,
    AwaitingReactions,
    Complete,
    TimedOut,
}

/// One in-flight acquisition
#[derive(Debug)]
pub struct TriggerAcquisition {
    keyword: String,
    guild_id: u64,
    channel_id: u64,
    requester: u64,
    state: AcquisitionState,
    response: Option<String>,
    reactions: Vec<String>,
    deadline: Instant,
}

impl TriggerAcquisition {
    pub fn begin(
        keyword: impl Into<String>,
        guild_id: u64,
        channel_id: u64,
        requester: u64,
        now: Instant,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            guild_id,
            channel_id,
            requester,
            state: AcquisitionState::AwaitingResponse,
            response: None,
            reactions: Vec::new(),
            deadline: now + PHASE_TIMEOUT,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Phase 1: consume the requester's reply as the response text and move
    /// to reaction capture. Returns false if the flow is not waiting for a
    /// reply from this author.
    pub fn on_message(&mut self, author: u64, content: &str, now: Instant) -> bool {
        if self.state != AcquisitionState::AwaitingResponse || author != self.requester {
            return false;
        }
        self.response = if content.eq_ignore_ascii_case(NO_RESPONSE_SENTINEL) {
            None
        } else {
            Some(content.to_string())
        };
        self.state = AcquisitionState::AwaitingReactions;
        self.deadline = now + PHASE_TIMEOUT;
        true
    }

    /// Phase 2: collect one reaction token. The stop token from the
    /// requester completes the flow; from anyone else it is ignored. All
    /// other reactions accumulate regardless of who applied them. Returns
    /// true when the flow just completed.
    pub fn on_reaction(&mut self, user: u64, emoji: &str) -> bool {
        if self.state != AcquisitionState::AwaitingReactions {
            return false;
        }
        if emoji == STOP_EMOJI {
            if user == self.requester {
                self.state = AcquisitionState::Complete;
                return true;
            }
            return false;
        }
        self.reactions.push(emoji.to_string());
        false
    }

    /// Expire a waiting flow whose deadline has passed.
    pub fn expire_if_due(&mut self, now: Instant) -> bool {
        let waiting = matches!(
            self.state,
            AcquisitionState::AwaitingResponse | AcquisitionState::AwaitingReactions
        );
        if waiting && now >= self.deadline {
            self.state = AcquisitionState::TimedOut;
            return true;
        }
        false
    }

    /// Combine the captured pieces into the trigger record. Only meaningful
    /// once the flow is complete.
    pub fn finish(self) -> Trigger {
        Trigger {
            response: self.response.filter(|r| !r.is_empty()),
            reactions: self.reactions,
        }
    }
}

/// What happened when an event was offered to the pending acquisitions
#[derive(Debug)]
pub enum AcquisitionOutcome {
    /// The event advanced a flow into reaction capture
    PromptReactions { keyword: String, channel_id: u64 },
    /// A flow finished; the trigger is ready to be written
    Completed {
        guild_id: u64,
        channel_id: u64,
        keyword: String,
        trigger: Trigger,
    },
    /// A flow ran out of time; partial state was discarded
    Expired {
        channel_id: u64,
        requester: u64,
        keyword: String,
    },
}

/// Pending acquisitions keyed by (guild, channel, requester)
#[derive(Default)]
pub struct AcquisitionManager {
    pending: Mutex<HashMap<(u64, u64, u64), TriggerAcquisition>>,
}

impl AcquisitionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new flow. Returns false if the requester already has one
    /// pending in this channel.
    pub async fn begin(&self, acq: TriggerAcquisition) -> bool {
        let key = (acq.guild_id, acq.channel_id, acq.requester);
        let mut pending = self.pending.lock().await;
        if pending.contains_key(&key) {
            return false;
        }
        debug!(keyword = acq.keyword(), "acquisition started");
        pending.insert(key, acq);
        true
    }

    /// Offer a message to the pending flows. Consumes it (returning an
    /// outcome) only when the author has a flow awaiting its response in
    /// this channel.
    pub async fn offer_message(
        &self,
        guild_id: u64,
        channel_id: u64,
        author: u64,
        content: &str,
        now: Instant,
    ) -> Option<AcquisitionOutcome> {
        let key = (guild_id, channel_id, author);
        let mut pending = self.pending.lock().await;
        let mut acq = pending.remove(&key)?;

        if acq.expire_if_due(now) {
            return Some(AcquisitionOutcome::Expired {
                channel_id: acq.channel_id,
                requester: acq.requester,
                keyword: acq.keyword,
            });
        }

        let advanced = acq.on_message(author, content, now);
        let outcome = advanced.then(|| AcquisitionOutcome::PromptReactions {
            keyword: acq.keyword.clone(),
            channel_id: acq.channel_id,
        });
        pending.insert(key, acq);
        outcome
    }

    /// Offer a reaction-add to every flow collecting in this channel.
    pub async fn offer_reaction(
        &self,
        channel_id: u64,
        user: u64,
        emoji: &str,
        now: Instant,
    ) -> Vec<AcquisitionOutcome> {
        let mut outcomes = Vec::new();
        let mut pending = self.pending.lock().await;

        let keys: Vec<(u64, u64, u64)> = pending
            .keys()
            .filter(|(_, ch, _)| *ch == channel_id)
            .copied()
            .collect();

        for key in keys {
            let Some(mut acq) = pending.remove(&key) else {
                continue;
            };
            if acq.expire_if_due(now) {
                outcomes.push(AcquisitionOutcome::Expired {
                    channel_id: acq.channel_id,
                    requester: acq.requester,
                    keyword: acq.keyword,
                });
                continue;
            }
            if acq.on_reaction(user, emoji) {
                let guild_id = acq.guild_id;
                let channel_id = acq.channel_id;
                let keyword = acq.keyword.clone();
                outcomes.push(AcquisitionOutcome::Completed {
                    guild_id,
                    channel_id,
                    keyword,
                    trigger: acq.finish(),
                });
                continue;
            }
            pending.insert(key, acq);
        }

        outcomes
    }

    /// Expire every overdue flow. Run periodically so abandoned flows do not
    /// sit in the map forever.
    pub async fn sweep(&self, now: Instant) -> Vec<AcquisitionOutcome> {
        let mut pending = self.pending.lock().await;
        let expired: Vec<(u64, u64, u64)> = pending
            .iter_mut()
            .filter_map(|(key, acq)| acq.expire_if_due(now).then_some(*key))
            .collect();

        expired
            .into_iter()
            .filter_map(|key| pending.remove(&key))
            .map(|acq| AcquisitionOutcome::Expired {
                channel_id: acq.channel_id,
                requester: acq.requester,
                keyword: acq.keyword,
            })
            .collect()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
