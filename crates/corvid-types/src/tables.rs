//! Typed per-feature configuration records
//!
//! These are the values that live inside the keyed stores. Deserializing
//! through these types is what validates a store's shape on load; at the
//! storage boundary everything is still generic JSON.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::TriggerError;

/// A configured keyword trigger: an automatic response and/or a set of
/// emoji reactions applied when the keyword is matched in free text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Trigger {
    /// Text to send when the trigger matches. None means react only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Reaction tokens applied in order when the trigger matches
    #[serde(default)]
    pub reactions: Vec<String>,
}

/// Keyword → trigger mapping for one guild.
///
/// Keys keep the casing they were created with for display; lookups and the
/// uniqueness rule are case-insensitive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TriggerTable(BTreeMap<String, Trigger>);

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Keywords in iteration order (stored casing)
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Trigger)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Case-insensitive lookup
    pub fn get(&self, keyword: &str) -> Option<&Trigger> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(keyword))
            .map(|(_, v)| v)
    }

    /// Insert a new trigger. Fails if a keyword differing only in case is
    /// already present; existing entries are never overwritten here.
    pub fn insert(&mut self, keyword: String, trigger: Trigger) -> Result<(), TriggerError> {
        if self.get(&keyword).is_some() {
            return Err(TriggerError::AlreadyExists(keyword));
        }
        self.0.insert(keyword, trigger);
        Ok(())
    }

    /// Case-insensitive removal. Returns the removed trigger, if any.
    pub fn remove(&mut self, keyword: &str) -> Option<Trigger> {
        let stored = self
            .0
            .keys()
            .find(|k| k.eq_ignore_ascii_case(keyword))
            .cloned()?;
        self.0.remove(&stored)
    }
}

/// Channel ids where command processing is suppressed. Global, not
/// per-guild: one flat set shared by every guild the bot is in.
pub type IgnoreList = BTreeSet<u64>;

/// Command root names disabled in one guild
pub type DisabledCommands = BTreeSet<String>;

/// User ids barred from invoking commands in one guild ("plonks")
pub type BanList = BTreeSet<u64>;

/// Per-guild command invocation counters
pub type CommandStats = BTreeMap<String, u64>;
