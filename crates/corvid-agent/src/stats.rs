//! Per-guild command usage counters

use std::sync::Arc;

use tracing::warn;

use corvid_store::{GuildScopedTable, KeyedStore};
use corvid_types::{CommandStats, Outbox};

pub struct Stats {
    counters: GuildScopedTable<CommandStats>,
}

impl Stats {
    pub fn new(store: Arc<KeyedStore>) -> Self {
        Self {
            counters: GuildScopedTable::new(store, "commands"),
        }
    }

    /// Count one invocation. Counter loss is tolerable, so a failed persist
    /// is logged rather than propagated.
    pub async fn record(&self, guild_id: u64, command: &str) {
        let mut counters = self.counters.get(guild_id).await;
        *counters.entry(command.to_string()).or_insert(0) += 1;
        if let Err(e) = self.counters.put(guild_id, &counters).await {
            warn!(guild_id, command, "failed to persist command stats: {}", e);
        }
    }

    /// `commandstats` — report this guild's counters.
    pub async fn report(&self, channel_id: u64, guild_id: u64, out: &mut Outbox) {
        let counters = self.counters.get(guild_id).await;
        if counters.is_empty() {
            out.send_text(channel_id, "No commands have been used in this server.");
            return;
        }
        let mut entries: Vec<(&String, &u64)> = counters.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let lines: Vec<String> = entries
            .iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect();
        out.send_text(
            channel_id,
            format!("Command stats:\n{}", lines.join("\n")),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_stats(dir: &tempfile::TempDir) -> Stats {
        Stats::new(Arc::new(KeyedStore::open(dir.path(), "stats.json").unwrap()))
    }

    #[tokio::test]
    async fn test_record_increments() {
        let dir = tempfile::tempdir().unwrap();
        let stats = make_stats(&dir).await;

        stats.record(100, "plonk").await;
        stats.record(100, "plonk").await;
        stats.record(100, "ignore").await;
        stats.record(200, "plonk").await;

        let mut out = Outbox::new();
        stats.report(500, 100, &mut out).await;
        let intents = out.into_intents();
        assert_eq!(intents.len(), 1);
        match &intents[0] {
            corvid_types::Intent::SendText(cmd) => {
                assert!(cmd.text.contains("plonk: 2"), "got: {}", cmd.text);
                assert!(cmd.text.contains("ignore: 1"));
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_report_empty_guild() {
        let dir = tempfile::tempdir().unwrap();
        let stats = make_stats(&dir).await;

        let mut out = Outbox::new();
        stats.report(500, 100, &mut out).await;
        match &out.into_intents()[0] {
            corvid_types::Intent::SendText(cmd) => {
                assert!(cmd.text.contains("No commands"));
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }
}
