//! Agent event loop
//!
//! Reads newline-delimited JSON inbound events from stdin, routes them
//! through the processor, and writes the resulting intents as
//! newline-delimited JSON on stdout. The gateway owning the real chat
//! session sits on the other side of both pipes.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info};

use corvid_types::{InboundEvent, Intent};

use crate::processor::EventProcessor;

/// How often overdue interactive flows are expired.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

pub struct Agent {
    processor: EventProcessor,
}

impl Agent {
    pub fn new(processor: EventProcessor) -> Self {
        Self { processor }
    }

    /// Run until stdin closes.
    pub async fn run(self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);

        info!("Agent started, reading events from stdin");

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        None => break,
                        Some(line) if line.trim().is_empty() => continue,
                        Some(line) => {
                            let intents = self.handle_line(&line).await;
                            Self::emit(&mut stdout, &intents).await?;
                        }
                    }
                }
                _ = sweep.tick() => {
                    let intents = self.processor.sweep(Instant::now()).await;
                    Self::emit(&mut stdout, &intents).await?;
                }
            }
        }

        info!("stdin closed, agent stopping");
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Vec<Intent> {
        let event: InboundEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                error!("Failed to deserialize inbound event: {}", e);
                return Vec::new();
            }
        };

        match event {
            InboundEvent::Message(msg) => {
                debug!(
                    author = msg.author.id,
                    channel = msg.channel_id,
                    "received message event"
                );
                self.processor.process_message(&msg).await
            }
            InboundEvent::ReactionAdd(reaction) => {
                debug!(
                    user = reaction.user_id,
                    channel = reaction.channel_id,
                    "received reaction event"
                );
                self.processor.process_reaction(&reaction).await
            }
        }
    }

    async fn emit(stdout: &mut tokio::io::Stdout, intents: &[Intent]) -> Result<()> {
        for intent in intents {
            let mut line = serde_json::to_string(intent)?;
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
        }
        if !intents.is_empty() {
            stdout.flush().await?;
        }
        Ok(())
    }
}
