//! Unit tests for EventProcessor

#[cfg(test)]
mod tests {
    use tokio::time::{Duration, Instant};

    use corvid_store::StoreRegistry;
    use corvid_types::{
        Actor, Capabilities, EventMetadata, Intent, MessageEvent, ReactionAddEvent,
    };

    use crate::acquire::{PHASE_TIMEOUT, STOP_EMOJI};
    use crate::processor::EventProcessor;

    const GUILD: u64 = 100;
    const CHANNEL: u64 = 500;
    const MOD_USER: u64 = 42;

    async fn make_processor(dir: &tempfile::TempDir, owner_id: Option<u64>) -> EventProcessor {
        let registry = StoreRegistry::new(dir.path());
        EventProcessor::new("!", owner_id, &registry).await.unwrap()
    }

    fn moderator() -> Actor {
        Actor {
            id: MOD_USER,
            bot: false,
            caps: Capabilities {
                manage_guild: true,
                manage_channels: true,
                manage_messages: true,
                ..Capabilities::default()
            },
        }
    }

    fn plain_user(id: u64) -> Actor {
        Actor {
            id,
            bot: false,
            caps: Capabilities::default(),
        }
    }

    fn make_msg(author: Actor, guild_id: Option<u64>, content: &str) -> MessageEvent {
        MessageEvent {
            metadata: EventMetadata::new(1),
            message_id: 1,
            channel_id: CHANNEL,
            guild_id,
            author,
            content: content.to_string(),
        }
    }

    fn make_reaction(user_id: u64, emoji: &str) -> ReactionAddEvent {
        ReactionAddEvent {
            metadata: EventMetadata::new(1),
            user_id,
            channel_id: CHANNEL,
            message_id: 99,
            guild_id: Some(GUILD),
            emoji: emoji.to_string(),
        }
    }

    fn texts(intents: &[Intent]) -> Vec<String> {
        intents
            .iter()
            .filter_map(|i| match i {
                Intent::SendText(cmd) => Some(cmd.text.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_trigger_scenario() {
        // empty reactions store → add "gg" interactively → "well gg" fires
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let now = Instant::now();

        // start the flow
        let intents = processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!acr gg"), now)
            .await;
        assert!(texts(&intents)[0].contains("Okay, I'll react to 'gg'"));

        // phase 1: the requester's next message is the response
        let intents = processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "Good game!"), now)
            .await;
        assert!(texts(&intents)[0].contains("react to this message"));

        // phase 2: collect one emoji, then stop
        let intents = processor
            .process_reaction_at(&make_reaction(MOD_USER, "🎉"), now)
            .await;
        assert!(intents.is_empty());
        let intents = processor
            .process_reaction_at(&make_reaction(MOD_USER, STOP_EMOJI), now)
            .await;
        let sent = texts(&intents);
        assert!(
            sent.iter().any(|t| t.contains("'gg' has been added")),
            "got: {:?}",
            sent
        );
        assert!(
            intents
                .iter()
                .any(|i| matches!(i, Intent::PersistChange(_))),
            "trigger write must surface a persist intent"
        );

        // a plain user's free text now fires the trigger
        let intents = processor
            .process_message_at(&make_msg(plain_user(7), Some(GUILD), "well gg"), now)
            .await;
        let mut saw_text = false;
        let mut saw_reaction = false;
        for intent in &intents {
            match intent {
                Intent::SendText(cmd) => {
                    assert_eq!(cmd.channel_id, CHANNEL);
                    assert_eq!(cmd.text, "Good game!");
                    saw_text = true;
                }
                Intent::AddReaction(cmd) => {
                    assert_eq!(cmd.message_id, 1);
                    assert_eq!(cmd.emoji, "🎉");
                    saw_reaction = true;
                }
                other => panic!("unexpected intent: {:?}", other),
            }
        }
        assert!(saw_text && saw_reaction);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_scenario() {
        // disable a command in one guild; another guild is unaffected
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let now = Instant::now();

        let intents = processor
            .process_message_at(
                &make_msg(moderator(), Some(GUILD), "!disable listreactions"),
                now,
            )
            .await;
        assert!(texts(&intents)[0].contains("disabled in this server"));

        // a non-owner invoking the disabled command gets nothing at all
        let mut actor = plain_user(7);
        actor.caps.manage_messages = true;
        let intents = processor
            .process_message_at(&make_msg(actor.clone(), Some(GUILD), "!listreactions"), now)
            .await;
        assert!(intents.is_empty(), "disabled command must be dropped");

        // same invocation in a guild without a disable entry goes through
        let event = MessageEvent {
            guild_id: Some(999),
            ..make_msg(actor, Some(GUILD), "!listreactions")
        };
        let intents = processor.process_message_at(&event, now).await;
        assert!(texts(&intents)[0].contains("no reactions on this server"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_owner_bypasses_ban_and_disable() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, Some(MOD_USER)).await;
        let now = Instant::now();

        // the owner plonks themselves and disables the command...
        processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!plonk 42"), now)
            .await;
        processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!disable plonks"), now)
            .await;

        // ...and can still use the bot
        let intents = processor
            .process_message_at(&make_msg(plain_user(MOD_USER), Some(GUILD), "!plonks"), now)
            .await;
        assert!(
            texts(&intents)[0].contains("Plonked Users"),
            "owner must bypass their own ban list"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_banned_user_is_dropped_unless_manager() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let now = Instant::now();

        processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!plonk <@7>"), now)
            .await;

        let intents = processor
            .process_message_at(&make_msg(plain_user(7), Some(GUILD), "!commandstats"), now)
            .await;
        assert!(intents.is_empty(), "banned user must be dropped");

        // manage-guild capability overrides ban-list membership
        let mut manager = plain_user(7);
        manager.caps.manage_guild = true;
        let intents = processor
            .process_message_at(&make_msg(manager, Some(GUILD), "!commandstats"), now)
            .await;
        assert!(!intents.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_author_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let mut actor = moderator();
        actor.bot = true;
        let intents = processor
            .process_message_at(
                &make_msg(actor, Some(GUILD), "!listreactions"),
                Instant::now(),
            )
            .await;
        assert!(intents.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guild_command_refused_in_dms() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let intents = processor
            .process_message_at(&make_msg(moderator(), None, "!plonks"), Instant::now())
            .await;
        assert!(texts(&intents)[0].contains("private messages"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_capability_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let intents = processor
            .process_message_at(
                &make_msg(plain_user(7), Some(GUILD), "!plonk <@9>"),
                Instant::now(),
            )
            .await;
        assert!(texts(&intents)[0].contains("permission"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_command_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let intents = processor
            .process_message_at(
                &make_msg(plain_user(7), Some(GUILD), "!frobnicate now"),
                Instant::now(),
            )
            .await;
        assert!(intents.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_trigger_rejected_without_state_change() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let now = Instant::now();

        // create "gg" with no response and no reactions
        processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!acr gg"), now)
            .await;
        processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "$none"), now)
            .await;
        processor
            .process_reaction_at(&make_reaction(MOD_USER, STOP_EMOJI), now)
            .await;

        let intents = processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!acr GG"), now)
            .await;
        assert!(
            texts(&intents)[0].contains("already exists"),
            "duplicate keyword must be rejected case-insensitively"
        );

        // a silent trigger produces no intents when matched
        let intents = processor
            .process_message_at(&make_msg(plain_user(7), Some(GUILD), "gg"), now)
            .await;
        assert!(intents.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_timeout_discards_state() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let now = Instant::now();

        processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!acr gg"), now)
            .await;

        let intents = processor.sweep(now + PHASE_TIMEOUT).await;
        assert!(
            texts(&intents)[0].contains("timed out"),
            "timeout must be reported"
        );

        // nothing was written: the keyword is free again
        let intents = processor
            .process_message_at(
                &make_msg(moderator(), Some(GUILD), "!acr gg"),
                now + PHASE_TIMEOUT + Duration::from_secs(1),
            )
            .await;
        assert!(texts(&intents)[0].contains("Okay, I'll react to 'gg'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignore_suppresses_triggers_but_not_admins() {
        let dir = tempfile::tempdir().unwrap();
        let processor = make_processor(&dir, None).await;
        let now = Instant::now();

        let intents = processor
            .process_message_at(&make_msg(moderator(), Some(GUILD), "!ignore"), now)
            .await;
        assert!(texts(&intents)[0].contains("will be ignored"));

        // ordinary traffic in the ignored channel is dropped
        let intents = processor
            .process_message_at(&make_msg(plain_user(7), Some(GUILD), "!commandstats"), now)
            .await;
        assert!(intents.is_empty());

        // an administrator still gets through
        let mut admin = plain_user(8);
        admin.caps.administrator = true;
        let intents = processor
            .process_message_at(&make_msg(admin, Some(GUILD), "!commandstats"), now)
            .await;
        assert!(!intents.is_empty());

        // unignore restores processing
        let mut unignorer = moderator();
        unignorer.caps.administrator = true;
        processor
            .process_message_at(&make_msg(unignorer, Some(GUILD), "!unignore"), now)
            .await;
        let intents = processor
            .process_message_at(&make_msg(plain_user(7), Some(GUILD), "!commandstats"), now)
            .await;
        assert!(!intents.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_survives_processor_restart() {
        let dir = tempfile::tempdir().unwrap();
        let now = Instant::now();
        {
            let processor = make_processor(&dir, None).await;
            processor
                .process_message_at(&make_msg(moderator(), Some(GUILD), "!plonk <@7>"), now)
                .await;
        }
        // fresh processor over the same data directory sees the ban
        let processor = make_processor(&dir, None).await;
        let intents = processor
            .process_message_at(&make_msg(plain_user(7), Some(GUILD), "!commandstats"), now)
            .await;
        assert!(intents.is_empty(), "ban must survive a reload");
    }
}
