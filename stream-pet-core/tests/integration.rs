//! Integration tests for the stream pet dispatcher.
//!
//! Every test runs on a paused tokio clock, so timers (message durations,
//! image reverts, auto-recovery, cooldowns) fire deterministically as the
//! runtime auto-advances.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{json, Value};
use stream_pet_core::config::CommandConfig;
use stream_pet_core::storage::STORAGE_KEY;
use stream_pet_core::config::{Position, RainAudience};
use stream_pet_core::{
    Animation, Chatter, ConfigStore, ControlMessage, Effect, EffectReceiver, Emotion, Error,
    Feature, FileStorage, MemoryStorage, Notification, Options, ParticleKind, Payload, PetConfig,
    Role, Storage, StreamPet,
};
use tokio::time::sleep;

/// Defaults with every ambient timer switched off, so only what a test
/// triggers produces effects.
fn quiet() -> PetConfig {
    let mut config = PetConfig::default();
    config.advanced.enable_idle_animations = false;
    config.pet.blink_interval = 0;
    config.greetings.enabled = false;
    for state in config.states.values_mut() {
        state.check_interval = 0;
    }
    config
}

/// Seeded options pinned to a date outside every seasonal theme.
fn options() -> Options {
    Options::new()
        .seed(7)
        .season_date(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())
}

fn pet_with(mut config: PetConfig, options: Options) -> (StreamPet, EffectReceiver) {
    let store = ConfigStore::in_memory();
    store.save(&mut config).unwrap();
    StreamPet::new(store, options)
}

fn payload(value: Value) -> Payload {
    value.as_object().cloned().unwrap()
}

/// Let spawned tasks run without crossing any real timer.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn drain(rx: &mut EffectReceiver) -> Vec<Effect> {
    let mut effects = Vec::new();
    while let Ok(effect) = rx.try_recv() {
        effects.push(effect);
    }
    effects
}

fn images(effects: &[Effect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::ImageShown { path, .. } => Some(path.as_str()),
            _ => None,
        })
        .collect()
}

/// Wait for the next `n` bubbles, skipping every other effect.
async fn next_messages(rx: &mut EffectReceiver, n: usize) -> Vec<String> {
    let mut texts = Vec::new();
    while texts.len() < n {
        match rx.recv().await {
            Some(Effect::MessageShown { text, .. }) => texts.push(text),
            Some(_) => {}
            None => break,
        }
    }
    texts
}

#[tokio::test(start_paused = true)]
async fn test_disabled_event_has_no_effect() {
    let mut config = quiet();
    config.events.get_mut("follow").unwrap().enabled = false;
    let (pet, mut rx) = pet_with(config, options());

    assert!(!pet.trigger_event("follow", &payload(json!({ "username": "Ann" }))));
    assert!(!pet.trigger_event("hostRaid", &Payload::new()));
    settle().await;

    assert!(drain(&mut rx).is_empty());
    assert_eq!(pet.config().analytics.stats.events_triggered.get("follow"), None);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_state_is_a_no_op() {
    let (pet, mut rx) = pet_with(quiet(), options());

    assert!(!pet.change_state("dancing"));
    assert!(!pet.change_state("default"));
    settle().await;

    assert_eq!(pet.current_state(), "default");
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_event_reaction_and_image_revert() {
    let (pet, mut rx) = pet_with(quiet(), options());

    assert!(pet.trigger_event("follow", &payload(json!({ "username": "Ann" }))));
    settle().await;
    let effects = drain(&mut rx);
    assert!(effects.contains(&Effect::MessageShown {
        text: "Thanks for the follow, Ann! 💜".to_string(),
        style: "default".to_string(),
    }));
    assert_eq!(images(&effects), vec!["Images/happy.png"]);
    assert_eq!(pet.current_image().as_deref(), Some("Images/happy.png"));

    sleep(Duration::from_millis(4000)).await;
    let effects = drain(&mut rx);
    assert_eq!(images(&effects), vec!["Images/default.png"]);

    let config = pet.config();
    assert_eq!(config.analytics.stats.events_triggered.get("follow"), Some(&1));
    assert_eq!(config.growth.experience, 10);
}

#[tokio::test(start_paused = true)]
async fn test_newer_image_cancels_pending_revert() {
    let (pet, mut rx) = pet_with(quiet(), options());

    pet.show_image("Images/happy.png", Some(Duration::from_millis(1000)));
    sleep(Duration::from_millis(500)).await;
    pet.show_image("Images/curious.png", None);
    sleep(Duration::from_millis(2000)).await;

    let effects = drain(&mut rx);
    assert_eq!(images(&effects), vec!["Images/happy.png", "Images/curious.png"]);
}

#[tokio::test(start_paused = true)]
async fn test_messages_display_in_order() {
    let (pet, mut rx) = pet_with(quiet(), options());

    assert!(pet.show_message("first", Some(Duration::from_millis(1000))));
    assert!(pet.show_message("second", None));
    assert!(pet.show_message("third", None));
    assert!(!pet.show_message("   ", None));
    assert_eq!(pet.messages().pending(), 2);

    let texts = next_messages(&mut rx, 3).await;
    assert_eq!(texts, vec!["first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn test_state_allow_list_gates_events() {
    let (pet, mut rx) = pet_with(quiet(), options());

    assert!(pet.change_state("sad"));
    assert_eq!(pet.current_state(), "sad");
    assert!(!pet.trigger_event("follow", &payload(json!({ "username": "Ann" }))));
    assert!(pet.trigger_event(
        "raid",
        &payload(json!({ "raider": "Dee", "count": 12 }))
    ));

    // The raid image reverts to the state's image, not the default one
    sleep(Duration::from_millis(5001)).await;
    let effects = drain(&mut rx);
    assert!(effects.contains(&Effect::StateChanged {
        from: "default".to_string(),
        to: "sad".to_string(),
    }));
    assert_eq!(
        images(&effects),
        vec!["Images/sad.png", "Images/excited.png", "Images/sad.png"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_recover_after_configured_time() {
    let (pet, _rx) = pet_with(quiet(), options());

    assert!(pet.change_state("excited"));
    sleep(Duration::from_millis(29_999)).await;
    assert_eq!(pet.current_state(), "excited");
    sleep(Duration::from_millis(2)).await;
    assert_eq!(pet.current_state(), "default");
}

#[tokio::test(start_paused = true)]
async fn test_stale_auto_recover_does_not_cut_later_entry_short() {
    let (pet, _rx) = pet_with(quiet(), options());

    pet.change_state("excited");
    sleep(Duration::from_millis(10_000)).await;
    pet.recover_from_state();
    sleep(Duration::from_millis(10_000)).await;
    pet.change_state("excited");

    // The first entry's timer would fire here
    sleep(Duration::from_millis(10_001)).await;
    assert_eq!(pet.current_state(), "excited");

    sleep(Duration::from_millis(20_000)).await;
    assert_eq!(pet.current_state(), "default");
}

#[tokio::test(start_paused = true)]
async fn test_chat_command_cooldown_and_template() {
    let (pet, mut rx) = pet_with(quiet(), options());
    let ann = Chatter::new("Ann");

    assert!(pet.handle_chat_message(&ann, "!treat please"));
    assert!(!pet.handle_chat_message(&ann, "!treat"));
    assert!(!pet.handle_chat_message(&ann, "!treatment"));

    let texts = next_messages(&mut rx, 1).await;
    assert_eq!(texts, vec!["Ann gave me a treat! 🍪"]);

    sleep(Duration::from_millis(10_000)).await;
    assert!(pet.handle_chat_command("!treat", &Chatter::new("Bo")));
    assert_eq!(pet.config().analytics.stats.commands_used.get("!treat"), Some(&2));
}

#[tokio::test(start_paused = true)]
async fn test_command_role_gate() {
    let mut config = quiet();
    config.commands.insert(
        "!hug".to_string(),
        CommandConfig {
            message: "Hugs from {username}!".to_string(),
            required_role: Role::Moderator,
            ..CommandConfig::default()
        },
    );
    let (pet, _rx) = pet_with(config, options());

    assert!(!pet.handle_chat_message(&Chatter::with_role("viewer", Role::Vip), "!hug"));
    assert!(pet.handle_chat_message(&Chatter::with_role("mod", Role::Moderator), "!hug"));

    // Cooldowns are per command, not per chatter
    assert!(!pet.handle_chat_message(&Chatter::with_role("owner", Role::Broadcaster), "!hug"));
    sleep(Duration::from_millis(10_000)).await;
    assert!(pet.handle_chat_message(&Chatter::with_role("owner", Role::Broadcaster), "!hug"));
}

#[tokio::test(start_paused = true)]
async fn test_recovery_command_from_chat() {
    let (pet, mut rx) = pet_with(quiet(), options());
    pet.change_state("sad");

    assert!(pet.handle_chat_message(&Chatter::new("Ann"), "  !PET  "));
    assert_eq!(pet.current_state(), "default");

    let texts = next_messages(&mut rx, 3).await;
    assert_eq!(
        texts,
        vec![
            "I'm feeling a bit down... 😢",
            "Thanks for the pets! 💜",
            "Ann cheered me up! 💖",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_recovery_command_respects_role() {
    let mut config = quiet();
    config.commands.remove("!pet");
    config.states.get_mut("sad").unwrap().required_role = Role::Subscriber;
    let (pet, _rx) = pet_with(config, options());
    pet.change_state("sad");

    assert!(!pet.handle_chat_message(&Chatter::new("Ann"), "!pet"));
    assert_eq!(pet.current_state(), "sad");

    assert!(!pet.handle_recovery_command("asleep", "Ann"));
    assert!(pet.handle_chat_message(&Chatter::with_role("Bo", Role::Subscriber), "!pet"));
    assert_eq!(pet.current_state(), "default");
}

#[tokio::test(start_paused = true)]
async fn test_bus_test_state_resets() {
    let (pet, _rx) = pet_with(quiet(), options());

    pet.handle_bus_message("null", r#"{"type":"testState","stateName":"sad"}"#)
        .unwrap();
    assert_eq!(pet.current_state(), "sad");

    sleep(Duration::from_millis(4999)).await;
    assert_eq!(pet.current_state(), "sad");
    sleep(Duration::from_millis(2)).await;
    assert_eq!(pet.current_state(), "default");
}

#[tokio::test(start_paused = true)]
async fn test_bus_test_command_outside_state() {
    let (pet, mut rx) = pet_with(quiet(), options());

    pet.handle_bus_message("null", r#"{"type":"testCommand","stateName":"asleep"}"#)
        .unwrap();
    let texts = next_messages(&mut rx, 1).await;
    assert_eq!(texts, vec!["Not in asleep state! Trigger it first."]);

    pet.change_state("asleep");
    pet.handle_control(ControlMessage::TestCommand {
        state_name: "asleep".to_string(),
        username: None,
    })
    .unwrap();
    assert_eq!(pet.current_state(), "default");
    let texts = next_messages(&mut rx, 2).await;
    assert_eq!(texts, vec!["Zzz... 😴", "TestUser woke me up!"]);
}

#[tokio::test(start_paused = true)]
async fn test_bus_rejects_bad_messages() {
    let options = options().no_origins().allow_origin("https://config.local");
    let (pet, mut rx) = pet_with(quiet(), options);

    let err = pet
        .handle_bus_message("https://evil.example", r#"{"type":"stopWeather"}"#)
        .unwrap_err();
    assert!(matches!(err, Error::UntrustedOrigin { .. }));

    let err = pet
        .handle_bus_message("https://config.local", r#"{"type":"danceParty"}"#)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownMessage { .. }));

    pet.handle_bus_message(
        "https://config.local",
        r#"{"type":"startWeather"}"#,
    )
    .unwrap();
    assert_eq!(pet.weather().as_deref(), Some("rain"));
    settle().await;
    assert_eq!(
        drain(&mut rx),
        vec![Effect::WeatherStarted {
            kind: "rain".to_string()
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_force_config_update_reloads() {
    let (pet, mut rx) = pet_with(quiet(), options());
    pet.start().unwrap();
    pet.change_state("sad");

    let mut document = serde_json::to_value(quiet()).unwrap();
    document["pet"]["name"] = json!("Pixel");
    let raw = json!({ "type": "forceConfigUpdate", "config": document }).to_string();
    pet.handle_bus_message("null", &raw).unwrap();

    assert_eq!(pet.config().pet.name, "Pixel");
    assert_eq!(pet.store().load().pet.name, "Pixel");
    assert_eq!(pet.current_state(), "default");
    settle().await;
    assert!(drain(&mut rx).contains(&Effect::ConfigReloaded));

    let err = pet
        .handle_bus_message("null", r#"{"type":"forceConfigUpdate","config":{"pet":{}}}"#)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    pet.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cheer_notification_respects_minimum() {
    let (pet, mut rx) = pet_with(quiet(), options());
    let cheer = |bits: u64| -> Notification {
        serde_json::from_value(json!({
            "subscription": { "type": "channel.cheer" },
            "event": { "user_name": "Bo", "bits": bits },
        }))
        .unwrap()
    };

    assert!(!pet.handle_notification(cheer(50)));
    assert!(pet.handle_notification(cheer(150)));

    let texts = next_messages(&mut rx, 1).await;
    assert_eq!(texts, vec!["Bo cheered 150 bits! Thanks! ✨"]);
    assert_eq!(pet.config().growth.total_experience, 150);
}

#[tokio::test(start_paused = true)]
async fn test_click_cooldown_and_effects() {
    let (pet, mut rx) = pet_with(quiet(), options());

    assert!(pet.handle_click());
    assert!(!pet.handle_click());
    settle().await;
    let effects = drain(&mut rx);
    assert!(effects.contains(&Effect::ParticlesSpawned {
        kind: ParticleKind::Hearts,
        count: 8,
    }));
    assert!(effects.contains(&Effect::AnimationStarted {
        animation: Animation::Bounce,
    }));
    assert!(effects.contains(&Effect::MessageShown {
        text: "You clicked me! 😊".to_string(),
        style: "default".to_string(),
    }));

    sleep(Duration::from_millis(3000)).await;
    assert!(pet.handle_click());
    assert_eq!(pet.config().analytics.stats.total_clicks, 2);
}

#[tokio::test(start_paused = true)]
async fn test_level_up_celebration() {
    let (pet, mut rx) = pet_with(quiet(), options());

    pet.trigger_event("raid", &payload(json!({ "raider": "Dee", "count": 5 })));
    settle().await;
    let effects = drain(&mut rx);
    assert!(effects.contains(&Effect::LevelUp { level: 2 }));
    assert!(effects.contains(&Effect::ParticlesSpawned {
        kind: ParticleKind::Celebrate,
        count: 20,
    }));
    assert!(effects.contains(&Effect::AnimationStarted {
        animation: Animation::Spin,
    }));
    assert_eq!(pet.store().load().growth.level, 2);
}

#[tokio::test(start_paused = true)]
async fn test_evolution_and_unlocks() {
    let (pet, mut rx) = pet_with(quiet(), options());

    let report = pet.add_experience(1317, "test");
    assert_eq!(report.evolved.as_deref(), Some("Teen"));
    settle().await;

    let effects = drain(&mut rx);
    assert!(effects.contains(&Effect::Evolved {
        stage: "Teen".to_string()
    }));
    assert!(effects.contains(&Effect::Unlocked {
        feature: Feature::Animation,
        name: "spin".to_string(),
    }));
    assert!(effects.contains(&Effect::Unlocked {
        feature: Feature::Particles,
        name: "stars".to_string(),
    }));
    assert!(effects.contains(&Effect::ParticlesSpawned {
        kind: ParticleKind::Stars,
        count: 30,
    }));

    pet.handle_control(ControlMessage::ResetGrowth).unwrap();
    let growth = pet.store().load().growth;
    assert_eq!(growth.level, 1);
    assert_eq!(growth.evolution_stage, 0);
    assert_eq!(growth.total_experience, 1317);
}

#[tokio::test(start_paused = true)]
async fn test_test_level_up_leaves_progress() {
    let (pet, mut rx) = pet_with(quiet(), options());

    pet.handle_control(ControlMessage::TestLevelUp).unwrap();
    settle().await;
    assert!(drain(&mut rx).contains(&Effect::LevelUp { level: 2 }));
    assert_eq!(pet.config().growth.level, 1);
}

#[tokio::test(start_paused = true)]
async fn test_random_state_checks() {
    let mut config = quiet();
    config.states.get_mut("asleep").unwrap().trigger_chance = 0.0;
    {
        let sad = config.states.get_mut("sad").unwrap();
        sad.trigger_chance = 1.0;
        sad.check_interval = 1000;
    }
    let (pet, _rx) = pet_with(config, options());

    assert!(!pet.check_state_change("asleep"));
    pet.start().unwrap();
    assert_eq!(pet.current_state(), "default");

    sleep(Duration::from_millis(1001)).await;
    assert_eq!(pet.current_state(), "sad");

    // Only checked from the default state
    assert!(!pet.check_state_change("excited"));
    pet.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_counts_session_and_applies_season() {
    let options = Options::new()
        .seed(7)
        .season_date(NaiveDate::from_ymd_opt(2024, 10, 31).unwrap());
    let (pet, mut rx) = pet_with(quiet(), options);

    pet.start().unwrap();
    pet.show_message("Boo", None);
    settle().await;

    let effects = drain(&mut rx);
    assert_eq!(images(&effects), vec!["Images/halloween.png"]);
    assert!(effects.contains(&Effect::MessageShown {
        text: "Boo".to_string(),
        style: "fiery".to_string(),
    }));

    let stored = pet.store().load();
    assert_eq!(stored.analytics.session_count, 1);
    assert_eq!(stored.seasonal.current_season, "halloween");
    pet.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_progress_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = || ConfigStore::new(Arc::new(FileStorage::new(dir.path())));

    let (pet, _rx) = StreamPet::new(store(), options());
    pet.start().unwrap();
    pet.trigger_event("follow", &payload(json!({ "username": "Ann" })));
    pet.shutdown().await;

    let (pet, _rx) = StreamPet::new(store(), options());
    pet.start().unwrap();
    let config = pet.config();
    assert_eq!(config.analytics.session_count, 2);
    assert_eq!(config.growth.total_experience, 10);
    assert_eq!(config.analytics.stats.events_triggered.get("follow"), Some(&1));
    pet.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_refuses_further_work() {
    let (pet, _rx) = pet_with(quiet(), options());
    pet.start().unwrap();
    pet.shutdown().await;

    assert!(matches!(
        pet.handle_control(ControlMessage::StopWeather),
        Err(Error::ShutDown)
    ));
    assert!(matches!(pet.start(), Err(Error::ShutDown)));
    assert!(matches!(pet.reload(), Err(Error::ShutDown)));
}

#[tokio::test(start_paused = true)]
async fn test_huge_cheer_saturates_experience() {
    let mut config = quiet();
    config.growth.experience_gains.insert("bits".to_string(), 3);
    let (pet, _rx) = pet_with(config, options());
    let cheer = payload(json!({ "username": "Bo", "amount": "18446744073709551615" }));

    assert!(pet.trigger_event("bits", &cheer));
    assert!(pet.trigger_event("bits", &cheer));

    let growth = pet.config().growth;
    assert_eq!(growth.total_experience, u64::MAX);
    assert!(growth.level > 1);
    assert!(growth.experience < growth.experience_to_next_level);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_document_is_not_overwritten() {
    let storage = Arc::new(MemoryStorage::new());
    let document = json!({
        "pet": { "name": "Mochi", "blinkInterval": "5000" },
        "events": { "follow": { "message": "custom hello {username}" } },
        "states": {}
    });
    storage.set(STORAGE_KEY, &document.to_string()).unwrap();

    let (pet, _rx) = StreamPet::new(ConfigStore::new(storage.clone()), options());
    pet.start().unwrap();
    assert!(pet.store().fell_back());
    assert_eq!(pet.config().pet.name, "Stream Pet");
    pet.trigger_event("follow", &payload(json!({ "username": "Ann" })));
    pet.shutdown().await;

    let raw = storage.get(STORAGE_KEY).unwrap().unwrap();
    assert!(raw.contains("Mochi"));
    assert!(raw.contains("custom hello"));
}

fn redemption(username: &str, reward_id: &str, title: &str) -> Notification {
    serde_json::from_value(json!({
        "subscription": { "type": "channel.channel_points_custom_reward_redemption.add" },
        "event": { "user_name": username, "reward": { "id": reward_id, "title": title } },
    }))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_physics_toggle_and_force() {
    let (pet, mut rx) = pet_with(quiet(), options());

    pet.handle_bus_message("null", r#"{"type":"applyForce","x":3}"#)
        .unwrap();
    assert!(drain(&mut rx).is_empty());

    pet.handle_bus_message("null", r#"{"type":"togglePhysics"}"#)
        .unwrap();
    assert!(pet.physics().enabled);
    pet.handle_bus_message("null", r#"{"type":"applyForce","x":3,"y":-1}"#)
        .unwrap();
    pet.handle_bus_message("null", r#"{"type":"updatePhysicsSettings","bounce":2}"#)
        .unwrap();
    assert_eq!(pet.physics().velocity.x, 3.0);
    assert_eq!(pet.physics().velocity.y, -1.0);

    pet.handle_bus_message("null", r#"{"type":"togglePhysics"}"#)
        .unwrap();
    assert!(!pet.physics().enabled);
    assert_eq!(pet.physics().velocity.x, 0.0);

    assert_eq!(
        drain(&mut rx),
        vec![
            Effect::PhysicsEnabled {
                gravity: 0.5,
                bounce: 0.7
            },
            Effect::ForceApplied { x: 3.0, y: -1.0 },
            Effect::PhysicsUpdated {
                gravity: 0.5,
                bounce: 1.0
            },
            Effect::PhysicsDisabled,
        ]
    );

    // A random push stays within range.
    pet.enable_physics();
    assert!(pet.apply_force(None, None));
    let velocity = pet.physics().velocity;
    assert!(velocity.x.abs() <= 10.0 && velocity.y.abs() <= 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_viewer_command_cooldowns() {
    let (pet, mut rx) = pet_with(quiet(), options());

    pet.handle_bus_message(
        "null",
        r#"{"type":"testCustomCommand","commandName":"hug","username":"Ann"}"#,
    )
    .unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![Effect::EmotionShown {
            emotion: Emotion::Love,
            duration: Duration::from_millis(4000)
        }]
    );

    // Everyone waits out the global cooldown.
    assert!(!pet.handle_chat_command("pet", &Chatter::new("Bo")));
    sleep(Duration::from_millis(5001)).await;
    assert!(pet.handle_chat_command("PET", &Chatter::new("Bo")));
    let effects = drain(&mut rx);
    assert!(effects.contains(&Effect::EmotionShown {
        emotion: Emotion::Happy,
        duration: Duration::from_millis(3000)
    }));
    assert!(effects.contains(&Effect::ParticlesSpawned {
        kind: ParticleKind::Hearts,
        count: 10
    }));

    // Ann's own hug cooldown outlasts the global one.
    sleep(Duration::from_millis(5001)).await;
    assert!(!pet.handle_chat_command("hug", &Chatter::new("Ann")));
    assert!(pet.handle_chat_command("play", &Chatter::new("Ann")));
    settle().await;
    assert!(drain(&mut rx).contains(&Effect::AnimationStarted {
        animation: Animation::Bounce
    }));

    // Configured commands are untouched by the viewer ones.
    assert!(pet.handle_chat_command("!pet", &Chatter::new("Cy")));
}

#[tokio::test(start_paused = true)]
async fn test_viewer_commands_can_be_switched_off() {
    let mut config = quiet();
    config.viewer_interaction.chat_commands.allow_viewer_commands = false;
    let (pet, mut rx) = pet_with(config, options());

    assert!(!pet.handle_chat_command("hug", &Chatter::new("Ann")));
    settle().await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_redemption_runs_action_and_counts() {
    let (pet, mut rx) = pet_with(quiet(), options());

    assert!(pet.handle_notification(redemption("Eve", "x1", "make pet happy")));
    settle().await;
    let effects = drain(&mut rx);
    assert!(effects.contains(&Effect::EmotionShown {
        emotion: Emotion::Happy,
        duration: Duration::from_millis(5000)
    }));
    assert!(effects.contains(&Effect::BannerShown {
        text: "Eve redeemed Make Pet Happy!".to_string(),
        duration: Duration::from_millis(3000)
    }));

    // Matched by reward id despite a renamed title. The redemption's own
    // duration ends the state before its auto-recovery would.
    assert!(pet.handle_redemption("Fay", "Hype!", "pet_hype"));
    assert_eq!(pet.current_state(), "excited");
    sleep(Duration::from_millis(5001)).await;
    assert_eq!(pet.current_state(), "default");

    assert!(!pet.handle_redemption("Gus", "Hydrate", "h2o"));

    let stats = pet.redemption_stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.by_type["Make Pet Happy"], 1);
    assert_eq!(stats.by_type["Hype Pet Up"], 1);
    assert_eq!(stats.recent[1].username, "Fay");
}

#[tokio::test(start_paused = true)]
async fn test_weather_redemption_stops_itself() {
    let (pet, _rx) = pet_with(quiet(), options());

    assert!(pet.handle_redemption("Eve", "Weather Effect", ""));
    let kind = pet.weather().unwrap();
    assert!(["rain", "snow", "leaves", "sakura"].contains(&kind.as_str()));
    sleep(Duration::from_millis(10_001)).await;
    assert_eq!(pet.weather(), None);

    // Weather started by hand outlives an earlier timed stop.
    assert!(pet.handle_redemption("Eve", "Weather Effect", ""));
    sleep(Duration::from_millis(5000)).await;
    pet.start_weather("snow");
    sleep(Duration::from_millis(5001)).await;
    assert_eq!(pet.weather().as_deref(), Some("snow"));
}

#[tokio::test(start_paused = true)]
async fn test_redemptions_switched_off() {
    let mut config = quiet();
    config.viewer_interaction.channel_points.enabled = false;
    let (pet, _rx) = pet_with(config, options());

    assert!(!pet.handle_redemption("Eve", "Spin Pet", "pet_spin"));
    assert_eq!(pet.redemption_stats().total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_closes_itself() {
    let (pet, mut rx) = pet_with(quiet(), options());
    let options: Vec<String> = vec!["hug".to_string(), "feed".to_string()];

    assert!(pet.create_poll("Lonely?", &options[..1], None).is_none());
    let id = pet
        .create_poll("What now?", &options, Some(Duration::from_secs(2)))
        .unwrap();
    assert!(pet.vote(&id, "Ann", 0));
    assert!(!pet.vote(&id, "ann", 1));
    assert!(pet.vote(&id, "Bo", 0));
    assert_eq!(pet.active_poll(&id).unwrap().options[0].voters.len(), 2);

    sleep(Duration::from_millis(2001)).await;
    assert!(pet.active_poll(&id).is_none());
    assert!(!pet.vote(&id, "Cy", 1));

    let effects = drain(&mut rx);
    let ended = effects.iter().find_map(|effect| match effect {
        Effect::PollEnded { results, .. } => Some(results.clone()),
        _ => None,
    });
    let results = ended.unwrap();
    assert_eq!(results.winner, "hug");
    assert_eq!(results.total_votes, 2);
    assert_eq!(results.results[0].percentage, 100.0);
    // The winning option names a viewer command, so the pet acts it out.
    assert!(effects.contains(&Effect::EmotionShown {
        emotion: Emotion::Love,
        duration: Duration::from_millis(4000)
    }));
}

#[tokio::test(start_paused = true)]
async fn test_polls_switched_off() {
    let mut config = quiet();
    config.viewer_interaction.polls.enabled = false;
    let (pet, _rx) = pet_with(config, options());
    let options = vec!["a".to_string(), "b".to_string()];
    assert!(pet.create_poll("Nap?", &options, None).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_first_time_chatter_greeting() {
    let mut config = quiet();
    config.greetings.enabled = true;
    config.greetings.particles = false;
    config
        .greetings
        .custom_greetings
        .insert("ann".to_string(), "The legend {user} arrives!".to_string());
    let (pet, mut rx) = pet_with(config, options());

    assert!(pet.handle_chat_message(&Chatter::new("Ann"), "hello"));
    assert!(!pet.handle_chat_message(&Chatter::new("ann"), "hello again"));
    let texts = next_messages(&mut rx, 1).await;
    assert_eq!(texts, vec!["The legend Ann arrives!"]);
    assert_eq!(pet.current_image().as_deref(), Some("Images/wave.png"));

    assert!(pet.handle_chat_message(&Chatter::new("Bo"), "hi"));
    let stats = pet.greeting_stats();
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.unique_chatters, 2);

    pet.reset_greeting_session();
    assert_eq!(pet.greeting_stats().sent, 0);
    assert!(pet.handle_chat_message(&Chatter::new("Ann"), "back"));
}

#[tokio::test(start_paused = true)]
async fn test_emote_rain_from_chat() {
    let mut config = quiet();
    config.twitch.emote_rain.enabled = true;
    config.twitch.emote_rain.user_level = RainAudience::Subscriber;
    let (pet, mut rx) = pet_with(config, options());

    let viewer = Chatter::new("Ann").with_emotes(["25"]);
    assert!(!pet.handle_chat_message(&viewer, "Kappa"));

    let subscriber = Chatter::with_role("Bo", Role::Subscriber).with_emotes(["25", "1902", "88"]);
    assert!(pet.handle_chat_message(&subscriber, "Kappa Keepo PogChamp"));
    settle().await;
    let dropped = |effects: &[Effect]| {
        effects
            .iter()
            .filter(|effect| matches!(effect, Effect::EmoteDropped { .. }))
            .count()
    };
    assert_eq!(dropped(&drain(&mut rx)), 1);
    sleep(Duration::from_millis(250)).await;
    assert_eq!(dropped(&drain(&mut rx)), 2);

    // Still within the global cooldown.
    let other = Chatter::with_role("Cy", Role::Moderator).with_emotes(["25"]);
    assert!(!pet.handle_chat_message(&other, "Kappa"));
}

#[tokio::test(start_paused = true)]
async fn test_bus_paths_and_showcase_messages() {
    let (pet, mut rx) = pet_with(quiet(), options());

    pet.handle_bus_message("null", r#"{"type":"testPath"}"#)
        .unwrap();
    assert!(pet.is_on_path());
    sleep(Duration::from_millis(5001)).await;
    assert!(!pet.is_on_path());

    pet.handle_bus_message(
        "null",
        r#"{"type":"followPath","points":[{"x":10,"y":10},{"x":90,"y":90}],"duration":8000}"#,
    )
    .unwrap();
    pet.handle_bus_message("null", r#"{"type":"stopPath"}"#)
        .unwrap();
    assert!(!pet.is_on_path());
    pet.handle_bus_message("null", r#"{"type":"resetPosition"}"#)
        .unwrap();

    let effects = drain(&mut rx);
    match &effects[0] {
        Effect::PathStarted { points, duration } => {
            assert_eq!(points.len(), 5);
            assert_eq!(points[4], Position { x: 50.0, y: 50.0 });
            assert_eq!(*duration, Duration::from_millis(5000));
        }
        other => panic!("unexpected effect: {other:?}"),
    }
    assert_eq!(
        effects[1..].to_vec(),
        vec![
            Effect::PathStarted {
                points: vec![Position { x: 10.0, y: 10.0 }, Position { x: 90.0, y: 90.0 }],
                duration: Duration::from_millis(8000)
            },
            Effect::PathStopped,
            Effect::PositionReset,
        ]
    );

    pet.handle_bus_message("null", r#"{"type":"testEvolutionEffect"}"#)
        .unwrap();
    pet.handle_bus_message("null", r#"{"type":"testEmoteRain","emotes":["25"]}"#)
        .unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![
            Effect::Evolved {
                stage: "Test Stage".to_string()
            },
            Effect::EmoteDropped {
                url: "https://static-cdn.jtvnw.net/emoticons/v2/25/default/dark/3.0".to_string(),
                size: 48,
                fall: Duration::from_millis(2000),
                rotate: true,
                bounce: true,
            },
        ]
    );
    let config = pet.config();
    assert_eq!(config.growth.evolution_stage, 0);
}
