//! Stream Pet CLI - drive a stream pet from the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use stream_pet_core::{
    AnyAsset, AssetDir, AssetLookup, Chatter, ConfigStore, Effect, FileStorage, Notification,
    Options, Role, StreamPet,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// How long to wait for the effect printer to drain after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Stream Pet - an overlay pet that reacts to chat and stream events.
///
/// The pet's configuration lives in a store directory. `run` starts the pet
/// and feeds it lines from stdin; the other subcommands manage the stored
/// configuration.
#[derive(Parser, Debug)]
#[command(name = "stream-pet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the persisted configuration.
    #[arg(
        long = "store-dir",
        env = "STREAM_PET_STORE",
        default_value = ".stream-pet",
        global = true
    )]
    pub store_dir: PathBuf,

    /// Enable debug logging.
    ///
    /// Overrides RUST_LOG.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the pet and read stimuli from stdin.
    ///
    /// JSON objects carrying `subscription` are platform notifications,
    /// other JSON objects are control messages, `/click` clicks the pet and
    /// every other line is chat.
    Run {
        /// Username chat lines are attributed to.
        #[arg(long = "chatter", default_value = "viewer")]
        chatter: String,

        /// Role of the chatter (everyone, subscriber, vip, moderator,
        /// broadcaster).
        #[arg(long = "role", default_value = "everyone", value_parser = parse_role)]
        role: Role,

        /// Origin reported for control messages read from stdin.
        #[arg(long = "origin", default_value = "null")]
        origin: String,

        /// Origins the message bus accepts. Defaults to any.
        #[arg(long = "allow-origin", value_name = "ORIGIN")]
        allow_origins: Vec<String>,

        /// Directory images are resolved against. Without it every image
        /// counts as present.
        #[arg(long = "assets", value_name = "DIR")]
        assets: Option<PathBuf>,

        /// Seed for the random source.
        #[arg(long = "seed")]
        seed: Option<u64>,
    },

    /// Print the merged configuration.
    ShowConfig,

    /// Write the configuration as pretty JSON.
    Export {
        /// File to write. Defaults to stdout.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Replace the configuration with a JSON file.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Restore the default configuration.
    Reset,
}

fn parse_role(name: &str) -> std::result::Result<Role, String> {
    Role::from_name(name).ok_or_else(|| format!("unknown role '{name}'"))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = ConfigStore::new(Arc::new(FileStorage::new(&cli.store_dir)));

    match cli.command {
        Command::Run {
            chatter,
            role,
            origin,
            allow_origins,
            assets,
            seed,
        } => {
            let mut options = Options::new();
            if !allow_origins.is_empty() {
                options = options.allowed_origins(allow_origins);
            }
            if let Some(seed) = seed {
                options = options.seed(seed);
            }
            let lookup: Arc<dyn AssetLookup> = match assets {
                Some(dir) => Arc::new(AssetDir::new(dir)),
                None => Arc::new(AnyAsset),
            };
            run(store, options, lookup, Chatter::with_role(chatter, role), &origin).await
        }
        Command::ShowConfig => {
            let config = store.load();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Export { output } => {
            let json = store.export()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "configuration exported");
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let config = store
                .import(&json)
                .with_context(|| format!("failed to import {}", file.display()))?;
            tracing::info!(
                events = config.events.len(),
                commands = config.commands.len(),
                states = config.states.len(),
                "configuration imported"
            );
            Ok(())
        }
        Command::Reset => {
            store.reset()?;
            tracing::info!("configuration reset to defaults");
            Ok(())
        }
    }
}

async fn run(
    store: ConfigStore,
    options: Options,
    lookup: Arc<dyn AssetLookup>,
    chatter: Chatter,
    origin: &str,
) -> Result<()> {
    if let Err(e) = store.try_load() {
        tracing::warn!(
            error = %e,
            "stored configuration is unusable, running on defaults without saving"
        );
    }

    let (pet, mut effects) = StreamPet::with_assets(store, options, lookup);
    pet.start()?;

    let printer = tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            println!("{}", describe(&effect));
        }
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => handle_line(&pet, &chatter, origin, &line),
                    None => {
                        tracing::debug!("stdin closed");
                        break;
                    }
                }
            }
        }
    }

    pet.shutdown().await;
    drop(pet);
    if tokio::time::timeout(DRAIN_TIMEOUT, printer).await.is_err() {
        tracing::debug!("effect printer still running at exit");
    }
    Ok(())
}

fn handle_line(pet: &StreamPet, chatter: &Chatter, origin: &str, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    if line == "/click" {
        if !pet.handle_click() {
            tracing::debug!("click ignored");
        }
        return;
    }

    if !line.starts_with('{') {
        if !pet.handle_chat_message(chatter, line) {
            tracing::debug!(line, "chat line matched nothing");
        }
        return;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "input is not valid JSON");
            return;
        }
    };

    if value.get("subscription").is_some() {
        match serde_json::from_value::<Notification>(value) {
            Ok(notification) => {
                if !pet.handle_notification(notification) {
                    tracing::debug!("notification produced no reaction");
                }
            }
            Err(e) => tracing::warn!(error = %e, "malformed notification"),
        }
        return;
    }

    if let Err(e) = pet.handle_bus_message(origin, line) {
        tracing::warn!(error = %e, "control message rejected");
    }
}

/// One line per effect, for humans watching the terminal.
fn describe(effect: &Effect) -> String {
    match effect {
        Effect::MessageShown { text, style } => format!("💬 [{style}] {text}"),
        Effect::MessageHidden => "💬 (hidden)".to_string(),
        Effect::ImageShown {
            path, placeholder, ..
        } => {
            if *placeholder {
                "🖼  (placeholder)".to_string()
            } else {
                format!("🖼  {path}")
            }
        }
        Effect::SoundPlayed { path, volume } => format!("🔊 {path} at {:.0}%", volume * 100.0),
        Effect::ParticlesSpawned { kind, count } => {
            let glyphs = kind.glyphs().concat();
            format!("{glyphs} x{count} ({})", kind.name())
        }
        Effect::AnimationStarted { animation } => format!("🏃 {}", animation.name()),
        Effect::LookAround => "👀 looks around".to_string(),
        Effect::StateChanged { from, to } => format!("🔁 {from} -> {to}"),
        Effect::LevelUp { level } => format!("⬆️  level {level}"),
        Effect::Evolved { stage } => format!("🌱 evolved into {stage}"),
        Effect::Unlocked { feature, name } => format!("🔓 unlocked {feature:?} {name}"),
        Effect::WeatherStarted { kind } => format!("🌦  weather: {kind}"),
        Effect::WeatherStopped => "🌦  weather stopped".to_string(),
        Effect::ConfigReloaded => "♻️  configuration reloaded".to_string(),
        Effect::EmotionShown { emotion, .. } => format!("{} {}", emotion.emoji(), emotion.name()),
        Effect::BannerShown { text, .. } => format!("📣 {text}"),
        Effect::PhysicsEnabled { gravity, bounce } => {
            format!("🪀 physics on (gravity {gravity}, bounce {bounce})")
        }
        Effect::PhysicsDisabled => "🪀 physics off".to_string(),
        Effect::PhysicsUpdated { gravity, bounce } => {
            format!("🪀 gravity {gravity}, bounce {bounce}")
        }
        Effect::ForceApplied { x, y } => format!("💨 pushed ({x:.1}, {y:.1})"),
        Effect::PathStarted { points, duration } => format!(
            "🧭 path through {} points in {:.1}s",
            points.len(),
            duration.as_secs_f64()
        ),
        Effect::PathStopped => "🧭 path stopped".to_string(),
        Effect::PositionReset => "🧭 back to start".to_string(),
        Effect::EmoteDropped { url, .. } => format!("🌧  {url}"),
        Effect::PollStarted {
            id,
            question,
            options,
            ..
        } => format!("🗳  {id}: {question} [{}]", options.join(" / ")),
        Effect::PollEnded { id, results } => format!(
            "🗳  {id} closed: {} wins with {} votes",
            results.winner, results.total_votes
        ),
    }
}
