//! smsrelay - forwards received SMS messages to email.
//!
//! Inbound events arrive as JSON lines on stdin. Configuration, the service
//! flag and the message history live in a `SQLite` database.

mod notifier;
mod settings;
mod stdin;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use smsrelay_core::{
    ChannelSource, DeliveryClient, ForwardingConfig, Pipeline, SqliteStore, ThemeMode,
};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::notifier::AppNotifier;
use crate::settings::{AppSettings, default_settings_path, load_settings, save_settings};

/// smsrelay - forwards received SMS messages to email.
#[derive(Parser, Debug)]
#[command(name = "smsrelay", version, about, long_about = None)]
struct Cli {
    /// Settings file. Defaults to the user config directory.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Database file. Overrides the settings file.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Forward events read from stdin until EOF or Ctrl-C.
    Run,
    /// Save the forwarding configuration.
    Config {
        /// Address that receives forwarded messages.
        #[arg(long)]
        target: String,
        /// Verified sender address.
        #[arg(long)]
        sender: String,
        /// Brevo API key.
        #[arg(long = "api-key")]
        api_key: String,
    },
    /// Turn forwarding on.
    Enable,
    /// Turn forwarding off.
    Disable,
    /// Flip the forwarding flag.
    Toggle,
    /// Send a test email.
    Test,
    /// Show the message history, newest first.
    Messages,
    /// Show or change the theme preference.
    Theme {
        /// New theme; `next` cycles through the modes.
        mode: Option<ThemeChoice>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeChoice {
    System,
    Light,
    Dark,
    Next,
}

impl ThemeChoice {
    const fn apply(self, current: ThemeMode) -> ThemeMode {
        match self {
            Self::System => ThemeMode::System,
            Self::Light => ThemeMode::Light,
            Self::Dark => ThemeMode::Dark,
            Self::Next => current.next(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let settings = load_settings(&settings_path).await?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if !settings_path.exists() {
        save_settings(&settings_path, &settings).await?;
    }

    let database_path = cli.database.clone().unwrap_or_else(|| settings.database_path());
    let (pipeline, store) = start_pipeline(&settings, &database_path).await?;

    match cli.command {
        Commands::Run => run(&pipeline).await?,
        Commands::Config {
            target,
            sender,
            api_key,
        } => {
            pipeline
                .save_config(ForwardingConfig::new(target, sender, api_key))
                .await?;
        }
        Commands::Enable => pipeline.set_service_enabled(true).await?,
        Commands::Disable => pipeline.set_service_enabled(false).await?,
        Commands::Toggle => {
            let enabled = pipeline.toggle_service().await?;
            println!("{}", if enabled { "enabled" } else { "disabled" });
        }
        Commands::Test => pipeline.send_test().await?,
        Commands::Messages => print_messages(&pipeline).await,
        Commands::Theme { mode } => {
            let current = pipeline.theme().await;
            let mode = mode.map_or(current, |choice| choice.apply(current));
            if mode != current {
                pipeline.set_theme(mode).await?;
            }
            println!("{}", mode.label());
        }
    }

    pipeline.wait_idle().await;
    store.close().await;
    Ok(())
}

async fn start_pipeline(
    settings: &AppSettings,
    database_path: &Path,
) -> anyhow::Result<(Pipeline, Arc<SqliteStore>)> {
    if let Some(dir) = database_path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let database = database_path
        .to_str()
        .context("database path is not valid UTF-8")?;
    let store = Arc::new(
        SqliteStore::new(database)
            .await
            .with_context(|| format!("opening {database}"))?,
    );

    let client = DeliveryClient::with_timeout(Duration::from_secs(settings.request_timeout_secs))?
        .with_endpoint(settings.endpoint.clone());

    let pipeline = Pipeline::builder(store.clone())
        .client(client)
        .notifier(Arc::new(AppNotifier::new(settings.desktop_notifications)))
        .start()
        .await;
    Ok((pipeline, store))
}

async fn run(pipeline: &Pipeline) -> anyhow::Result<()> {
    if !pipeline.is_enabled() {
        info!("Forwarding is disabled; events will be ignored until it is enabled");
    }

    let source = ChannelSource::new();
    pipeline.attach(&source).await;

    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = stdin::feed_lines(input, &source) => {
            let emitted = result.context("reading events from stdin")?;
            info!("Input closed after {emitted} event(s)");
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    pipeline.close().await;
    pipeline.wait_idle().await;
    Ok(())
}

async fn print_messages(pipeline: &Pipeline) {
    let messages = pipeline.messages().await;
    if messages.is_empty() {
        println!("No messages yet");
        return;
    }

    for message in messages {
        println!(
            "{}  {}  [{}]  {}: {}",
            message.id,
            message.received_at,
            message.delivery_state.label(),
            message.sender,
            message.body
        );
    }
}
