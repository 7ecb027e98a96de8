//! cmdkit - runs a directory of command definitions as a Discord bot

mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use cmdkit_core::{Client, CommandKit, CommandKitConfig, ReconcileReport};
use cmdkit_discord::serenity::{self, all::GatewayIntents, http::Http};
use cmdkit_discord::{CommandKitHandler, DiscordError, SerenityCommandService};
use miette::Result;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cmdkit.toml")]
    config: PathBuf,

    /// Override the commands directory from the configuration file
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    init_logging(args.debug);
    info!("Starting cmdkit...");

    let mut config = CommandKitConfig::load_or_default(&args.config).await?;
    if let Some(commands) = args.commands {
        config.commands_path = Some(commands);
    }
    info!(
        "Commands directory: {}",
        config
            .commands_path
            .as_deref()
            .map_or("<none>".to_string(), |p| p.display().to_string())
    );

    let token = std::env::var("DISCORD_TOKEN").map_err(|_| DiscordError::MissingToken {
        variable: "DISCORD_TOKEN".to_string(),
    })?;

    let http = Arc::new(Http::new(&token));
    let client = Arc::new(Client::new(Arc::new(SerenityCommandService::new(
        http.clone(),
    ))));

    let kit = Arc::new(
        handlers::register(CommandKit::builder())
            .client(client.clone())
            .config(config)
            .build()?,
    );
    kit.init().await?;

    #[cfg(unix)]
    spawn_reload_on_hangup(kit.clone());

    let mut discord = serenity::Client::builder(&token, GatewayIntents::GUILDS)
        .event_handler(CommandKitHandler::new(kit.clone(), http))
        .await
        .map_err(|e| DiscordError::from_start(e, &token))?;

    tokio::select! {
        result = discord.start() => {
            result.map_err(|e| DiscordError::from_start(e, &token))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down cmdkit...");
        }
    }

    client.mark_disconnected();
    Ok(())
}

/// Reload commands and validations from disk whenever the process gets SIGHUP
#[cfg(unix)]
fn spawn_reload_on_hangup(kit: Arc<CommandKit>) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Cannot listen for SIGHUP: {}", e);
                return;
            }
        };

        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading");
            log_reload(kit.reload_commands().await);
            if kit.validations_path().is_some() {
                if let Err(e) = kit.reload_validations().await {
                    error!("Validation reload failed: {:?}", e);
                }
            }
        }
    });
}

/// Log the outcome of a command reload, one line per failed registration.
/// Returns whether every change was applied.
fn log_reload(result: cmdkit_core::Result<ReconcileReport>) -> bool {
    match result {
        Ok(report) if report.is_success() => {
            info!("Reload applied {} changes", report.changes());
            true
        }
        Ok(report) => {
            for failure in &report.failures {
                warn!("Command registration failed: {}", failure);
            }
            warn!(
                "Reload applied {} changes with {} failures",
                report.changes(),
                report.failures.len()
            );
            false
        }
        Err(e) => {
            error!("Command reload failed: {:?}", e);
            false
        }
    }
}

fn init_logging(debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all("logs").ok();

    // Create file appender
    let file_appender = tracing_appender::rolling::daily("logs", "cmdkit.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the entire program
    Box::leak(Box::new(_guard));

    let default_filter = if debug {
        "cmdkit=debug,cmdkit_core=debug,cmdkit_discord=debug,serenity=info"
    } else {
        "cmdkit=info,cmdkit_core=info,cmdkit_discord=info,serenity=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            // Console output
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true),
        )
        .with(
            // File output
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();
}
