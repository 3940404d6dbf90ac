use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentry_telegram::config::{self, FileOptions};
use sentry_telegram::{is_configured, Event, Group, Notifier, TelegramConnector};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

const USAGE: &str = "Usage:
  sentry-telegram schema
  sentry-telegram check [config.toml] <project>
  sentry-telegram notify [config.toml] <notification.json>";

/// A notification as handed over by the host
#[derive(Debug, Deserialize)]
struct Notification {
    group: Group,
    event: Event,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sentry_telegram=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_command(&args) {
        Some(Command::Schema) => print_schema(),
        Some(Command::Check { config, project }) => check(&config, &project),
        Some(Command::Notify {
            config,
            notification,
        }) => notify(&config, &notification).await,
        None => bail!("{}", USAGE),
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Schema,
    Check { config: PathBuf, project: String },
    Notify { config: PathBuf, notification: PathBuf },
}

fn parse_command(args: &[String]) -> Option<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match args.as_slice() {
        ["schema"] => Command::Schema,
        ["check", project] => Command::Check {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            project: project.to_string(),
        },
        ["check", config, project] => Command::Check {
            config: PathBuf::from(config),
            project: project.to_string(),
        },
        ["notify", notification] => Command::Notify {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            notification: PathBuf::from(notification),
        },
        ["notify", config, notification] => Command::Notify {
            config: PathBuf::from(config),
            notification: PathBuf::from(notification),
        },
        _ => return None,
    };
    Some(command)
}

fn print_schema() -> Result<()> {
    let schema = serde_json::json!({
        "slug": config::PLUGIN_SLUG,
        "title": config::PLUGIN_TITLE,
        "description": config::PLUGIN_DESCRIPTION,
        "version": config::PLUGIN_VERSION,
        "fields": config::config_schema(),
    });
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn load_options(path: &Path) -> Result<FileOptions> {
    info!("Loading configuration from: {}", path.display());
    FileOptions::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn check(config_path: &Path, project: &str) -> Result<()> {
    let options = load_options(config_path)?;

    let errors = config::validate(&options, project);
    for e in &errors {
        warn!("{}: {}", e.field, e.message);
    }

    if is_configured(&options, project) && errors.is_empty() {
        info!("Project {} is configured", project);
        Ok(())
    } else {
        bail!("Project {} is not configured", project)
    }
}

async fn notify(config_path: &Path, notification_path: &Path) -> Result<()> {
    let options = load_options(config_path)?;

    let content = std::fs::read_to_string(notification_path).with_context(|| {
        format!(
            "Failed to read notification: {}",
            notification_path.display()
        )
    })?;
    let notification: Notification =
        serde_json::from_str(&content).context("Failed to parse notification JSON")?;

    let project = notification.group.project.slug.as_str();
    if !is_configured(&options, project) {
        info!("Project {} is not configured, skipping notification", project);
        return Ok(());
    }

    let connector = TelegramConnector::new(options.request_timeout())
        .context("Failed to build Telegram HTTP client")?;
    let notifier = Notifier::new(connector);

    let report = notifier
        .notify(&notification.group, &notification.event, &options)
        .await
        .context("Failed to create Telegram bot")?;

    if let Some(e) = &report.render_error {
        error!("Notification dropped: {}", e);
    }
    info!(
        "Delivered to {} of {} receiver(s)",
        report.delivered.len(),
        report.attempted
    );
    Ok(())
}
