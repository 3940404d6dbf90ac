use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::platform::telegram::{parse_origin, validate_token, DEFAULT_API_ORIGIN};
use crate::template::{Template, DEFAULT_MESSAGE_TEMPLATE};

pub const PLUGIN_SLUG: &str = "sentry_telegram_notification";
pub const PLUGIN_TITLE: &str = "Telegram Notifications";
pub const PLUGIN_DESCRIPTION: &str =
    "Plugin for Sentry which allows sending notification via Telegram messenger.";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const OPTION_API_ORIGIN: &str = "api_origin";
pub const OPTION_API_TOKEN: &str = "api_token";
pub const OPTION_RECEIVERS: &str = "receivers";
pub const OPTION_MESSAGE_TEMPLATE: &str = "message_template";

/// Project-scoped key/value option store owned by the host
pub trait ProjectOptions {
    fn get_option(&self, key: &str, project: &str) -> Option<String>;
}

/// Option values that are set and not blank
fn non_blank(options: &dyn ProjectOptions, key: &str, project: &str) -> Option<String> {
    options
        .get_option(key, project)
        .filter(|value| !value.trim().is_empty())
}

/// Whether a project has the two options notifications cannot work without.
pub fn is_configured(options: &dyn ProjectOptions, project: &str) -> bool {
    non_blank(options, OPTION_API_TOKEN, project).is_some()
        && non_blank(options, OPTION_RECEIVERS, project).is_some()
}

/// Snapshot of the plugin options for one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierOptions {
    pub api_origin: String,
    pub api_token: String,
    pub receivers: Option<String>,
    pub message_template: String,
}

impl NotifierOptions {
    /// Read every option fresh from the store, applying defaults for
    /// `api_origin` and `message_template`.
    pub fn read(options: &dyn ProjectOptions, project: &str) -> Self {
        Self {
            api_origin: non_blank(options, OPTION_API_ORIGIN, project)
                .unwrap_or_else(|| DEFAULT_API_ORIGIN.to_string()),
            api_token: options
                .get_option(OPTION_API_TOKEN, project)
                .unwrap_or_default(),
            receivers: options.get_option(OPTION_RECEIVERS, project),
            message_template: non_blank(options, OPTION_MESSAGE_TEMPLATE, project)
                .unwrap_or_else(|| DEFAULT_MESSAGE_TEMPLATE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
}

/// One entry of the options form the host renders
#[derive(Debug, Clone, Serialize)]
pub struct ConfigField {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

pub fn config_schema() -> Vec<ConfigField> {
    vec![
        ConfigField {
            name: OPTION_API_ORIGIN,
            label: "Telegram API origin",
            kind: FieldKind::Text,
            placeholder: Some(DEFAULT_API_ORIGIN),
            help: None,
            required: false,
            default: Some(DEFAULT_API_ORIGIN),
        },
        ConfigField {
            name: OPTION_API_TOKEN,
            label: "BotAPI token",
            kind: FieldKind::Text,
            placeholder: Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11"),
            help: Some("Read more: https://core.telegram.org/bots/api#authorizing-your-bot"),
            required: true,
            default: None,
        },
        ConfigField {
            name: OPTION_RECEIVERS,
            label: "Receivers",
            kind: FieldKind::Textarea,
            placeholder: None,
            help: Some(
                "Enter receivers IDs (one per line). Personal messages, group chats and channels \
                 are also available. You can use username for groups and channels",
            ),
            required: true,
            default: None,
        },
        ConfigField {
            name: OPTION_MESSAGE_TEMPLATE,
            label: "Message Template",
            kind: FieldKind::Textarea,
            placeholder: None,
            help: Some(
                "Available names are: {project_name}, {url}, {title}, {message}, \
                 {tag[%your_tag%]}. Undefined tags will be shown as [NA]",
            ),
            required: true,
            default: Some(DEFAULT_MESSAGE_TEMPLATE),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Form-level checks for a project's options. An empty result means the
/// options are usable.
pub fn validate(options: &dyn ProjectOptions, project: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match non_blank(options, OPTION_API_TOKEN, project) {
        None => errors.push(FieldError::new(OPTION_API_TOKEN, "This field is required.")),
        Some(token) => {
            if let Err(e) = validate_token(&token) {
                errors.push(FieldError::new(OPTION_API_TOKEN, e.to_string()));
            }
        }
    }

    if crate::receivers::resolve_option(options.get_option(OPTION_RECEIVERS, project).as_deref())
        .is_empty()
    {
        errors.push(FieldError::new(OPTION_RECEIVERS, "This field is required."));
    }

    if let Some(origin) = non_blank(options, OPTION_API_ORIGIN, project) {
        if let Err(e) = parse_origin(&origin) {
            errors.push(FieldError::new(OPTION_API_ORIGIN, e.to_string()));
        }
    }

    match options.get_option(OPTION_MESSAGE_TEMPLATE, project) {
        Some(template) if template.trim().is_empty() => errors.push(FieldError::new(
            OPTION_MESSAGE_TEMPLATE,
            "This field is required.",
        )),
        Some(template) => {
            if let Err(e) = Template::parse(&template) {
                errors.push(FieldError::new(OPTION_MESSAGE_TEMPLATE, e.to_string()));
            }
        }
        None => {}
    }

    errors
}

/// Options for a single project as written in the config file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProjectConfig {
    pub api_origin: Option<String>,
    pub api_token: Option<String>,
    pub receivers: Option<String>,
    pub message_template: Option<String>,
}

/// File-backed option store:
///
/// ```toml
/// request_timeout_secs = 30
///
/// [projects.backend]
/// api_token = "123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11"
/// receivers = """
/// -1001234567890
/// @alerts
/// """
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct FileOptions {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub projects: HashMap<String, ProjectConfig>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl FileOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ProjectOptions for FileOptions {
    fn get_option(&self, key: &str, project: &str) -> Option<String> {
        let project = self.projects.get(project)?;
        match key {
            OPTION_API_ORIGIN => project.api_origin.clone(),
            OPTION_API_TOKEN => project.api_token.clone(),
            OPTION_RECEIVERS => project.receivers.clone(),
            OPTION_MESSAGE_TEMPLATE => project.message_template.clone(),
            _ => None,
        }
    }
}

/// In-memory option store keyed by `(project, key)`
#[derive(Debug, Clone, Default)]
pub struct MemoryOptions {
    values: HashMap<(String, String), String>,
}

impl MemoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, project: &str, key: &str, value: impl Into<String>) -> &mut Self {
        self.values
            .insert((project.to_string(), key.to_string()), value.into());
        self
    }
}

impl ProjectOptions for MemoryOptions {
    fn get_option(&self, key: &str, project: &str) -> Option<String> {
        self.values
            .get(&(project.to_string(), key.to_string()))
            .cloned()
    }
}
