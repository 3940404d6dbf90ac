//! Sentry notification plugin core for Telegram.
//!
//! A host hands over a [`event::Group`]/[`event::Event`] pair together with a
//! project-scoped [`config::ProjectOptions`] store; [`dispatch::Notifier`]
//! renders the project's message template once and sends it to each
//! configured chat through the Bot API.

pub mod config;
pub mod dispatch;
pub mod event;
pub mod platform;
pub mod receivers;
pub mod template;

pub use config::{is_configured, ProjectOptions};
pub use dispatch::{DispatchReport, Notifier};
pub use event::{Event, Group, Project};
pub use platform::telegram::TelegramConnector;
