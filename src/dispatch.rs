use tracing::{debug, error, info, warn};

use crate::config::{NotifierOptions, ProjectOptions};
use crate::event::{Event, Group};
use crate::platform::{ClientError, Connector, Messenger};
use crate::receivers::{self, Destination};
use crate::template;

/// What happened during one dispatch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: Vec<Destination>,
    pub failed: Vec<(Destination, String)>,
    /// Set when the template could not be rendered; nothing was sent
    pub render_error: Option<String>,
}

/// Delivers Sentry events to the Telegram chats configured for a project
pub struct Notifier<C> {
    connector: C,
}

impl<C: Connector> Notifier<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Render the project's template once and send it to every receiver in
    /// order. Per-receiver failures and template errors are logged and
    /// reported, never returned; only building the client can fail the call.
    pub async fn notify(
        &self,
        group: &Group,
        event: &Event,
        options: &dyn ProjectOptions,
    ) -> Result<DispatchReport, ClientError> {
        let project = group.project.slug.as_str();
        let opts = NotifierOptions::read(options, project);

        let messenger = self.connector.connect(&opts.api_origin, &opts.api_token)?;
        let destinations = receivers::resolve_option(opts.receivers.as_deref());

        let mut report = DispatchReport::default();

        let payload = match template::render(&opts.message_template, group, event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    "Failed to render message template for project {}: {}",
                    project, e
                );
                report.render_error = Some(e.to_string());
                return Ok(report);
            }
        };

        if destinations.is_empty() {
            warn!("No receivers configured for project {}", project);
            return Ok(report);
        }

        debug!(
            "Sending '{}' to {} receiver(s) of project {}",
            event.title,
            destinations.len(),
            project
        );

        for destination in destinations {
            report.attempted += 1;
            match messenger.send(&destination, &payload).await {
                Ok(()) => report.delivered.push(destination),
                Err(e) => {
                    error!(
                        "Failed to send notification to {} for project {}: {}",
                        destination, project, e
                    );
                    report.failed.push((destination, e.to_string()));
                }
            }
        }

        info!(
            "Notified {}/{} receiver(s) of project {}",
            report.delivered.len(),
            report.attempted,
            project
        );
        Ok(report)
    }
}
