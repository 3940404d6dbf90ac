use std::collections::HashMap;

use serde::Deserialize;

/// A single error occurrence as handed over by Sentry
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Event {
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Tag pairs in the order Sentry reports them. Keys may repeat.
    #[serde(default)]
    pub tags: Vec<(String, String)>,
}

impl Event {
    /// Flatten the tag pairs into a map; a repeated key keeps its last value.
    pub fn tag_map(&self) -> HashMap<String, String> {
        self.tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub name: String,
    /// Scope key used when reading project options
    pub slug: String,
}

/// The issue an event was grouped into
#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub project: Project,
    /// Absolute URL of the issue in the Sentry UI
    pub url: String,
}
