pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::receivers::Destination;
use crate::template::Payload;

/// Failure to build a messaging client. Raised once per dispatch, before any
/// destination is attempted.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid bot API token")]
    InvalidToken,

    #[error("invalid Telegram API origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure to deliver to one destination
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),
}

/// A client able to deliver a rendered payload to a single chat
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, destination: &Destination, payload: &Payload) -> Result<(), DeliveryError>;
}

/// Builds a [`Messenger`] bound to an API origin and bot token
pub trait Connector: Send + Sync {
    type Messenger: Messenger;

    fn connect(&self, api_origin: &str, api_token: &str) -> Result<Self::Messenger, ClientError>;
}
