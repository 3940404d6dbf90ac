use std::time::Duration;

use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

use super::{ClientError, Connector, DeliveryError, Messenger};
use crate::receivers::Destination;
use crate::template::{ParseFormat, Payload};

pub const DEFAULT_API_ORIGIN: &str = "https://api.telegram.org";

/// Builds Telegram bots that share one HTTP client (and its connection pool)
#[derive(Clone)]
pub struct TelegramConnector {
    client: reqwest::Client,
}

impl TelegramConnector {
    /// `timeout` bounds every Bot API request; sends are otherwise unbounded.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for TelegramConnector {
    type Messenger = TelegramMessenger;

    fn connect(&self, api_origin: &str, api_token: &str) -> Result<TelegramMessenger, ClientError> {
        validate_token(api_token)?;
        let api_url = parse_origin(api_origin)?;

        debug!("Connecting Telegram bot via {}", api_url);
        let bot = Bot::with_client(api_token, self.client.clone()).set_api_url(api_url);
        Ok(TelegramMessenger { bot })
    }
}

/// Reject tokens that cannot be a bot token (`<bot id>:<secret>`).
pub fn validate_token(token: &str) -> Result<(), ClientError> {
    if token.chars().any(char::is_whitespace) {
        return Err(ClientError::InvalidToken);
    }
    match token.split_once(':') {
        Some((bot_id, _)) if bot_id.len() >= 3 && bot_id.chars().all(|c| c.is_ascii_digit()) => {
            Ok(())
        }
        _ => Err(ClientError::InvalidToken),
    }
}

pub fn parse_origin(origin: &str) -> Result<reqwest::Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidOrigin {
        origin: origin.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(origin.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Sends payloads through the Bot API `sendMessage` method
pub struct TelegramMessenger {
    bot: Bot,
}

#[allow(deprecated)]
fn parse_mode(format: ParseFormat) -> ParseMode {
    match format {
        ParseFormat::Markdown => ParseMode::Markdown,
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, destination: &Destination, payload: &Payload) -> Result<(), DeliveryError> {
        self.bot
            .send_message(destination.recipient(), payload.text())
            .parse_mode(parse_mode(payload.format()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{StatusCode, Uri},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::sync::oneshot;

    #[derive(Clone, Default)]
    struct MockBotApi {
        requests: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn bot_api_handler(
        State(state): State<MockBotApi>,
        uri: Uri,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        state
            .requests
            .lock()
            .unwrap()
            .push((uri.path().to_string(), body.clone()));

        if body["chat_id"] == json!("@blocked") {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "ok": false,
                    "error_code": 403,
                    "description": "Forbidden: bot was blocked by the user"
                })),
            );
        }

        (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "result": {
                    "message_id": 1,
                    "date": 0,
                    "chat": { "id": 42, "type": "private", "first_name": "Ops" },
                    "text": body["text"]
                }
            })),
        )
    }

    async fn spawn_mock(state: MockBotApi) -> (String, oneshot::Sender<()>) {
        let app = Router::new()
            .route("/{*path}", post(bot_api_handler))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });
        (format!("http://{}", addr), shutdown_tx)
    }

    #[test]
    fn test_validate_token() {
        assert!(validate_token("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11").is_ok());
        assert!(validate_token("123:").is_ok());
        assert!(validate_token("").is_err());
        assert!(validate_token("no-colon").is_err());
        assert!(validate_token("12:abc").is_err());
        assert!(validate_token("abc123:def").is_err());
        assert!(validate_token("123456:ABC DEF").is_err());
    }

    #[test]
    fn test_parse_origin() {
        assert!(parse_origin(DEFAULT_API_ORIGIN).is_ok());
        assert!(parse_origin("http://localhost:8081").is_ok());
        assert!(parse_origin("api.telegram.org").is_err());
        assert!(parse_origin("ftp://api.telegram.org").is_err());
        assert!(parse_origin("mailto:bot@example.com").is_err());
    }

    #[test]
    fn test_connect_rejects_bad_token() {
        let connector = TelegramConnector::with_client(reqwest::Client::new());
        let err = connector
            .connect(DEFAULT_API_ORIGIN, "not a token")
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::InvalidToken));
    }

    #[tokio::test]
    async fn test_send_uses_custom_origin_and_markdown() {
        let state = MockBotApi::default();
        let (origin, shutdown) = spawn_mock(state.clone()).await;

        let connector = TelegramConnector::new(Duration::from_secs(5)).unwrap();
        let messenger = connector.connect(&origin, "123456:TEST").unwrap();
        let payload = Payload::new("*Boom*");

        messenger
            .send(&Destination::new("42"), &payload)
            .await
            .unwrap();
        messenger
            .send(&Destination::new("@alerts"), &payload)
            .await
            .unwrap();

        {
            let requests = state.requests.lock().unwrap();
            assert_eq!(requests.len(), 2);
            // teloxide spells the method `SendMessage`; the Bot API ignores case
            assert!(requests[0].0.eq_ignore_ascii_case("/bot123456:TEST/sendMessage"));
            assert_eq!(requests[0].1["chat_id"], json!(42));
            assert_eq!(requests[0].1["text"], json!("*Boom*"));
            assert_eq!(requests[0].1["parse_mode"], json!("Markdown"));
            assert_eq!(requests[1].1["chat_id"], json!("@alerts"));
        }

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_send_reports_api_error() {
        let state = MockBotApi::default();
        let (origin, shutdown) = spawn_mock(state.clone()).await;

        let connector = TelegramConnector::new(Duration::from_secs(5)).unwrap();
        let messenger = connector.connect(&origin, "123456:TEST").unwrap();

        let result = messenger
            .send(&Destination::new("@blocked"), &Payload::new("hi"))
            .await;
        assert!(matches!(result, Err(DeliveryError::Telegram(_))));

        let _ = shutdown.send(());
    }
}
