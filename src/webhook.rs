//! Stateless webhook deployment
//!
//! One invocation per update envelope: state is recovered from the
//! file-backed store, the router runs, and replies go out as raw Bot API
//! calls. Every input, including internal errors, is answered with a
//! `200` acknowledgment so the transport never retries the update.

use crate::access::AllowList;
use crate::bot::update::{Action, Keyboard, Update};
use crate::bot::{Router, SessionStore};
use crate::config::{get_transport_timeout_secs, Settings, DAILY_TRANSLATION_LIMIT};
use crate::rate_limit::UsageTracker;
use crate::storage::Storage;
use crate::translate::{TranslationGateway, YandexTranslator};
use crate::utils::truncate_str;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Response handed back to the hosting environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionResponse {
    pub status_code: u16,
    pub body: Value,
}

fn ack(status: &str) -> FunctionResponse {
    FunctionResponse {
        status_code: 200,
        body: json!({ "status": status }),
    }
}

/// Unwrap the hosting envelope and decode the Telegram update.
///
/// Accepts a bare update object or an event with a `body` field holding
/// either the update object or its JSON string.
#[must_use]
pub fn parse_event(raw: &str) -> Option<Update> {
    let event: Value = serde_json::from_str(raw).ok()?;

    let update = match event.get("body") {
        Some(Value::String(body)) => serde_json::from_str::<Value>(body).ok()?,
        Some(body) => body.clone(),
        None => event,
    };

    Update::from_telegram_json(&update)
}

/// Raw Bot API client for outbound delivery.
pub struct BotApi {
    http_client: HttpClient,
    token: String,
}

impl BotApi {
    /// Create a client with the standard bounded timeout.
    #[must_use]
    pub fn new(token: String) -> Self {
        let timeout = Duration::from_secs(get_transport_timeout_secs());
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self { http_client, token }
    }

    /// Perform one outbound action.
    ///
    /// # Errors
    ///
    /// Returns an error when the Bot API call fails; callers log and move
    /// on without retrying.
    pub async fn execute(&self, action: &Action) -> Result<(), TransportError> {
        match action {
            Action::SendMessage {
                chat_id,
                text,
                keyboard,
            } => {
                let mut payload = json!({ "chat_id": chat_id, "text": text });
                if let Some(kb) = keyboard {
                    payload["reply_markup"] = keyboard_json(kb);
                }
                self.call("sendMessage", &payload).await
            }
            Action::EditMessage {
                chat_id,
                message_id,
                text,
            } => {
                let payload = json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                });
                self.call("editMessageText", &payload).await
            }
            Action::AnswerCallback { id } => {
                self.call("answerCallbackQuery", &json!({ "callback_query_id": id }))
                    .await
            }
            Action::SendTyping { chat_id } => {
                self.call(
                    "sendChatAction",
                    &json!({ "chat_id": chat_id, "action": "typing" }),
                )
                .await
            }
        }
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<(), TransportError> {
        let url = format!("https://api.telegram.org/bot{}/{method}", self.token);
        let response = self
            .http_client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api(format!(
                "{method}: {status} - {}",
                truncate_str(body, 200)
            )));
        }
        Ok(())
    }
}

fn keyboard_json(keyboard: &Keyboard) -> Value {
    let rows: Vec<Value> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.data }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// The webhook application: router over file-backed state plus the raw
/// outbound transport.
pub struct WebhookApp {
    router: Router,
    api: BotApi,
}

impl WebhookApp {
    /// Wire all components against the configured data directory.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let storage = Storage::on_disk(&settings.data_dir);
        let access = AllowList::new(storage.clone(), settings.admin_ids());
        let quota = UsageTracker::new(storage.clone(), DAILY_TRANSLATION_LIMIT);
        let backend = Arc::new(YandexTranslator::new(
            settings.yandex_api_key.clone(),
            settings.yandex_folder_id.clone(),
        ));
        let gateway = TranslationGateway::new(backend, quota, settings.charge_failed_attempts);
        let sessions = SessionStore::new(storage);
        Self {
            router: Router::new(access, gateway, sessions),
            api: BotApi::new(settings.telegram_token.clone()),
        }
    }

    /// Handle one raw event envelope. Never fails: malformed input and
    /// internal errors alike are logged and acknowledged.
    pub async fn handle_event(&self, raw: &str) -> FunctionResponse {
        let Some(update) = parse_event(raw) else {
            info!("Event carried no handleable update");
            return ack("ok");
        };

        let actions = match self.router.handle(update).await {
            Ok(actions) => actions,
            Err(e) => {
                error!("Handler error: {e:#}");
                return ack("error");
            }
        };

        for action in &actions {
            if let Err(e) = self.api.execute(action).await {
                error!("Failed to deliver response: {e}");
            }
        }
        ack("ok")
    }
}
