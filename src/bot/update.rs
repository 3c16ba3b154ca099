//! Transport-independent update and action types
//!
//! Inbound updates are decoded once at the transport boundary into a tagged
//! variant; handlers answer with a list of outbound actions the transport
//! executes. Both the long-polling bot and the webhook function speak this
//! vocabulary.

use serde_json::Value;

/// Inbound update, decoded once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Message(IncomingMessage),
    Callback(CallbackAction),
}

/// A text message from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
}

/// An inline-button press carrying an opaque data string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAction {
    pub id: String,
    pub chat_id: i64,
    pub message_id: i32,
    pub user_id: i64,
    pub data: String,
}

/// One inline-keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    #[must_use]
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Rows of inline-keyboard buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

/// Outbound action for the transport to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendMessage {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    EditMessage {
        chat_id: i64,
        message_id: i32,
        text: String,
    },
    AnswerCallback {
        id: String,
    },
    SendTyping {
        chat_id: i64,
    },
}

impl Update {
    /// Decode a raw Telegram update object (webhook shape). Returns `None`
    /// for updates this bot does not handle (non-text messages, polls, …).
    #[must_use]
    pub fn from_telegram_json(update: &Value) -> Option<Self> {
        if let Some(message) = update.get("message") {
            let chat_id = message.get("chat")?.get("id")?.as_i64()?;
            let from = message.get("from")?;
            let user_id = from.get("id")?.as_i64()?;
            let user_name = from
                .get("first_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let text = message.get("text")?.as_str()?.to_string();
            return Some(Self::Message(IncomingMessage {
                chat_id,
                user_id,
                user_name,
                text,
            }));
        }

        if let Some(query) = update.get("callback_query") {
            let id = query.get("id")?.as_str()?.to_string();
            let user_id = query.get("from")?.get("id")?.as_i64()?;
            let message = query.get("message")?;
            let chat_id = message.get("chat")?.get("id")?.as_i64()?;
            let message_id = i32::try_from(message.get("message_id")?.as_i64()?).ok()?;
            let data = query.get("data")?.as_str()?.to_string();
            return Some(Self::Callback(CallbackAction {
                id,
                chat_id,
                message_id,
                user_id,
                data,
            }));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_message() {
        let raw = json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": {"id": 555},
                "from": {"id": 42, "first_name": "Боб"},
                "text": "привет"
            }
        });

        let update = Update::from_telegram_json(&raw).expect("decodes");
        assert_eq!(
            update,
            Update::Message(IncomingMessage {
                chat_id: 555,
                user_id: 42,
                user_name: "Боб".to_string(),
                text: "привет".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_callback() {
        let raw = json!({
            "update_id": 2,
            "callback_query": {
                "id": "cbq1",
                "from": {"id": 42, "first_name": "Боб"},
                "message": {"message_id": 10, "chat": {"id": 555}},
                "data": "lang_es"
            }
        });

        let update = Update::from_telegram_json(&raw).expect("decodes");
        assert_eq!(
            update,
            Update::Callback(CallbackAction {
                id: "cbq1".to_string(),
                chat_id: 555,
                message_id: 10,
                user_id: 42,
                data: "lang_es".to_string(),
            })
        );
    }

    #[test]
    fn test_unhandled_updates() {
        // Photo message without text
        let raw = json!({
            "message": {
                "chat": {"id": 555},
                "from": {"id": 42},
                "photo": []
            }
        });
        assert_eq!(Update::from_telegram_json(&raw), None);

        assert_eq!(Update::from_telegram_json(&json!({"update_id": 3})), None);
        assert_eq!(Update::from_telegram_json(&json!("garbage")), None);
    }
}
