//! Teloxide transport edge
//!
//! Maps teloxide updates into the core [`Update`] vocabulary and executes
//! outbound [`Action`]s. Delivery failures are logged and swallowed; the
//! bot never retries a send and never fails the triggering update.

use crate::bot::update::{Action, CallbackAction, IncomingMessage, Keyboard, Update};
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId,
};
use tracing::{debug, error};

/// Decode an inbound text message. `None` for anything this bot ignores
/// (media, service messages, messages without a sender).
#[must_use]
pub fn message_to_update(msg: &Message) -> Option<Update> {
    let from = msg.from.as_ref()?;
    let text = msg.text()?;
    Some(Update::Message(IncomingMessage {
        chat_id: msg.chat.id.0,
        user_id: from.id.0.cast_signed(),
        user_name: from.first_name.clone(),
        text: text.to_string(),
    }))
}

/// Decode an inline-button press. `None` when the originating message is
/// no longer accessible or the query carries no data.
#[must_use]
pub fn callback_to_update(q: &CallbackQuery) -> Option<Update> {
    let data = q.data.as_ref()?;
    let message = q.message.as_ref()?;
    Some(Update::Callback(CallbackAction {
        id: q.id.to_string(),
        chat_id: message.chat().id.0,
        message_id: message.id().0,
        user_id: q.from.id.0.cast_signed(),
        data: data.clone(),
    }))
}

fn to_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.into_iter().map(|row| {
        row.into_iter()
            .map(|b| InlineKeyboardButton::callback(b.label, b.data))
            .collect::<Vec<_>>()
    }))
}

/// Execute the router's actions over the Bot API.
///
/// Callback queries are acknowledged by the endpoint at receipt, so
/// `AnswerCallback` actions are already satisfied here.
pub async fn execute_actions(bot: &Bot, actions: Vec<Action>) {
    for action in actions {
        let result = match action {
            Action::SendMessage {
                chat_id,
                text,
                keyboard,
            } => {
                let req = bot.send_message(ChatId(chat_id), text);
                match keyboard {
                    Some(kb) => req.reply_markup(to_markup(kb)).await,
                    None => req.await,
                }
            }
            Action::EditMessage {
                chat_id,
                message_id,
                text,
            } => {
                bot.edit_message_text(ChatId(chat_id), MessageId(message_id), text)
                    .await
            }
            Action::AnswerCallback { id } => {
                debug!("Callback {id} already answered at receipt");
                continue;
            }
            Action::SendTyping { chat_id } => {
                if let Err(e) = bot.send_chat_action(ChatId(chat_id), ChatAction::Typing).await {
                    error!("Failed to send typing indicator: {e}");
                }
                continue;
            }
        };
        if let Err(e) = result {
            error!("Failed to deliver response: {e}");
        }
    }
}
