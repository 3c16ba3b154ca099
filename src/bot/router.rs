//! Update routing
//!
//! The transport-independent dispatcher: consumes decoded [`Update`]s,
//! drives the conversation state machine and the translation gateway, and
//! produces the outbound actions for whichever transport is attached.

use crate::access::{AllowList, RemoveOutcome};
use crate::bot::commands::Command;
use crate::bot::state::{SessionStore, State};
use crate::bot::update::{Action, CallbackAction, IncomingMessage, Update};
use crate::bot::views::{language_keyboard, quick_followup_keyboard};
use crate::config::MAX_TEXT_CHARS;
use crate::rate_limit::QuotaDecision;
use crate::translate::catalog::{display_name, QUICK_TRANSLATE_LANG};
use crate::translate::{TranslateOutcome, TranslationGateway};
use crate::utils::truncate_str;
use anyhow::Result;
use tracing::{debug, info};

fn send(chat_id: i64, text: impl Into<String>) -> Action {
    Action::SendMessage {
        chat_id,
        text: text.into(),
        keyboard: None,
    }
}

fn denied_text(user_id: i64, user_name: &str) -> String {
    format!(
        "Недостаточно прав для использования бота.\n\n\
         Ваш ID: {user_id}\n\
         Имя: {user_name}\n\n\
         Перешлите этот ID администратору для получения доступа."
    )
}

fn quota_text(used: u32, limit: u32) -> String {
    format!("Вы использовали {used} из {limit} переводов сегодня")
}

const TOO_LONG_TEXT: &str = "Текст слишком длинный (максимум 1000 символов).";
const ADMIN_ONLY_TEXT: &str = "Только для админа";

/// Command dispatcher and conversation state machine.
#[derive(Clone)]
pub struct Router {
    access: AllowList,
    gateway: TranslationGateway,
    sessions: SessionStore,
}

impl Router {
    #[must_use]
    pub fn new(access: AllowList, gateway: TranslationGateway, sessions: SessionStore) -> Self {
        Self {
            access,
            gateway,
            sessions,
        }
    }

    /// Route one update to its handler.
    ///
    /// # Errors
    ///
    /// Returns an error when persisted state cannot be read or written; the
    /// transport boundary logs it and acknowledges the update anyway.
    pub async fn handle(&self, update: Update) -> Result<Vec<Action>> {
        match update {
            Update::Message(msg) => self.handle_message(&msg).await,
            Update::Callback(cb) => self.handle_callback(&cb).await,
        }
    }

    async fn handle_message(&self, msg: &IncomingMessage) -> Result<Vec<Action>> {
        let text = msg.text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        match Command::parse(text) {
            Some(cmd) => self.dispatch_command(msg, cmd).await,
            None => self.handle_text(msg, text).await,
        }
    }

    async fn dispatch_command(&self, msg: &IncomingMessage, cmd: Command) -> Result<Vec<Action>> {
        let user_id = msg.user_id;
        let allowed = self.access.is_allowed(user_id).await?;

        // /start and /help answer strangers with the denial text; every
        // other path stays silent for them.
        match cmd {
            Command::Start | Command::Help if !allowed => {
                info!("Denied access for user {user_id} ({})", msg.user_name);
                return Ok(vec![send(msg.chat_id, denied_text(user_id, &msg.user_name))]);
            }
            Command::AddUser(_) | Command::RemoveUser(_) | Command::ListUsers
            | Command::ResetUsage(_) => {
                if self.access.is_admin(user_id) {
                    let reply = self.admin_action(cmd).await?;
                    return Ok(vec![send(msg.chat_id, reply)]);
                }
                if allowed {
                    return Ok(vec![send(msg.chat_id, ADMIN_ONLY_TEXT)]);
                }
                debug!("Ignoring admin command from stranger {user_id}");
                return Ok(Vec::new());
            }
            _ if !allowed => {
                debug!("Ignoring command from stranger {user_id}");
                return Ok(Vec::new());
            }
            _ => {}
        }

        match cmd {
            Command::Start => Ok(vec![send(msg.chat_id, self.welcome_text())]),
            Command::Help => Ok(vec![send(msg.chat_id, self.help_text())]),
            Command::Translate => self.cmd_translate(msg).await,
            Command::Languages => Ok(vec![send(msg.chat_id, self.languages_text())]),
            Command::Status => {
                let usage = self.gateway.quota().usage(user_id).await?;
                let text = format!(
                    "Ваш статус использования:\n\n\
                     Использовано переводов сегодня: {} из {}\n\
                     Осталось переводов: {}\n\n\
                     Лимит: {} переводов в день\n\
                     Максимальная длина текста: {MAX_TEXT_CHARS} символов",
                    usage.used, usage.limit, usage.remaining, usage.limit
                );
                Ok(vec![send(msg.chat_id, text)])
            }
            Command::Cancel => {
                self.sessions.clear(user_id).await?;
                Ok(vec![send(msg.chat_id, "Перевод отменен.")])
            }
            Command::Lang(code) => {
                let reply = self.pick_language(user_id, &code).await?;
                Ok(vec![send(msg.chat_id, reply)])
            }
            Command::Unknown => Ok(vec![send(
                msg.chat_id,
                "Неизвестная команда.\nИспользуй /help для просмотра доступных команд",
            )]),
            // Admin commands handled above
            Command::AddUser(_)
            | Command::RemoveUser(_)
            | Command::ListUsers
            | Command::ResetUsage(_) => Ok(Vec::new()),
        }
    }

    /// Admin CRUD over the allow-list and usage counters. The caller has
    /// already verified `is_admin`.
    async fn admin_action(&self, cmd: Command) -> Result<String> {
        Ok(match cmd {
            Command::AddUser(None) => "Напиши: /adduser 123456789".to_string(),
            Command::AddUser(Some(id)) => {
                if self.access.add_user(id, "", "Added by admin").await? {
                    format!("Добавил пользователя {id}")
                } else {
                    format!("Пользователь {id} уже есть в списке")
                }
            }
            Command::RemoveUser(None) => "Напиши: /removeuser id_пользователя".to_string(),
            Command::RemoveUser(Some(id)) => match self.access.remove_user(id).await? {
                RemoveOutcome::Removed => format!("Удалил пользователя {id}"),
                RemoveOutcome::NotFound => format!("Пользователь {id} не найден"),
                RemoveOutcome::Protected => "Извини, но нет".to_string(),
            },
            Command::ListUsers => {
                let users = self.access.list_users().await?;
                if users.is_empty() {
                    "Нет пользователей".to_string()
                } else {
                    let mut text = "Список пользователей:\n\n".to_string();
                    for (id, entry) in &users {
                        text.push_str(&format!(
                            "ID: {id}\nИмя: {}\nAdded: {}\n\n",
                            entry.name, entry.added
                        ));
                    }
                    text
                }
            }
            Command::ResetUsage(None) => "Напиши: /resetusage 123456789".to_string(),
            Command::ResetUsage(Some(id)) => {
                if self.gateway.quota().reset(id).await? {
                    format!("Сбросил счетчик для пользователя {id}")
                } else {
                    format!("У пользователя {id} нет счетчика за сегодня")
                }
            }
            _ => String::new(),
        })
    }

    async fn cmd_translate(&self, msg: &IncomingMessage) -> Result<Vec<Action>> {
        let user_id = msg.user_id;
        match self.gateway.quota().can_translate(user_id).await? {
            QuotaDecision::Exceeded { used, limit } => {
                // Quota rejection always lands the session back in Idle.
                self.sessions.clear(user_id).await?;
                Ok(vec![send(
                    msg.chat_id,
                    format!(
                        "Превышен дневной лимит: {}\nИспользуйте /status для проверки.",
                        quota_text(used, limit)
                    ),
                )])
            }
            QuotaDecision::Allowed => {
                self.sessions.set(user_id, State::AwaitingLanguage).await?;
                info!("Пользователь {} начал перевод", msg.user_name);
                Ok(vec![Action::SendMessage {
                    chat_id: msg.chat_id,
                    text: "Выберите язык для перевода:".to_string(),
                    keyboard: Some(language_keyboard()),
                }])
            }
        }
    }

    async fn pick_language(&self, user_id: i64, code: &str) -> Result<String> {
        let name = display_name(code);
        self.sessions
            .set(
                user_id,
                State::AwaitingText {
                    lang: code.to_string(),
                    lang_name: name.clone(),
                },
            )
            .await?;
        info!("Выбран язык: {code} ({name})");
        Ok(format!(
            "Выбран язык: {name}\n\nТеперь введите текст для перевода:\n\nДля отмены: /cancel"
        ))
    }

    async fn handle_text(&self, msg: &IncomingMessage, text: &str) -> Result<Vec<Action>> {
        let user_id = msg.user_id;
        if !self.access.is_allowed(user_id).await? {
            debug!("Ignoring text from stranger {user_id}");
            return Ok(Vec::new());
        }

        // State dispatch comes before the quick-translate fallthrough.
        match self.sessions.state(user_id).await? {
            State::AwaitingText { lang, lang_name } => {
                self.session_translate(msg, text, &lang, &lang_name).await
            }
            State::AwaitingLanguage => Ok(vec![send(
                msg.chat_id,
                "Сначала выберите язык из списка выше.\n\nДля отмены: /cancel",
            )]),
            State::Idle => self.quick_translate(msg, text).await,
        }
    }

    /// The `AwaitingText` leg of the guided flow. The session is cleared
    /// before the outcome is known.
    async fn session_translate(
        &self,
        msg: &IncomingMessage,
        text: &str,
        lang: &str,
        lang_name: &str,
    ) -> Result<Vec<Action>> {
        self.sessions.clear(msg.user_id).await?;
        info!(
            "Перевод текста: '{}...' на {lang}",
            truncate_str(text, 50)
        );

        let mut actions = vec![Action::SendTyping {
            chat_id: msg.chat_id,
        }];
        let outcome = self.gateway.translate(text, lang, Some(msg.user_id)).await?;
        let reply = match outcome {
            TranslateOutcome::Translated(translated) => {
                format!("Перевод на {lang_name}:\n\n{translated}\n\nДля нового перевода: /translate")
            }
            TranslateOutcome::QuotaExceeded { used, limit } => {
                format!("Превышен дневной лимит: {}", quota_text(used, limit))
            }
            TranslateOutcome::TooLong { .. } => TOO_LONG_TEXT.to_string(),
            TranslateOutcome::Failed | TranslateOutcome::Unchanged(_) => {
                "Не удалось перевести текст.\nПопробуйте еще раз: /translate".to_string()
            }
        };
        actions.push(send(msg.chat_id, reply));
        Ok(actions)
    }

    /// Quick translate: any plain message while idle becomes an implicit
    /// translate-to-Russian request.
    async fn quick_translate(&self, msg: &IncomingMessage, text: &str) -> Result<Vec<Action>> {
        info!("Быстрый перевод: '{}...'", truncate_str(text, 50));

        let mut actions = vec![Action::SendTyping {
            chat_id: msg.chat_id,
        }];
        let outcome = self
            .gateway
            .translate(text, QUICK_TRANSLATE_LANG, Some(msg.user_id))
            .await?;
        match outcome {
            TranslateOutcome::Translated(translated) => {
                actions.push(Action::SendMessage {
                    chat_id: msg.chat_id,
                    text: format!(
                        "Перевод на русский:\n\n{translated}\n\nИсходный текст:\n{text}"
                    ),
                    keyboard: Some(quick_followup_keyboard()),
                });
            }
            TranslateOutcome::QuotaExceeded { used, limit } => {
                actions.push(send(
                    msg.chat_id,
                    format!("Превышен дневной лимит: {}", quota_text(used, limit)),
                ));
            }
            TranslateOutcome::TooLong { .. } => {
                actions.push(send(msg.chat_id, TOO_LONG_TEXT));
            }
            TranslateOutcome::Failed => {
                actions.push(send(
                    msg.chat_id,
                    "Не удалось перевести текст. Попробуйте команду /translate",
                ));
            }
            TranslateOutcome::Unchanged(_) => {
                actions.pop();
            }
        }
        Ok(actions)
    }

    async fn handle_callback(&self, cb: &CallbackAction) -> Result<Vec<Action>> {
        // Always acknowledge so the client stops the spinner and the
        // transport never retries.
        let mut actions = vec![Action::AnswerCallback { id: cb.id.clone() }];

        if !self.access.is_allowed(cb.user_id).await? {
            debug!("Ignoring callback from stranger {}", cb.user_id);
            return Ok(actions);
        }

        if cb.data == "cancel" {
            self.sessions.clear(cb.user_id).await?;
            actions.push(Action::EditMessage {
                chat_id: cb.chat_id,
                message_id: cb.message_id,
                text: "Перевод отменен".to_string(),
            });
        } else if let Some(code) = cb.data.strip_prefix("lang_") {
            let reply = self.pick_language(cb.user_id, code).await?;
            actions.push(Action::EditMessage {
                chat_id: cb.chat_id,
                message_id: cb.message_id,
                text: reply,
            });
        } else if cb.data == "quick_en" || cb.data == "quick_es" {
            // The follow-up buttons only hint at the guided flow.
            actions.push(Action::EditMessage {
                chat_id: cb.chat_id,
                message_id: cb.message_id,
                text: "Для перевода на другие языки используйте команду /translate".to_string(),
            });
        } else {
            debug!("Unknown callback data: {}", cb.data);
        }
        Ok(actions)
    }

    fn welcome_text(&self) -> String {
        format!(
            "Привет!\n\n\
             Я бот-переводчик Максимус\n\n\
             Я умею:\n\
             - Переводить текст на разные языки\n\
             - Определять язык исходного текста\n\n\
             Команды:\n\
             /start - Запустить бота\n\
             /help - Помощь и инструкции\n\
             /translate - Начать перевод\n\
             /status - Статус использования\n\n\
             Просто отправь текст, чтобы получить перевод! (Доступно {} в день)",
            self.gateway.quota().limit()
        )
    }

    fn help_text(&self) -> String {
        format!(
            "Команды бота:\n\n\
             /start - Начать работу с ботом\n\
             /help - Показать эту справку\n\
             /translate - Начать перевод текста\n\
             /languages - Показать список языков\n\
             /cancel - Отменить текущий перевод\n\
             /status - Узнать лимит переводов (доступно {} в день)\n\n\
             Использование:\n\n\
             1. Для перевода с выбором языка:\n\
             - Отправьте /translate\n\
             - Выберите язык из списка\n\
             - Введите текст для перевода\n\n\
             2. Для быстрого перевода на русский:\n\
             - Просто отправьте любой текст\n\
             - Бот автоматически переведет его\n\n\
             Поддерживаемые языки: русский, английский, испанский, французский, \
             немецкий, итальянский и другие.",
            self.gateway.quota().limit()
        )
    }

    fn languages_text(&self) -> String {
        let mut text = "Поддерживаемые языки:\n\n".to_string();
        for (code, name) in self.gateway.languages() {
            text.push_str(&format!("{name} ({code})\n"));
        }
        text
    }
}
