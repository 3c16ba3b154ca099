//! Conversation session state

use crate::storage::{Storage, StorageError};
use serde::{Deserialize, Serialize};

/// Represents the current state of the user dialogue
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum State {
    /// No active dialog; plain text goes through quick translate
    #[default]
    Idle,
    /// `/translate` received, waiting for a language pick
    AwaitingLanguage,
    /// Language picked, the next plain message is the text to translate
    AwaitingText { lang: String, lang_name: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionDoc {
    state: State,
}

/// One persisted session document per user; an absent document is `Idle`.
#[derive(Clone)]
pub struct SessionStore {
    storage: Storage,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn key(user_id: i64) -> String {
        format!("session_{user_id}")
    }

    /// Current state for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session document cannot be read.
    pub async fn state(&self, user_id: i64) -> Result<State, StorageError> {
        Ok(self
            .storage
            .load_json::<SessionDoc>(&Self::key(user_id))
            .await?
            .map(|doc| doc.state)
            .unwrap_or_default())
    }

    /// Persist a new state for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session document cannot be written.
    pub async fn set(&self, user_id: i64, state: State) -> Result<(), StorageError> {
        self.storage
            .save_json(&Self::key(user_id), &SessionDoc { state })
            .await
    }

    /// Reset a user to `Idle` by deleting the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the session document cannot be removed.
    pub async fn clear(&self, user_id: i64) -> Result<(), StorageError> {
        self.storage.delete(&Self::key(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_session_is_idle() -> Result<(), StorageError> {
        let sessions = SessionStore::new(Storage::in_memory());
        assert_eq!(sessions.state(7).await?, State::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_transitions_survive_reload() -> Result<(), StorageError> {
        let sessions = SessionStore::new(Storage::in_memory());

        sessions.set(7, State::AwaitingLanguage).await?;
        assert_eq!(sessions.state(7).await?, State::AwaitingLanguage);

        sessions
            .set(
                7,
                State::AwaitingText {
                    lang: "es".to_string(),
                    lang_name: "Испанский".to_string(),
                },
            )
            .await?;
        assert!(matches!(
            sessions.state(7).await?,
            State::AwaitingText { .. }
        ));

        sessions.clear(7).await?;
        assert_eq!(sessions.state(7).await?, State::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_sessions_are_per_user() -> Result<(), StorageError> {
        let sessions = SessionStore::new(Storage::in_memory());
        sessions.set(7, State::AwaitingLanguage).await?;
        assert_eq!(sessions.state(8).await?, State::Idle);
        Ok(())
    }
}
