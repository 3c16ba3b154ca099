//! Translation backend and gateway
//!
//! Provides the trait seam to the external translation API, the static
//! language catalog, and the gateway composing validation and quota checks.

pub mod catalog;
mod gateway;
mod yandex;

pub use gateway::{TranslateOutcome, TranslationGateway};
pub use yandex::YandexTranslator;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the translation API
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Error returned by the API
    #[error("API error: {0}")]
    Api(String),
    /// Error during network communication (including timeouts)
    #[error("Network error: {0}")]
    Network(String),
    /// Error parsing the response body
    #[error("JSON error: {0}")]
    Json(String),
    /// The response carried no translation entry
    #[error("empty translation in response")]
    EmptyTranslation,
}

/// One call to the external machine-translation service.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError>;
}
