//! Yandex Translate API client

use crate::config::get_translate_timeout_secs;
use crate::translate::{TranslateError, TranslationBackend};
use crate::utils::truncate_str;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const TRANSLATE_URL: &str = "https://translate.api.cloud.yandex.net/translate/v2/translate";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    folder_id: &'a str,
    texts: [&'a str; 1],
    target_language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(default)]
    text: String,
}

/// Backend for the Yandex Translate v2 API.
pub struct YandexTranslator {
    http_client: HttpClient,
    api_key: String,
    folder_id: String,
}

impl YandexTranslator {
    /// Create a new client with the standard bounded timeout.
    #[must_use]
    pub fn new(api_key: String, folder_id: String) -> Self {
        let timeout = Duration::from_secs(get_translate_timeout_secs());
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self {
            http_client,
            api_key,
            folder_id,
        }
    }
}

#[async_trait]
impl TranslationBackend for YandexTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError> {
        info!("Перевод: '{}...' на {}", truncate_str(text, 30), target_lang);

        let body = TranslateRequest {
            folder_id: &self.folder_id,
            texts: [text],
            target_language_code: target_lang,
        };

        let response = self
            .http_client
            .post(TRANSLATE_URL)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TranslateError::Api(clean_api_error(status, &error_text)));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Json(e.to_string()))?;

        match parsed.translations.into_iter().next() {
            Some(t) if !t.text.is_empty() => Ok(t.text),
            _ => Err(TranslateError::EmptyTranslation),
        }
    }
}

/// Build a diagnostic for a non-2xx response without dumping raw HTML
/// error pages or unbounded bodies into the logs.
fn clean_api_error(status: reqwest::StatusCode, error_text: &str) -> String {
    let trimmed = error_text.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        format!("{status} (server returned HTML error page)")
    } else if error_text.chars().count() > 200 {
        format!("{status} - {}... (truncated)", truncate_str(error_text, 200))
    } else {
        format!("{status} - {error_text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() -> Result<(), serde_json::Error> {
        let body = TranslateRequest {
            folder_id: "b1g",
            texts: ["Hello"],
            target_language_code: "ru",
        };
        let json = serde_json::to_value(&body)?;
        assert_eq!(json["folderId"], "b1g");
        assert_eq!(json["texts"][0], "Hello");
        assert_eq!(json["targetLanguageCode"], "ru");
        Ok(())
    }

    #[test]
    fn test_response_parsing() -> Result<(), serde_json::Error> {
        let parsed: TranslateResponse =
            serde_json::from_str(r#"{"translations":[{"text":"Привет"}]}"#)?;
        assert_eq!(parsed.translations[0].text, "Привет");

        // Missing array is tolerated and later treated as a failure
        let empty: TranslateResponse = serde_json::from_str("{}")?;
        assert!(empty.translations.is_empty());
        Ok(())
    }

    #[test]
    fn test_clean_api_error_hides_html() {
        let msg = clean_api_error(
            reqwest::StatusCode::BAD_GATEWAY,
            "<html><body>nginx</body></html>",
        );
        assert!(!msg.contains("nginx"));
        assert!(msg.contains("502"));
    }
}
