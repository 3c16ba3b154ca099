use dotenvy::dotenv;
use maximus_bot::access::AllowList;
use maximus_bot::bot::{telegram, Router, SessionStore};
use maximus_bot::config::{Settings, DAILY_TRANSLATION_LIMIT};
use maximus_bot::rate_limit::UsageTracker;
use maximus_bot::storage::Storage;
use maximus_bot::translate::{TranslationGateway, YandexTranslator};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    api_key: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            api_key: Regex::new(r"Api-Key [A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .api_key
            .replace_all(&output, "Api-Key [MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Запуск бота-переводчика...");

    let settings = init_settings();

    let router = init_router(&settings);

    let bot = Bot::new(settings.telegram_token.clone());

    let handler = setup_handler();

    info!("Бот запущен");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wire the core: the allow-list persists under the data directory, while
/// sessions and usage counters live in process memory for this deployment
/// (they do not survive a restart; accepted for the long-polling shape).
fn init_router(settings: &Settings) -> Arc<Router> {
    let access = AllowList::new(Storage::on_disk(&settings.data_dir), settings.admin_ids());

    let ephemeral = Storage::in_memory();
    let quota = UsageTracker::new(ephemeral.clone(), DAILY_TRANSLATION_LIMIT);
    let sessions = SessionStore::new(ephemeral);

    let backend = Arc::new(YandexTranslator::new(
        settings.yandex_api_key.clone(),
        settings.yandex_folder_id.clone(),
    ));
    info!("Переводчик готов к работе");
    let gateway = TranslationGateway::new(backend, quota, settings.charge_failed_attempts);

    Arc::new(Router::new(access, gateway, sessions))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(Update::filter_message().endpoint(handle_message))
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    router: Arc<Router>,
) -> Result<(), teloxide::RequestError> {
    let Some(update) = telegram::message_to_update(&msg) else {
        return respond(());
    };
    match router.handle(update).await {
        Ok(actions) => telegram::execute_actions(&bot, actions).await,
        Err(e) => error!("Message handler error: {e:#}"),
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    router: Arc<Router>,
) -> Result<(), teloxide::RequestError> {
    // Acknowledge right away so the client stops the spinner even if the
    // handler below fails.
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(update) = telegram::callback_to_update(&q) else {
        return respond(());
    };
    match router.handle(update).await {
        Ok(actions) => telegram::execute_actions(&bot, actions).await,
        Err(e) => error!("Callback handler error: {e:#}"),
    }
    respond(())
}
