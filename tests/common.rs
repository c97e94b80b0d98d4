#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use narrator_gateway::model::{ChatModel, Conversation, ConversationHistory, ModelError, Turn};
use once_cell::sync::Lazy;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static START: Once = Once::new();
static _GUARD: Lazy<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Initialize test environment: dotenv and tracing (stderr + file).
/// Idempotent: safe to call multiple times.
pub fn init() {
    START.call_once(|| {
        let _ = dotenvy::dotenv();
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .expect("env filter");

        // Daily rotating log file separate from app runtime logs
        let file_appender = rolling::daily("logs", "tests.log");
        let (file_nb, guard) = tracing_appender::non_blocking(file_appender);
        *_GUARD.lock().unwrap() = Some(guard); // retain guard for lifetime

        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(file_nb);

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init();

        tracing::info!(target="test_init", "Test tracing initialized (stderr + rotating file)");
    });
}

/// What the scripted model observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Started(usize),
    Seeded(usize, Vec<Turn>),
    Sent(usize, String),
}

type ReplyFn = dyn Fn(&str) -> Result<String, ModelError> + Send + Sync;

/// Test double for the external model: replies come from a closure, every call is logged.
pub struct ScriptedModel {
    log: Arc<Mutex<Vec<Call>>>,
    reply: Arc<ReplyFn>,
    next_id: AtomicUsize,
}

impl ScriptedModel {
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&str) -> Result<String, ModelError> + Send + Sync + 'static,
    {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(reply),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Replies with `echo: <text>`.
    pub fn echo() -> Self {
        Self::new(|text| Ok(format!("echo: {text}")))
    }

    /// Always replies with the given raw text.
    pub fn fixed(raw: &'static str) -> Self {
        Self::new(move |_| Ok(raw.to_string()))
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self::new(|_| Err(ModelError::Other("quota exceeded".into())))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn conversations_started(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }
}

impl ChatModel for ScriptedModel {
    fn start_conversation(&self) -> Box<dyn Conversation> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Call::Started(id));
        Box::new(ScriptedConversation {
            id,
            log: Arc::clone(&self.log),
            reply: Arc::clone(&self.reply),
            history: ConversationHistory::new(),
        })
    }
}

struct ScriptedConversation {
    id: usize,
    log: Arc<Mutex<Vec<Call>>>,
    reply: Arc<ReplyFn>,
    history: ConversationHistory,
}

#[async_trait]
impl Conversation for ScriptedConversation {
    fn seed(&mut self, turns: &[Turn]) {
        self.history.extend_from_slice(turns);
        self.log.lock().unwrap().push(Call::Seeded(self.id, turns.to_vec()));
    }

    async fn send(&mut self, text: &str) -> Result<String, ModelError> {
        self.log.lock().unwrap().push(Call::Sent(self.id, text.to_string()));
        let reply = (self.reply)(text)?;
        self.history.add_user(text).add_model(&reply);
        Ok(reply)
    }
}
