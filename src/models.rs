use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three reply styles rolled for every post, in the order they are generated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Conversational,
    Curious,
    Provocative,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Conversational, Self::Curious, Self::Provocative];

    /// Card title shown above a reply
    pub const fn label(self) -> &'static str {
        match self {
            Self::Conversational => "Witty",
            Self::Curious => "Thoughtful",
            Self::Provocative => "Viral Bait",
        }
    }

    /// Tone instruction embedded in the prompt for this category
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::Conversational => {
                "Given this post, generate a witty reply that feels natural and real. \
                 Avoid tryhard emojis or cringe corporate tone."
            }
            Self::Curious => {
                "Given this post, generate a thoughtful reply that makes people curious \
                 and want to engage more. Keep it natural and fast, not corporate."
            }
            Self::Provocative => {
                "Given this post, generate a reply with viral bait potential that could \
                 stir up reactions. Be bold but feel real, avoid cringe."
            }
        }
    }
}

/// One category's prompt for one post. Built per session and consumed by the AI client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub category: Category,
    pub source_text: String,
}

impl ReplyRequest {
    pub fn new(category: Category, source_text: impl Into<String>) -> Self {
        Self {
            category,
            source_text: source_text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyResult {
    pub category: Category,
    pub text: String,
}

impl ReplyResult {
    /// Raw model output is trimmed before it is stored
    pub fn new(category: Category, raw: &str) -> Self {
        Self {
            category,
            text: raw.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    InProgress,
    Complete,
    Failed(String),
}

impl SessionStatus {
    pub const fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSession {
    pub id: Uuid,
    pub source_text: String,
    pub results: Vec<ReplyResult>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
}

impl GenerationSession {
    /// Starts a session for `source_text`, or `None` when it is blank.
    pub fn start(source_text: &str) -> Option<Self> {
        if source_text.trim().is_empty() {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4(),
            source_text: source_text.to_string(),
            results: Vec::with_capacity(Category::ALL.len()),
            status: SessionStatus::InProgress,
            started_at: Utc::now(),
        })
    }

    /// Appends a reply. Returns `false` (and leaves the session untouched) when the
    /// session already holds a reply for that category or is not accepting results.
    pub fn push(&mut self, result: ReplyResult) -> bool {
        if !self.status.is_in_progress()
            || self.results.len() >= Category::ALL.len()
            || self.results.iter().any(|r| r.category == result.category)
        {
            return false;
        }
        self.results.push(result);
        true
    }

    pub fn complete(&mut self) {
        if self.status.is_in_progress() {
            self.status = SessionStatus::Complete;
        }
    }

    pub fn fail(&mut self, reason: String) {
        if self.status.is_in_progress() {
            self.status = SessionStatus::Failed(reason);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_pace_millis")]
    pub pace_millis: u64,
    #[serde(default = "default_copied_millis")]
    pub copied_millis: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

const fn default_timeout() -> u64 {
    60
}

const fn default_pace_millis() -> u64 {
    800
}

const fn default_copied_millis() -> u64 {
    2000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            model: default_model(),
            request_timeout: default_timeout(),
            pace_millis: default_pace_millis(),
            copied_millis: default_copied_millis(),
            api_key: None,
        }
    }
}
