use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A scalar settings/tag value. Settings transit a string-typed store, so
/// callers coerce to/from this at the boundary (see `feedeater-settings`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Number(f64),
    Bool(bool),
}

/// Declared type of a manifest setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    Secret,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingDeclaration {
    pub key: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub default: Option<Scalar>,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobDeclaration {
    pub name: String,
    pub queue: String,
    /// Cron-like schedule string, interpreted in UTC. Absent for jobs only
    /// ever triggered manually or by a trigger class.
    pub schedule: Option<String>,
    pub trigger_class: Option<String>,
    pub description: Option<String>,
}

/// Immutable, loaded once per process lifetime from a module's manifest
/// file. Changes require a process reload, never a live mutation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModuleManifest {
    pub name: String,
    pub version: String,
    pub queues: Vec<String>,
    pub jobs: Vec<JobDeclaration>,
    pub settings: Vec<SettingDeclaration>,
    pub ui_card_hints: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Setting {
    pub module: String,
    pub key: String,
    pub value: Option<String>,
    pub is_secret: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Success,
    Error,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(JobStatus::Idle),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "error" => Ok(JobStatus::Error),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Persisted lifecycle attributes for a (module, job) pair.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    pub module: String,
    pub name: String,
    pub queue: String,
    pub schedule: Option<String>,
    pub trigger_class: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_status: JobStatus,
    pub last_metrics: Option<Value>,
    pub last_run_created_at: Option<DateTime<Utc>>,
}

/// One execution of a job, created on enqueue and mutated by the worker.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobInstance {
    pub id: Uuid,
    pub module: String,
    pub job: String,
    pub queue: String,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub error: Option<String>,
    pub metrics: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageSource {
    pub module: String,
    pub stream: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContextRef {
    pub owner_module: String,
    pub source_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FollowMePanel {
    pub module: String,
    pub panel_id: String,
    pub href: Option<String>,
    pub label: Option<String>,
}

/// The invariant envelope produced by every collector. See
/// `feedeater-idempotency` for how `id` is derived and
/// `Message::validate` for the publish-time invariants from spec §3/§8.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source: MessageSource,
    pub realtime: bool,
    pub message: String,
    pub from: Option<String>,
    pub context_ref: Option<ContextRef>,
    pub follow_me_panel: Option<FollowMePanel>,
    pub is_direct_mention: bool,
    pub is_digest: bool,
    pub is_system_message: bool,
    pub likes: i64,
    pub tags: HashMap<String, Scalar>,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageValidationError {
    #[error("message source.module `{actual}` does not match publishing module `{expected}`")]
    SourceModuleMismatch { expected: String, actual: String },
}

impl Message {
    /// Enforces the invariant from spec §3/§8.3: `source.module` on any
    /// published envelope must equal the publishing module's declared name.
    pub fn validate(&self, publishing_module: &str) -> Result<(), MessageValidationError> {
        if self.source.module != publishing_module {
            return Err(MessageValidationError::SourceModuleMismatch {
                expected: publishing_module.to_string(),
                actual: self.source.module.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum BusEnvelope {
    MessageCreated { message: Message },
    ContextUpdated {
        created_at: DateTime<Utc>,
        message_id: Option<Uuid>,
        context: Context,
    },
}

pub const MAX_SUMMARY_SHORT_LEN: usize = 128;

/// A summary+embedding pair keyed by (ownerModule, sourceKey). At most one
/// live row exists per key (spec §3, §8.5).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Context {
    pub owner_module: String,
    pub source_key: String,
    pub summary_short: String,
    pub summary_long: String,
    pub key_points: Vec<String>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContextValidationError {
    #[error("summary_short is {len} chars, exceeds the {MAX_SUMMARY_SHORT_LEN}-char limit")]
    SummaryTooLong { len: usize },
}

impl Context {
    pub fn validate(&self) -> Result<(), ContextValidationError> {
        if self.summary_short.chars().count() > MAX_SUMMARY_SHORT_LEN {
            return Err(ContextValidationError::SummaryTooLong {
                len: self.summary_short.chars().count(),
            });
        }
        Ok(())
    }

    /// Truncates `summary_short` to the publish-time limit on a `char`
    /// boundary, used by the minimal-fallback path in the context engine.
    pub fn truncate_summary_short(&mut self) {
        if self.summary_short.chars().count() > MAX_SUMMARY_SHORT_LEN {
            self.summary_short = self
                .summary_short
                .chars()
                .take(MAX_SUMMARY_SHORT_LEN)
                .collect();
        }
    }
}

/// A row in `bus_messages`: a persisted copy of one published envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BusHistoryRow {
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub context_summary_short: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: String,
    pub source: String,
    pub at: DateTime<Utc>,
    pub message: String,
    pub meta: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_validate_rejects_mismatched_module() {
        let msg = Message {
            id: Uuid::nil(),
            created_at: Utc::now(),
            source: MessageSource { module: "rss".to_string(), stream: None },
            realtime: false,
            message: "hello".to_string(),
            from: None,
            context_ref: None,
            follow_me_panel: None,
            is_direct_mention: false,
            is_digest: false,
            is_system_message: false,
            likes: 0,
            tags: HashMap::new(),
        };
        assert!(msg.validate("rss").is_ok());
        assert!(msg.validate("bybit").is_err());
    }

    #[test]
    fn context_truncate_enforces_limit() {
        let mut ctx = Context {
            owner_module: "polymarket".to_string(),
            source_key: "market-1".to_string(),
            summary_short: "x".repeat(200),
            summary_long: String::new(),
            key_points: vec![],
            embedding: None,
        };
        assert!(ctx.validate().is_err());
        ctx.truncate_summary_short();
        assert!(ctx.validate().is_ok());
        assert_eq!(ctx.summary_short.chars().count(), MAX_SUMMARY_SHORT_LEN);
    }

    #[test]
    fn message_round_trips_through_json() {
        let msg = Message {
            id: Uuid::nil(),
            created_at: Utc::now(),
            source: MessageSource { module: "rss".to_string(), stream: Some("feed-1".to_string()) },
            realtime: false,
            message: "hello".to_string(),
            from: Some("author".to_string()),
            context_ref: Some(ContextRef { owner_module: "rss".to_string(), source_key: "feed-1".to_string() }),
            follow_me_panel: None,
            is_direct_mention: false,
            is_digest: false,
            is_system_message: false,
            likes: 3,
            tags: HashMap::from([("kind".to_string(), Scalar::String("post".to_string()))]),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, msg.id);
        assert_eq!(back.tags, msg.tags);
    }
}
