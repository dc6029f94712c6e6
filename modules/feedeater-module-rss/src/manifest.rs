use feedeater_common::model::{JobDeclaration, ModuleManifest, Scalar, SettingDeclaration, SettingType};

use crate::schema::DEFAULT_EMBEDDING_DIM;

pub const MODULE_NAME: &str = "rss";
pub const QUEUE_NAME: &str = "rss-poll";
pub const POLL_JOB: &str = "poll";
pub const CONTEXT_JOB: &str = "refreshContexts";

/// Static manifest for the reference RSS/Atom polling module (spec §8's
/// scenario S1). Loaded once at process start by the daemon binary, not
/// read from a file, matching `ModuleHost`'s "no live-reload" contract.
pub fn manifest() -> ModuleManifest {
    ModuleManifest {
        name: MODULE_NAME.to_string(),
        version: "1.0.0".to_string(),
        queues: vec![QUEUE_NAME.to_string()],
        jobs: vec![
            JobDeclaration {
                name: POLL_JOB.to_string(),
                queue: QUEUE_NAME.to_string(),
                schedule: Some("*/5 * * * *".to_string()),
                trigger_class: Some("sweep".to_string()),
                description: Some("Polls every configured feed and ingests new entries".to_string()),
            },
            JobDeclaration {
                name: CONTEXT_JOB.to_string(),
                queue: QUEUE_NAME.to_string(),
                schedule: Some("0 */30 * * * *".to_string()),
                trigger_class: Some("refresh_contexts".to_string()),
                description: Some("Summarizes and embeds each feed's recent entries".to_string()),
            },
        ],
        settings: vec![
            SettingDeclaration {
                key: "feed_urls".to_string(),
                setting_type: SettingType::String,
                default: None,
                required: true,
            },
            SettingDeclaration {
                key: "poll_timeout_secs".to_string(),
                setting_type: SettingType::Number,
                default: Some(Scalar::Number(10.0)),
                required: false,
            },
            SettingDeclaration {
                key: "embed_items".to_string(),
                setting_type: SettingType::Boolean,
                default: Some(Scalar::Bool(true)),
                required: false,
            },
            SettingDeclaration {
                key: "embedding_dim".to_string(),
                setting_type: SettingType::Number,
                default: Some(Scalar::Number(DEFAULT_EMBEDDING_DIM as f64)),
                required: false,
            },
        ],
        ui_card_hints: None,
    }
}
