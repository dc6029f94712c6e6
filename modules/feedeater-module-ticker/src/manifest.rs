use feedeater_common::model::{JobDeclaration, ModuleManifest, Scalar, SettingDeclaration, SettingType};

use crate::schema::DEFAULT_EMBEDDING_DIM;

pub const MODULE_NAME: &str = "ticker";
pub const QUEUE_NAME: &str = "ticker-stream";
pub const STREAM_JOB: &str = "stream";
pub const CONTEXT_JOB: &str = "refreshContexts";

/// Static manifest for the reference streaming trade-ticker module (spec
/// §8's scenarios S2 and S4). Loaded once at process start by the daemon
/// binary, not read from a file, matching `ModuleHost`'s "no live-reload"
/// contract.
pub fn manifest() -> ModuleManifest {
    ModuleManifest {
        name: MODULE_NAME.to_string(),
        version: "1.0.0".to_string(),
        queues: vec![QUEUE_NAME.to_string()],
        jobs: vec![
            JobDeclaration {
                name: STREAM_JOB.to_string(),
                queue: QUEUE_NAME.to_string(),
                schedule: Some("* * * * *".to_string()),
                trigger_class: Some("sweep".to_string()),
                description: Some(
                    "Streams trades over WebSocket for one budgeted session, reconnecting on drop"
                        .to_string(),
                ),
            },
            JobDeclaration {
                name: CONTEXT_JOB.to_string(),
                queue: QUEUE_NAME.to_string(),
                schedule: Some("0 */30 * * * *".to_string()),
                trigger_class: Some("refresh_contexts".to_string()),
                description: Some("Summarizes and embeds each symbol's recent trades".to_string()),
            },
        ],
        settings: vec![
            SettingDeclaration {
                key: "ws_url".to_string(),
                setting_type: SettingType::String,
                default: None,
                required: true,
            },
            SettingDeclaration {
                key: "symbols".to_string(),
                setting_type: SettingType::String,
                default: None,
                required: true,
            },
            SettingDeclaration {
                key: "candle_interval_secs".to_string(),
                setting_type: SettingType::Number,
                default: Some(Scalar::Number(60.0)),
                required: false,
            },
            SettingDeclaration {
                key: "orderbook_depth".to_string(),
                setting_type: SettingType::Number,
                default: Some(Scalar::Number(10.0)),
                required: false,
            },
            SettingDeclaration {
                key: "embed_trades".to_string(),
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
