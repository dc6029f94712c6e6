//! Settings binding (spec §3, §4.3): at startup, every setting a module's
//! manifest declares with a default gets seeded into the registry if no
//! row exists yet. A `required` setting with no default and no stored
//! value is a startup error — a module can't run without it.

use feedeater_common::model::{ModuleManifest, Scalar, SettingType};
use feedeater_settings::SettingsRegistry;

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("module `{module}` requires setting `{key}` with no default and no stored value")]
    MissingRequired { module: String, key: String },
    #[error(transparent)]
    Settings(#[from] feedeater_settings::SettingsError),
}

pub async fn bind_settings(registry: &SettingsRegistry, manifest: &ModuleManifest) -> Result<(), BindingError> {
    let existing = registry.get_all(&manifest.name).await?;

    for decl in &manifest.settings {
        if existing.iter().any(|s| s.key == decl.key) {
            continue;
        }

        match &decl.default {
            Some(default) => {
                let is_secret = decl.setting_type == SettingType::Secret;
                registry
                    .put(&manifest.name, &decl.key, Some(&scalar_to_string(default)), is_secret)
                    .await?;
            }
            None if decl.required => {
                return Err(BindingError::MissingRequired {
                    module: manifest.name.clone(),
                    key: decl.key.clone(),
                });
            }
            None => {}
        }
    }

    Ok(())
}

fn scalar_to_string(scalar: &Scalar) -> String {
    match scalar {
        Scalar::String(s) => s.clone(),
        Scalar::Number(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedeater_common::model::{JobDeclaration, SettingDeclaration};

    fn manifest_with(settings: Vec<SettingDeclaration>) -> ModuleManifest {
        ModuleManifest {
            name: "rss".to_string(),
            version: "1.0.0".to_string(),
            queues: vec!["poll".to_string()],
            jobs: vec![JobDeclaration {
                name: "poll".to_string(),
                queue: "poll".to_string(),
                schedule: Some("*/5 * * * *".to_string()),
                trigger_class: Some("sweep".to_string()),
                description: None,
            }],
            settings,
            ui_card_hints: None,
        }
    }

    #[test]
    fn scalar_to_string_formats_each_variant() {
        assert_eq!(scalar_to_string(&Scalar::String("x".into())), "x");
        assert_eq!(scalar_to_string(&Scalar::Number(3.5)), "3.5");
        assert_eq!(scalar_to_string(&Scalar::Bool(true)), "true");
    }

    #[test]
    fn manifest_with_builds_expected_shape() {
        let manifest = manifest_with(vec![SettingDeclaration {
            key: "poll_interval_seconds".to_string(),
            setting_type: SettingType::Number,
            default: Some(Scalar::Number(300.0)),
            required: false,
        }]);
        assert_eq!(manifest.settings.len(), 1);
    }
}
