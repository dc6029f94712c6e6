use std::collections::HashMap;
use std::time::Duration;

use feedeater_settings::{parser, SettingsError, SettingsParser};

use crate::manifest::MODULE_NAME;
use crate::schema::DEFAULT_EMBEDDING_DIM;

#[derive(Debug, Clone)]
pub struct RssSettings {
    pub feed_urls: Vec<String>,
    pub poll_timeout: Duration,
    pub embed_items: bool,
    pub embedding_dim: usize,
}

impl SettingsParser for RssSettings {
    fn parse(module: &str, raw: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let feed_urls_raw = parser::require_str(module, raw, "feed_urls")?;
        let feed_urls: Vec<String> =
            feed_urls_raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();

        if feed_urls.is_empty() {
            return Err(SettingsError::InvalidValue {
                module: module.to_string(),
                key: "feed_urls".to_string(),
                reason: "must contain at least one comma-separated URL".to_string(),
            });
        }

        let timeout_secs = parser::number_or(module, raw, "poll_timeout_secs", 10.0, true)?;
        let embed_items = parser::bool_or(raw, "embed_items", true)?;
        let embedding_dim = parser::number_or(module, raw, "embedding_dim", DEFAULT_EMBEDDING_DIM as f64, true)?;

        Ok(Self {
            feed_urls,
            poll_timeout: Duration::from_secs_f64(timeout_secs),
            embed_items,
            embedding_dim: embedding_dim as usize,
        })
    }
}

impl RssSettings {
    pub async fn load(registry: &feedeater_settings::SettingsRegistry) -> Result<Self, SettingsError> {
        let settings = registry.get_all(MODULE_NAME).await?;
        let raw: HashMap<String, String> =
            settings.into_iter().filter_map(|s| s.value.map(|v| (s.key, v))).collect();
        Self::parse(MODULE_NAME, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_feed_urls() {
        let mut raw = HashMap::new();
        raw.insert("feed_urls".to_string(), "https://a.example/feed.xml, https://b.example/feed.xml".to_string());
        let settings = RssSettings::parse("rss", &raw).unwrap();
        assert_eq!(settings.feed_urls, vec!["https://a.example/feed.xml", "https://b.example/feed.xml"]);
        assert_eq!(settings.poll_timeout, Duration::from_secs(10));
        assert!(settings.embed_items);
        assert_eq!(settings.embedding_dim, DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn embedding_dim_overrides_default() {
        let mut raw = HashMap::new();
        raw.insert("feed_urls".to_string(), "https://a.example/feed.xml".to_string());
        raw.insert("embedding_dim".to_string(), "768".to_string());
        let settings = RssSettings::parse("rss", &raw).unwrap();
        assert_eq!(settings.embedding_dim, 768);
    }

    #[test]
    fn missing_feed_urls_is_an_error() {
        let raw = HashMap::new();
        assert!(RssSettings::parse("rss", &raw).is_err());
    }
}
