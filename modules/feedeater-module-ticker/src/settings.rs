use std::collections::HashMap;
use std::time::Duration;

use feedeater_settings::{parser, SettingsError, SettingsParser};

use crate::manifest::MODULE_NAME;
use crate::schema::DEFAULT_EMBEDDING_DIM;

#[derive(Debug, Clone)]
pub struct TickerSettings {
    pub ws_url: String,
    pub symbols: Vec<String>,
    pub candle_interval: Duration,
    pub orderbook_depth: usize,
    pub embed_trades: bool,
    pub embedding_dim: usize,
}

impl SettingsParser for TickerSettings {
    fn parse(module: &str, raw: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let ws_url = parser::require_str(module, raw, "ws_url")?.to_string();

        let symbols_raw = parser::require_str(module, raw, "symbols")?;
        let symbols: Vec<String> =
            symbols_raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();

        if symbols.is_empty() {
            return Err(SettingsError::InvalidValue {
                module: module.to_string(),
                key: "symbols".to_string(),
                reason: "must contain at least one comma-separated symbol".to_string(),
            });
        }

        let candle_interval_secs = parser::number_or(module, raw, "candle_interval_secs", 60.0, true)?;
        let orderbook_depth = parser::number_or(module, raw, "orderbook_depth", 10.0, true)?;
        let embed_trades = parser::bool_or(raw, "embed_trades", true)?;
        let embedding_dim = parser::number_or(module, raw, "embedding_dim", DEFAULT_EMBEDDING_DIM as f64, true)?;

        Ok(Self {
            ws_url,
            symbols,
            candle_interval: Duration::from_secs_f64(candle_interval_secs),
            orderbook_depth: orderbook_depth as usize,
            embed_trades,
            embedding_dim: embedding_dim as usize,
        })
    }
}

impl TickerSettings {
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
    fn parses_comma_separated_symbols() {
        let mut raw = HashMap::new();
        raw.insert("ws_url".to_string(), "wss://stream.example/v1".to_string());
        raw.insert("symbols".to_string(), "tBTCUSD, tETHUSD".to_string());
        let settings = TickerSettings::parse("ticker", &raw).unwrap();
        assert_eq!(settings.symbols, vec!["tBTCUSD", "tETHUSD"]);
        assert_eq!(settings.candle_interval, Duration::from_secs(60));
        assert_eq!(settings.orderbook_depth, 10);
        assert!(settings.embed_trades);
        assert_eq!(settings.embedding_dim, DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn embedding_dim_overrides_default() {
        let mut raw = HashMap::new();
        raw.insert("ws_url".to_string(), "wss://stream.example/v1".to_string());
        raw.insert("symbols".to_string(), "tBTCUSD".to_string());
        raw.insert("embedding_dim".to_string(), "768".to_string());
        let settings = TickerSettings::parse("ticker", &raw).unwrap();
        assert_eq!(settings.embedding_dim, 768);
    }

    #[test]
    fn missing_ws_url_is_an_error() {
        let mut raw = HashMap::new();
        raw.insert("symbols".to_string(), "tBTCUSD".to_string());
        assert!(TickerSettings::parse("ticker", &raw).is_err());
    }

    #[test]
    fn missing_symbols_is_an_error() {
        let mut raw = HashMap::new();
        raw.insert("ws_url".to_string(), "wss://stream.example/v1".to_string());
        assert!(TickerSettings::parse("ticker", &raw).is_err());
    }
}
