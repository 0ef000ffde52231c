use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::strategy::StrategyKind;

const ENV_PREFIX: &str = "BREAKOUT";

/// Process-wide risk budget. Read-only once the engine starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub capital: f64,
    pub risk_fraction: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            capital: 100_000.0,
            risk_fraction: 0.01, // 1% of capital per trade
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyConfig {
    pub name: String,
    pub entry_buffer: f64,
    pub sl_buffer: f64,
    /// Candles at the start of the session that form the opening range
    pub opening_candles: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: "ORB".to_string(),
            entry_buffer: 0.0009, // ~9 bps
            sl_buffer: 0.0009,
            opening_candles: 3,
        }
    }
}

/// Trading window in exchange-local wall-clock time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub start: String,
    pub end: String,
    /// Open positions are force-closed at this time. Defaults to `end`.
    pub exit_cutoff: Option<String>,
    pub utc_offset_minutes: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start: "09:30".to_string(),
            end: "15:15".to_string(),
            exit_cutoff: None,
            utc_offset_minutes: 330, // IST
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub risk: RiskConfig,
    pub strategy: StrategyConfig,
    pub session: SessionConfig,
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            strategy: StrategyConfig::default(),
            session: SessionConfig::default(),
            poll_interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `BREAKOUT_*` environment variables (e.g. `BREAKOUT_RISK__CAPITAL`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject anything the engine cannot run with
    pub fn validate(&self, symbols: &[String]) -> Result<(), ConfigError> {
        let risk_fraction = self.risk.risk_fraction;
        if !(risk_fraction > 0.0 && risk_fraction <= 1.0) {
            return Err(ConfigError::InvalidRiskFraction(risk_fraction));
        }
        if !(self.risk.capital.is_finite() && self.risk.capital > 0.0) {
            return Err(ConfigError::InvalidCapital(self.risk.capital));
        }

        validate_symbols(symbols)?;

        for (name, value) in [
            ("entry", self.strategy.entry_buffer),
            ("stop-loss", self.strategy.sl_buffer),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::InvalidBuffer { name, value });
            }
        }
        if self.strategy.opening_candles == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        self.strategy.name.parse::<StrategyKind>()?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        crate::execution::TradingSession::from_config(&self.session)?;
        Ok(())
    }
}

fn validate_symbols(symbols: &[String]) -> Result<(), ConfigError> {
    if symbols.is_empty() {
        return Err(ConfigError::NoSymbols);
    }

    let mut seen = HashSet::new();
    for symbol in symbols {
        if symbol.trim().is_empty() || symbol.trim() != symbol {
            return Err(ConfigError::InvalidSymbol(symbol.clone()));
        }
        if !seen.insert(symbol.as_str()) {
            return Err(ConfigError::DuplicateSymbol(symbol.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate(&symbols(&["INFY", "TCS"])).is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_rejects_bad_risk_fraction() {
        let mut config = EngineConfig::default();

        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            config.risk.risk_fraction = bad;
            assert!(matches!(
                config.validate(&symbols(&["INFY"])),
                Err(ConfigError::InvalidRiskFraction(_))
            ));
        }

        config.risk.risk_fraction = 1.0;
        assert!(config.validate(&symbols(&["INFY"])).is_ok());
    }

    #[test]
    fn test_rejects_bad_symbol_lists() {
        let config = EngineConfig::default();

        assert_eq!(config.validate(&[]), Err(ConfigError::NoSymbols));
        assert_eq!(
            config.validate(&symbols(&["INFY", "INFY"])),
            Err(ConfigError::DuplicateSymbol("INFY".to_string()))
        );
        assert!(matches!(
            config.validate(&symbols(&[" "])),
            Err(ConfigError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_session() {
        let mut config = EngineConfig::default();
        config.session.start = "9h30".to_string();
        assert!(matches!(
            config.validate(&symbols(&["INFY"])),
            Err(ConfigError::MalformedTime(_))
        ));

        let mut config = EngineConfig::default();
        config.session.start = "15:30".to_string();
        assert!(matches!(
            config.validate(&symbols(&["INFY"])),
            Err(ConfigError::EmptySessionWindow { .. })
        ));

        let mut config = EngineConfig::default();
        config.session.exit_cutoff = Some("15:30".to_string());
        assert!(matches!(
            config.validate(&symbols(&["INFY"])),
            Err(ConfigError::CutoffOutsideWindow { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_strategy_and_bad_params() {
        let mut config = EngineConfig::default();
        config.strategy.name = "MOMENTUM".to_string();
        assert_eq!(
            config.validate(&symbols(&["INFY"])),
            Err(ConfigError::UnknownStrategy("MOMENTUM".to_string()))
        );

        let mut config = EngineConfig::default();
        config.strategy.sl_buffer = 1.0;
        assert!(matches!(
            config.validate(&symbols(&["INFY"])),
            Err(ConfigError::InvalidBuffer { .. })
        ));

        let mut config = EngineConfig::default();
        config.poll_interval_ms = 0;
        assert_eq!(
            config.validate(&symbols(&["INFY"])),
            Err(ConfigError::InvalidPollInterval)
        );
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("breakoutbot-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "poll_interval_ms = 250\n[risk]\ncapital = 50000.0\n[strategy]\nname = \"ORB_CLOSE\"\n",
        )
        .unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.risk.capital, 50_000.0);
        assert_eq!(config.risk.risk_fraction, 0.01);
        assert_eq!(config.strategy.name, "ORB_CLOSE");
        assert_eq!(config.session.start, "09:30");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = EngineConfig::load(Some(Path::new("/nonexistent/breakoutbot.toml")));
        assert!(matches!(result, Err(ConfigError::Source(_))));
    }
}
