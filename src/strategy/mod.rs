// Breakout level strategies
pub mod closing_range;
pub mod opening_range;

use std::str::FromStr;
use std::sync::Arc;

use crate::config::StrategyConfig;
use crate::error::{ConfigError, LevelError};
use crate::models::{BreakoutLevels, Candle};

pub use closing_range::ClosingRangeBreakout;
pub use opening_range::OpeningRangeBreakout;

/// Base trait for all level strategies
pub trait LevelCalculator: Send + Sync {
    /// Derive trigger/stop levels from the session's candles, oldest first
    fn compute_levels(&self, symbol: &str, candles: &[Candle])
        -> Result<BreakoutLevels, LevelError>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles required for this strategy
    fn min_candles_required(&self) -> usize;

    /// How many candles to request from the market data source
    fn window(&self) -> usize {
        self.min_candles_required()
    }
}

/// Strategies selectable by name at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    OpeningRange,
    ClosingRange,
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ORB" | "OPENING_RANGE" => Ok(StrategyKind::OpeningRange),
            "ORB_CLOSE" | "CLOSING_RANGE" => Ok(StrategyKind::ClosingRange),
            _ => Err(ConfigError::UnknownStrategy(name.to_string())),
        }
    }
}

impl StrategyKind {
    pub fn build(self, config: &StrategyConfig) -> Arc<dyn LevelCalculator> {
        let buffers = LevelBuffers {
            entry: config.entry_buffer,
            stop: config.sl_buffer,
        };
        match self {
            StrategyKind::OpeningRange => {
                Arc::new(OpeningRangeBreakout::new(config.opening_candles, buffers))
            }
            StrategyKind::ClosingRange => {
                Arc::new(ClosingRangeBreakout::new(config.opening_candles, buffers))
            }
        }
    }
}

/// Resolve the configured strategy once, at startup
pub fn from_config(config: &StrategyConfig) -> Result<Arc<dyn LevelCalculator>, ConfigError> {
    let kind: StrategyKind = config.name.parse()?;
    Ok(kind.build(config))
}

/// Fractional buffers applied around the raw range to avoid noise triggers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelBuffers {
    pub entry: f64,
    pub stop: f64,
}

impl Default for LevelBuffers {
    fn default() -> Self {
        Self {
            entry: 0.0009,
            stop: 0.0009,
        }
    }
}

impl LevelBuffers {
    /// Turn a raw range into levels, enforcing trigger > stop
    pub(crate) fn apply(
        &self,
        symbol: &str,
        range_high: f64,
        range_low: f64,
    ) -> Result<BreakoutLevels, LevelError> {
        let trigger = range_high * (1.0 + self.entry);
        let stop = range_low * (1.0 - self.stop);

        if !(trigger.is_finite() && stop.is_finite()) || trigger <= stop {
            return Err(LevelError::InvalidLevels { trigger, stop });
        }

        Ok(BreakoutLevels {
            symbol: symbol.to_string(),
            trigger_price: trigger,
            stop_price: stop,
        })
    }
}

/// Take the first `n` candles or fail with `InsufficientData`
pub(crate) fn opening_window(candles: &[Candle], n: usize) -> Result<&[Candle], LevelError> {
    if candles.len() < n {
        return Err(LevelError::InsufficientData {
            needed: n,
            got: candles.len(),
        });
    }
    Ok(&candles[..n])
}
