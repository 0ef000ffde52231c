use super::{opening_window, LevelBuffers, LevelCalculator};
use crate::error::LevelError;
use crate::models::{BreakoutLevels, Candle};

/// Opening range breakout on closing prices
///
/// Same shape as [`super::OpeningRangeBreakout`] but the range is taken
/// from the closes of the first `n` candles, which ignores wicks.
#[derive(Debug, Clone)]
pub struct ClosingRangeBreakout {
    candles: usize,
    buffers: LevelBuffers,
}

impl ClosingRangeBreakout {
    pub fn new(candles: usize, buffers: LevelBuffers) -> Self {
        Self { candles, buffers }
    }
}

impl LevelCalculator for ClosingRangeBreakout {
    fn compute_levels(
        &self,
        symbol: &str,
        candles: &[Candle],
    ) -> Result<BreakoutLevels, LevelError> {
        let window = opening_window(candles, self.candles)?;

        let (high, low) = window
            .iter()
            .fold((f64::MIN, f64::MAX), |(hi, lo), c| (hi.max(c.close), lo.min(c.close)));

        self.buffers.apply(symbol, high, low)
    }

    fn name(&self) -> &str {
        "ClosingRangeBreakout"
    }

    fn min_candles_required(&self) -> usize {
        self.candles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::candles;

    #[test]
    fn test_uses_closes_not_wicks() {
        let strategy = ClosingRangeBreakout::new(3, LevelBuffers { entry: 0.0, stop: 0.0 });
        // closes are the bar midpoints: 102.5, 102.0, 101.0
        let bars = candles(&[(110.0, 95.0), (108.0, 96.0), (105.0, 97.0)]);

        let levels = strategy.compute_levels("X", &bars).unwrap();
        assert_eq!(levels.trigger_price, 102.5);
        assert_eq!(levels.stop_price, 101.0);
    }

    #[test]
    fn test_flat_closes_are_invalid_without_buffers() {
        let strategy = ClosingRangeBreakout::new(2, LevelBuffers { entry: 0.0, stop: 0.0 });
        let bars = candles(&[(101.0, 99.0), (102.0, 98.0)]);

        assert!(matches!(
            strategy.compute_levels("X", &bars),
            Err(LevelError::InvalidLevels { .. })
        ));
    }

    #[test]
    fn test_requires_sufficient_data() {
        let strategy = ClosingRangeBreakout::new(3, LevelBuffers::default());
        assert_eq!(
            strategy.compute_levels("X", &candles(&[(101.0, 99.0)])),
            Err(LevelError::InsufficientData { needed: 3, got: 1 })
        );
    }
}
