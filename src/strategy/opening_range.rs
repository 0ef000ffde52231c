use super::{opening_window, LevelBuffers, LevelCalculator};
use crate::error::LevelError;
use crate::models::{BreakoutLevels, Candle};

/// Opening range breakout
///
/// Trigger is the highest high of the first `n` session candles plus the
/// entry buffer; stop is the lowest low of those candles minus the stop
/// buffer. With 5-minute bars and `n = 3` this is the classic 15-minute
/// opening range.
#[derive(Debug, Clone)]
pub struct OpeningRangeBreakout {
    candles: usize,
    buffers: LevelBuffers,
}

impl OpeningRangeBreakout {
    pub fn new(candles: usize, buffers: LevelBuffers) -> Self {
        Self { candles, buffers }
    }
}

impl Default for OpeningRangeBreakout {
    fn default() -> Self {
        Self::new(3, LevelBuffers::default())
    }
}

impl LevelCalculator for OpeningRangeBreakout {
    fn compute_levels(
        &self,
        symbol: &str,
        candles: &[Candle],
    ) -> Result<BreakoutLevels, LevelError> {
        let window = opening_window(candles, self.candles)?;

        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);

        self.buffers.apply(symbol, high, low)
    }

    fn name(&self) -> &str {
        "OpeningRangeBreakout"
    }

    fn min_candles_required(&self) -> usize {
        self.candles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::candles;

    fn buffered(entry: f64, stop: f64) -> OpeningRangeBreakout {
        OpeningRangeBreakout::new(3, LevelBuffers { entry, stop })
    }

    #[test]
    fn test_requires_sufficient_data() {
        let strategy = OpeningRangeBreakout::default();
        let result = strategy.compute_levels("X", &candles(&[(110.0, 95.0), (108.0, 96.0)]));

        assert_eq!(
            result,
            Err(LevelError::InsufficientData { needed: 3, got: 2 })
        );
        assert!(strategy
            .compute_levels("X", &[])
            .unwrap_err()
            .to_string()
            .contains("insufficient data"));
    }

    #[test]
    fn test_levels_from_opening_range() {
        let strategy = buffered(0.001, 0.001);
        let bars = candles(&[(110.0, 95.0), (108.0, 96.0), (105.0, 97.0)]);

        let levels = strategy.compute_levels("X", &bars).unwrap();

        assert_eq!(levels.symbol, "X");
        assert!((levels.trigger_price - 110.11).abs() < 1e-9);
        assert!((levels.stop_price - 94.905).abs() < 1e-9);
    }

    #[test]
    fn test_only_first_candles_count() {
        let strategy = buffered(0.0, 0.0);
        // Later candles break far outside the opening range
        let bars = candles(&[
            (101.0, 99.0),
            (102.0, 98.0),
            (100.5, 99.5),
            (150.0, 50.0),
        ]);

        let levels = strategy.compute_levels("X", &bars).unwrap();
        assert_eq!(levels.trigger_price, 102.0);
        assert_eq!(levels.stop_price, 98.0);
    }

    #[test]
    fn test_trigger_above_stop_for_any_real_range() {
        let strategy = OpeningRangeBreakout::default();

        for base in [0.5, 10.0, 250.0, 4_000.0] {
            for width in [0.001, 0.01, 0.2] {
                let bars = candles(&[
                    (base * (1.0 + width), base),
                    (base, base * (1.0 - width)),
                    (base * (1.0 + width / 2.0), base * (1.0 - width / 2.0)),
                ]);
                let levels = strategy.compute_levels("X", &bars).unwrap();
                assert!(levels.trigger_price > levels.stop_price);
            }
        }
    }

    #[test]
    fn test_min_candles_required() {
        let strategy = OpeningRangeBreakout::new(6, LevelBuffers::default());
        assert_eq!(strategy.min_candles_required(), 6);
        assert_eq!(strategy.window(), 6);
        assert_eq!(strategy.name(), "OpeningRangeBreakout");
    }
}
