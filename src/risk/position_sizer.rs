use crate::config::RiskConfig;

/// Share of the raw size actually traded; the rest absorbs slippage and fees
pub const SLIPPAGE_RESERVE: f64 = 0.95;

/// Fixed-fractional position sizing
///
/// Risks `capital * risk_fraction` between entry and stop. A non-positive
/// risk per share means the levels are broken, so the answer is 0 (do not
/// trade) rather than an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    capital: f64,
    risk_fraction: f64,
}

impl PositionSizer {
    pub fn new(capital: f64, risk_fraction: f64) -> Self {
        Self {
            capital,
            risk_fraction,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(config.capital, config.risk_fraction)
    }

    /// Quantity to buy at `entry_price` with a stop at `stop_price`
    pub fn size(&self, entry_price: f64, stop_price: f64) -> u64 {
        size(self.capital, self.risk_fraction, entry_price, stop_price)
    }

    /// Amount of capital at risk per trade
    pub fn risk_amount(&self) -> f64 {
        self.capital * self.risk_fraction
    }
}

/// floor(0.95 * capital * risk_fraction / (entry - stop)), or 0
pub fn size(capital: f64, risk_fraction: f64, entry_price: f64, stop_price: f64) -> u64 {
    let risk_amount = capital * risk_fraction;
    let risk_per_share = entry_price - stop_price;

    if !risk_amount.is_finite() || !risk_per_share.is_finite() || risk_per_share <= 0.0 {
        return 0;
    }

    let raw = SLIPPAGE_RESERVE * risk_amount / risk_per_share;
    if raw <= 0.0 {
        return 0;
    }

    // `as` saturates for values beyond u64::MAX
    raw.floor() as u64
}
