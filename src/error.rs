use thiserror::Error;

/// Level computation failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LevelError {
    #[error("insufficient data: {got} candles, need {needed}")]
    InsufficientData { needed: usize, got: usize },

    #[error("invalid levels: trigger {trigger:.4} must be above stop {stop:.4}")]
    InvalidLevels { trigger: f64, stop: f64 },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketDataError {
    #[error("data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("order rejected for {symbol}: {reason}")]
    OrderRejected { symbol: String, reason: String },
}

/// Invalid engine configuration. Fatal at startup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("risk fraction must be in (0, 1], got {0}")]
    InvalidRiskFraction(f64),

    #[error("capital must be positive, got {0}")]
    InvalidCapital(f64),

    #[error("symbol list is empty")]
    NoSymbols,

    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),

    #[error("symbol {0} listed more than once")]
    DuplicateSymbol(String),

    #[error("malformed time {0:?}, expected HH:MM")]
    MalformedTime(String),

    #[error("session window {start}-{end} is empty")]
    EmptySessionWindow { start: String, end: String },

    #[error("exit cutoff {cutoff} must fall within session {start}-{end}")]
    CutoffOutsideWindow {
        cutoff: String,
        start: String,
        end: String,
    },

    #[error("invalid UTC offset of {0} minutes")]
    InvalidUtcOffset(i32),

    #[error("{name} buffer must be in [0, 1), got {value}")]
    InvalidBuffer { name: &'static str, value: f64 },

    #[error("opening range needs at least one candle")]
    InvalidWindow,

    #[error("poll interval must be positive")]
    InvalidPollInterval,

    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),

    #[error("failed to load configuration: {0}")]
    Source(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Source(e.to_string())
    }
}

/// Recoverable failure of a single monitor tick
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    #[error(transparent)]
    Levels(#[from] LevelError),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchedulerError {
    #[error("engine already running")]
    AlreadyRunning,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
