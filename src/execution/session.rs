use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::config::SessionConfig;
use crate::error::ConfigError;

/// Exchange trading window with its forced-exit cutoff
///
/// All comparisons happen in exchange-local time; the window bounds are
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingSession {
    start: NaiveTime,
    end: NaiveTime,
    cutoff: NaiveTime,
    offset: FixedOffset,
}

fn parse_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ConfigError::MalformedTime(value.to_string()))
}

impl TradingSession {
    pub fn new(
        start: NaiveTime,
        end: NaiveTime,
        cutoff: NaiveTime,
        offset: FixedOffset,
    ) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::EmptySessionWindow {
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
        }
        if cutoff <= start || cutoff > end {
            return Err(ConfigError::CutoffOutsideWindow {
                cutoff: cutoff.format("%H:%M").to_string(),
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
        }

        Ok(Self {
            start,
            end,
            cutoff,
            offset,
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        let start = parse_time(&config.start)?;
        let end = parse_time(&config.end)?;
        let cutoff = match &config.exit_cutoff {
            Some(cutoff) => parse_time(cutoff)?,
            None => end,
        };
        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidUtcOffset(config.utc_offset_minutes))?;

        Self::new(start, end, cutoff, offset)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    /// Exchange-local calendar date of `at`
    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// True inside the trading window
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        let time = at.with_timezone(&self.offset).time();
        self.start <= time && time <= self.end
    }

    /// True while new entries may be taken: inside the window and before
    /// the day's exit cutoff
    pub fn accepts_entries(&self, at: DateTime<Utc>) -> bool {
        self.is_open(at) && at < self.cutoff_for(at)
    }

    /// UTC instant of `time` on the exchange-local `date`
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = date.and_time(time);
        (local - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }

    /// Forced-exit instant for a position opened at `opened_at`
    pub fn cutoff_for(&self, opened_at: DateTime<Utc>) -> DateTime<Utc> {
        self.at(self.date_of(opened_at), self.cutoff)
    }
}
