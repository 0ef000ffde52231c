use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::MarketDataPort;
use crate::error::MarketDataError;
use crate::execution::{Clock, TradingSession};
use crate::models::Candle;

const CANDLE_MINUTES: i64 = 5;
const STEP_SECONDS: i64 = 15;
const VOLATILITY: f64 = 0.0015; // ±0.15% per step

struct Walk {
    rng: StdRng,
    price: f64,
    date: Option<NaiveDate>,
    /// Time of the last step taken today
    stepped_to: Option<DateTime<Utc>>,
    candles: Vec<Candle>,
}

/// Random-walk market for paper runs
///
/// The walk moves one step every 15 seconds of session time and is caught
/// up to the clock on every request, so prices and candles do not depend on
/// how often or in what order they are asked for. Steps are aggregated into
/// 5-minute candles aligned to the session open; only completed candles are
/// served.
pub struct SimulatedMarket {
    clock: Arc<dyn Clock>,
    session: TradingSession,
    seed: u64,
    walks: Mutex<HashMap<String, Walk>>,
}

impl SimulatedMarket {
    pub fn new(clock: Arc<dyn Clock>, session: TradingSession, seed: u64) -> Self {
        Self {
            clock,
            session,
            seed,
            walks: Mutex::new(HashMap::new()),
        }
    }

    fn new_walk(&self, symbol: &str) -> Walk {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(self.seed ^ hasher.finish());
        let price = rng.gen_range(50.0..1500.0);

        Walk {
            rng,
            price,
            date: None,
            stepped_to: None,
            candles: Vec::new(),
        }
    }

    /// Run `f` on the symbol's walk after catching it up to the clock
    fn with_walk<T>(&self, symbol: &str, f: impl FnOnce(&Walk) -> T) -> T {
        let now = self.clock.now();
        let mut walks = self.walks.lock().unwrap_or_else(|e| e.into_inner());
        let walk = walks
            .entry(symbol.to_string())
            .or_insert_with(|| self.new_walk(symbol));
        self.catch_up(walk, now);
        f(walk)
    }

    fn catch_up(&self, walk: &mut Walk, now: DateTime<Utc>) {
        let today = self.session.date_of(now);
        if walk.date != Some(today) {
            walk.date = Some(today);
            walk.stepped_to = None;
            walk.candles.clear();
        }

        let open = self.session.at(today, self.session.start());
        let close = self.session.at(today, self.session.end());
        let until = now.min(close);
        let step = Duration::seconds(STEP_SECONDS);

        let mut next = walk.stepped_to.map_or(open, |last| last + step);
        while next <= until {
            self.step(walk, next);
            walk.stepped_to = Some(next);
            next += step;
        }
    }

    /// Start of the 5-minute bar containing `at`
    fn bar_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let open = self.session.at(self.session.date_of(at), self.session.start());
        let bars = (at - open).num_minutes() / CANDLE_MINUTES;
        open + Duration::minutes(bars * CANDLE_MINUTES)
    }

    fn step(&self, walk: &mut Walk, at: DateTime<Utc>) {
        let change = walk.rng.gen_range(-VOLATILITY..VOLATILITY);
        walk.price = (walk.price * (1.0 + change)).max(0.01);
        let price = walk.price;

        let start = self.bar_start(at);
        match walk.candles.last_mut() {
            Some(bar) if bar.timestamp == start => {
                bar.high = bar.high.max(price);
                bar.low = bar.low.min(price);
                bar.close = price;
                bar.volume += 1.0;
            }
            _ => walk.candles.push(Candle {
                timestamp: start,
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 1.0,
            }),
        }
    }
}

#[async_trait]
impl MarketDataPort for SimulatedMarket {
    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        Ok(self.with_walk(symbol, |walk| walk.price))
    }

    async fn recent_candles(
        &self,
        symbol: &str,
        window: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let now = self.clock.now();
        Ok(self.with_walk(symbol, |walk| {
            walk.candles
                .iter()
                .filter(|c| c.timestamp + Duration::minutes(CANDLE_MINUTES) <= now)
                .take(window)
                .cloned()
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::execution::ManualClock;
    use chrono::TimeZone;

    fn market(clock: Arc<ManualClock>) -> SimulatedMarket {
        let session = TradingSession::from_config(&SessionConfig::default()).unwrap();
        SimulatedMarket::new(clock, session, 42)
    }

    // 09:30 IST on 2024-03-04
    fn session_open() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 4, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_walk_is_deterministic_per_seed() {
        let clock = Arc::new(ManualClock::new(session_open()));
        let a = market(clock.clone());
        let b = market(clock.clone());

        for _ in 0..5 {
            clock.advance(Duration::minutes(1));
            assert_eq!(
                a.latest_price("INFY").await.unwrap(),
                b.latest_price("INFY").await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_price_moves_with_the_clock_not_the_caller() {
        let clock = Arc::new(ManualClock::new(session_open()));
        let market = market(clock.clone());

        let first = market.latest_price("INFY").await.unwrap();
        assert_eq!(market.latest_price("INFY").await.unwrap(), first);

        clock.advance(Duration::minutes(1));
        assert_ne!(market.latest_price("INFY").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_candles_form_without_price_requests() {
        let clock = Arc::new(ManualClock::new(session_open()));
        let market = market(clock.clone());

        assert!(market.recent_candles("INFY", 3).await.unwrap().is_empty());

        clock.advance(Duration::minutes(16));
        let candles = market.recent_candles("INFY", 10).await.unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].timestamp, session_open());
        assert_eq!(candles[1].timestamp, session_open() + Duration::minutes(5));
        for candle in &candles {
            assert!(candle.high >= candle.low);
            assert!(candle.high >= candle.close && candle.close >= candle.low);
            assert_eq!(candle.volume, 20.0);
        }

        assert_eq!(market.recent_candles("INFY", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_candles_before_the_open() {
        let clock = Arc::new(ManualClock::new(session_open() - Duration::hours(2)));
        let market = market(clock.clone());

        for _ in 0..10 {
            market.latest_price("INFY").await.unwrap();
            clock.advance(Duration::minutes(5));
        }
        // 08:20 IST
        assert!(market.recent_candles("INFY", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_day_starts_fresh_candles() {
        let clock = Arc::new(ManualClock::new(session_open() + Duration::minutes(30)));
        let market = market(clock.clone());
        assert_eq!(market.recent_candles("INFY", 10).await.unwrap().len(), 6);

        clock.set(session_open() + Duration::days(1) + Duration::minutes(5));
        let candles = market.recent_candles("INFY", 10).await.unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, session_open() + Duration::days(1));
    }
}
