//! Daily USD→ILS exchange-rate lookup.
//!
//! [`RateConverter`] answers "what rate applies to this day" through a
//! read-through [`ExchangeRateCache`] in front of a [`RateSource`]. Days the
//! source has no rate for (weekends, bank holidays) resolve to the nearest
//! earlier published rate, walking back at most `retry_budget` days.
//!
//! The resolved rate is memoised under the day that was *asked for*, so every
//! later lookup of that day within the run is a cache hit and returns the same
//! value, no matter how far back the source had to be searched.

pub mod boi;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use snafu::{Backtrace, Snafu};
use tracing::{debug, warn};

/// Number of consecutive days the converter may search backwards.
pub const DEFAULT_RETRY_BUDGET: u32 = 20;

/// What a [`RateSource`] knows about one specific day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLookup {
    Available(f64),
    /// No rate was published for that day.
    Unavailable,
}

/// A remote source of daily rates.
#[async_trait]
pub trait RateSource {
    /// Looks up the rate published for exactly `date`.
    ///
    /// Days without a rate are `Ok(RateLookup::Unavailable)`; errors are
    /// reserved for failures that walking back cannot fix.
    async fn rate_on(&self, date: NaiveDate) -> Result<RateLookup, RateError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RateError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Network failure talking to the rate source.
    #[snafu(display("Rate request for {date} failed: {source}"))]
    Transport {
        date: NaiveDate,
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The source quoted the rate per more than one unit of currency.
    #[snafu(display("Unexpected unit {unit} in rate for {date}, expected 1"))]
    UnitMismatch {
        date: NaiveDate,
        unit: u32,
        backtrace: Backtrace,
    },

    /// No rate within `attempts` days on or before `date`.
    #[snafu(display("No exchange rate found within {attempts} days on or before {date}"))]
    Exhausted {
        date: NaiveDate,
        attempts: u32,
        backtrace: Backtrace,
    },
}

impl RateError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RateError::Exhausted { .. })
    }
}

/// Rates resolved during one run, keyed by the requested day.
///
/// Grows monotonically; entries are never evicted or overwritten.
#[derive(Debug, Default)]
pub struct ExchangeRateCache {
    rates: HashMap<NaiveDate, f64>,
}

impl ExchangeRateCache {
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.rates.get(&date).copied()
    }

    fn insert(&mut self, date: NaiveDate, rate: f64) {
        self.rates.entry(date).or_insert(rate);
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Read-through, walk-back rate lookup. Owns the run's [`ExchangeRateCache`].
pub struct RateConverter {
    source: Box<dyn RateSource + Send + Sync>,
    cache: ExchangeRateCache,
    retry_budget: u32,
}

impl RateConverter {
    pub fn new(source: Box<dyn RateSource + Send + Sync>, retry_budget: u32) -> Self {
        Self {
            source,
            cache: ExchangeRateCache::default(),
            retry_budget,
        }
    }

    pub fn cache(&self) -> &ExchangeRateCache {
        &self.cache
    }

    /// Returns the rate for `date`, hitting the source only on a cache miss.
    pub async fn rate_for(&mut self, date: NaiveDate) -> Result<f64, RateError> {
        if let Some(rate) = self.cache.get(date) {
            debug!(%date, rate, "exchange rate cache hit");
            return Ok(rate);
        }

        let rate = self.resolve(date).await?;
        self.cache.insert(date, rate);
        Ok(rate)
    }

    async fn resolve(&self, requested: NaiveDate) -> Result<f64, RateError> {
        let mut date = requested;

        for _ in 0..self.retry_budget {
            match self.source.rate_on(date).await? {
                RateLookup::Available(rate) if rate > 0.0 => {
                    if date != requested {
                        warn!(%requested, resolved = %date, rate, "no rate published, using earlier rate");
                    }
                    return Ok(rate);
                }
                _ => {
                    debug!(%date, "no rate published, trying previous day");
                    match date.pred_opt() {
                        Some(previous) => date = previous,
                        None => break,
                    }
                }
            }
        }

        ExhaustedSnafu {
            date: requested,
            attempts: self.retry_budget,
        }
        .fail()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    /// Serves rates from a table and records every day it was asked about.
    #[derive(Clone, Default)]
    struct TableSource {
        rates: HashMap<NaiveDate, f64>,
        calls: Arc<AtomicUsize>,
        asked: Arc<Mutex<Vec<NaiveDate>>>,
    }

    #[async_trait]
    impl RateSource for TableSource {
        async fn rate_on(&self, date: NaiveDate) -> Result<RateLookup, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.asked.lock().unwrap().push(date);
            Ok(match self.rates.get(&date) {
                Some(rate) => RateLookup::Available(*rate),
                None => RateLookup::Unavailable,
            })
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn cache_hit_performs_no_io() {
        let mut source = TableSource::default();
        source.rates.insert(day(10), 3.7);
        let calls = source.calls.clone();
        let mut converter = RateConverter::new(Box::new(source), DEFAULT_RETRY_BUDGET);

        assert_eq!(converter.rate_for(day(10)).await.unwrap(), 3.7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(converter.rate_for(day(10)).await.unwrap(), 3.7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn walk_back_is_memoised_under_requested_date() {
        let mut source = TableSource::default();
        source.rates.insert(day(5), 3.6);
        let calls = source.calls.clone();
        let asked = source.asked.clone();
        let mut converter = RateConverter::new(Box::new(source), DEFAULT_RETRY_BUDGET);

        assert_eq!(converter.rate_for(day(7)).await.unwrap(), 3.6);
        assert_eq!(*asked.lock().unwrap(), vec![day(7), day(6), day(5)]);

        assert_eq!(converter.cache().get(day(7)), Some(3.6));
        assert_eq!(converter.cache().get(day(6)), None);
        assert_eq!(converter.cache().len(), 1);

        assert_eq!(converter.rate_for(day(7)).await.unwrap(), 3.6);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_rate_counts_as_unavailable() {
        let mut source = TableSource::default();
        source.rates.insert(day(9), 0.0);
        source.rates.insert(day(8), 3.5);
        let mut converter = RateConverter::new(Box::new(source), DEFAULT_RETRY_BUDGET);

        assert_eq!(converter.rate_for(day(9)).await.unwrap(), 3.5);
    }

    #[tokio::test]
    async fn exhausted_budget_is_an_error_not_zero() {
        let source = TableSource::default();
        let calls = source.calls.clone();
        let mut converter = RateConverter::new(Box::new(source), DEFAULT_RETRY_BUDGET);

        let err = converter.rate_for(day(31)).await.unwrap_err();

        assert!(err.is_exhausted());
        match err {
            RateError::Exhausted { date, attempts, .. } => {
                assert_eq!(date, day(31));
                assert_eq!(attempts, 20);
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 20);
        assert!(converter.cache().is_empty());
    }

    #[tokio::test]
    async fn rate_on_last_budgeted_day_is_found() {
        let mut source = TableSource::default();
        source.rates.insert(day(11), 3.9);
        let mut converter = RateConverter::new(Box::new(source), 20);

        // 30 -> 11 is 19 steps back, the 20th lookup.
        assert_eq!(converter.rate_for(day(30)).await.unwrap(), 3.9);
    }

    struct FailingSource;

    #[async_trait]
    impl RateSource for FailingSource {
        async fn rate_on(&self, date: NaiveDate) -> Result<RateLookup, RateError> {
            UnitMismatchSnafu { date, unit: 100u32 }.fail()
        }
    }

    #[tokio::test]
    async fn source_errors_are_not_retried() {
        let mut converter = RateConverter::new(Box::new(FailingSource), DEFAULT_RETRY_BUDGET);
        let err = converter.rate_for(day(2)).await.unwrap_err();
        assert!(matches!(err, RateError::UnitMismatch { unit: 100, .. }));
    }
}
