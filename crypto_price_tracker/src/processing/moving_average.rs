//! Causal trailing average over a daily series.
//!
//! [`MovingAverageProcessor::process`] walks a newest-first series from its
//! oldest day forwards, keeps the last `window_size` valid closes in a
//! [`MovingAverage`] ring buffer and emits one [`EnrichedRecord`] per day.
//! A day's average only ever depends on that day and the days before it.
//!
//! Closes of zero or below are missing data: they neither enter the buffer
//! nor count towards the history needed before an average is reported.

use std::collections::VecDeque;

use tracing::debug;

use crate::{
    models::{quote::DailyQuote, record::EnrichedRecord},
    rates::{RateConverter, RateError},
};

/// Days in the trailing average.
pub const DEFAULT_WINDOW_SIZE: usize = 14;

/// Threshold the tracker has always used. See [`AverageThreshold::Strict`].
pub const DEFAULT_THRESHOLD: AverageThreshold = AverageThreshold::Strict;

/// When a day has accumulated enough valid closes to report an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum AverageThreshold {
    /// More than `window_size` valid closes. The first average appears one
    /// day after the window is first full; existing reports were built this
    /// way.
    #[default]
    Strict,
    /// At least `window_size` valid closes: the first full window reports.
    Inclusive,
}

impl AverageThreshold {
    pub fn is_ready(self, valid_closes: usize, window_size: usize) -> bool {
        match self {
            AverageThreshold::Strict => valid_closes > window_size,
            AverageThreshold::Inclusive => valid_closes >= window_size,
        }
    }

    /// Leading days to fetch so the first day of a report window can
    /// already carry an average (assuming no missing closes).
    pub fn lookback_days(self, window_size: usize) -> u32 {
        let days = match self {
            AverageThreshold::Strict => window_size,
            AverageThreshold::Inclusive => window_size.saturating_sub(1),
        };
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

/// Fixed-capacity ring buffer with a running sum.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl MovingAverage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            if let Some(evicted) = self.values.pop_front() {
                self.sum -= evicted;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    /// Mean of the buffered values, `None` while empty.
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.values.len() as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct MovingAverageProcessor {
    window_size: usize,
    threshold: AverageThreshold,
}

impl MovingAverageProcessor {
    pub fn new(window_size: usize, threshold: AverageThreshold) -> Self {
        Self {
            window_size: window_size.max(1),
            threshold,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn threshold(&self) -> AverageThreshold {
        self.threshold
    }

    /// Enriches a newest-first `series`, returning records oldest first.
    ///
    /// Every input day yields exactly one record, with or without an average.
    /// The only failure is a rate lookup that cannot be resolved.
    pub async fn process(
        &self,
        series: &[DailyQuote],
        rates: &mut RateConverter,
    ) -> Result<Vec<EnrichedRecord>, RateError> {
        let mut average = MovingAverage::new(self.window_size);
        let mut valid_closes = 0usize;
        let mut records = Vec::with_capacity(series.len());

        for quote in series.iter().rev() {
            let rate = rates.rate_for(quote.date).await?;

            if quote.has_valid_close() {
                average.push(quote.close);
                valid_closes += 1;
            }

            let moving_average = if self.threshold.is_ready(valid_closes, self.window_size) {
                average.average()
            } else {
                None
            };

            debug!(
                date = %quote.date,
                open = quote.open,
                close = quote.close,
                rate,
                average = ?moving_average,
                "processed day"
            );

            records.push(EnrichedRecord::new(quote.clone(), moving_average, rate));
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};

    use super::*;
    use crate::rates::{RateLookup, RateSource};

    struct FlatRate(f64);

    #[async_trait]
    impl RateSource for FlatRate {
        async fn rate_on(&self, _date: NaiveDate) -> Result<RateLookup, RateError> {
            Ok(RateLookup::Available(self.0))
        }
    }

    fn converter() -> RateConverter {
        RateConverter::new(Box::new(FlatRate(2.0)), 20)
    }

    /// Builds a newest-first series from closes given oldest first.
    fn series(closes: &[f64]) -> Vec<DailyQuote> {
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| DailyQuote {
                date: first.checked_add_days(Days::new(i as u64)).unwrap(),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 0.0,
                market_cap: 0,
            })
            .rev()
            .collect()
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut average = MovingAverage::new(3);
        assert_eq!(average.average(), None);
        for value in [1.0, 2.0, 3.0, 4.0] {
            average.push(value);
        }
        assert_eq!(average.len(), 3);
        assert_eq!(average.average(), Some(3.0));
    }

    #[test]
    fn thresholds_differ_by_one_day() {
        assert!(!AverageThreshold::Strict.is_ready(14, 14));
        assert!(AverageThreshold::Strict.is_ready(15, 14));
        assert!(AverageThreshold::Inclusive.is_ready(14, 14));
        assert_eq!(AverageThreshold::Strict.lookback_days(14), 14);
        assert_eq!(AverageThreshold::Inclusive.lookback_days(14), 13);
        assert_eq!(DEFAULT_THRESHOLD, AverageThreshold::Strict);
    }

    #[tokio::test]
    async fn missing_closes_are_skipped_and_strict_threshold_applies() {
        let processor = MovingAverageProcessor::new(2, AverageThreshold::Strict);
        let records = processor
            .process(&series(&[0.0, 10.0, 20.0, 0.0, 30.0]), &mut converter())
            .await
            .unwrap();

        let averages: Vec<Option<f64>> = records.iter().map(|r| r.moving_average).collect();
        assert_eq!(averages, vec![None, None, None, None, Some(25.0)]);
    }

    #[tokio::test]
    async fn inclusive_threshold_reports_first_full_window() {
        let processor = MovingAverageProcessor::new(2, AverageThreshold::Inclusive);
        let records = processor
            .process(&series(&[0.0, 10.0, 20.0, 0.0, 30.0]), &mut converter())
            .await
            .unwrap();

        let averages: Vec<Option<f64>> = records.iter().map(|r| r.moving_average).collect();
        assert_eq!(averages, vec![None, None, Some(15.0), Some(15.0), Some(25.0)]);
    }

    #[tokio::test]
    async fn first_average_is_mean_of_prior_window() {
        let closes = [4.0, 8.0, 12.0, 16.0, 20.0, 24.0];
        let processor = MovingAverageProcessor::new(4, AverageThreshold::Strict);
        let records = processor
            .process(&series(&closes), &mut converter())
            .await
            .unwrap();

        let first = records
            .iter()
            .position(|r| r.moving_average.is_some())
            .unwrap();
        // Strict: the fifth valid close is the first to report.
        assert_eq!(first, 4);
        assert_eq!(records[first].moving_average, Some((8.0 + 12.0 + 16.0 + 20.0) / 4.0));
    }

    #[tokio::test]
    async fn records_are_oldest_first_with_converted_average() {
        let processor = MovingAverageProcessor::new(2, AverageThreshold::Strict);
        let input = series(&[1.0, 2.0, 3.0]);
        let records = processor.process(&input, &mut converter()).await.unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.windows(2).all(|w| w[0].date() < w[1].date()));
        assert_eq!(records[2].conversion_rate, 2.0);
        assert_eq!(records[2].converted_daily_average, 6.0);
    }
}
