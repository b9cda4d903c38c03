//! Provider abstraction for daily market-data sources.
//!
//! This module defines the [`SeriesProvider`] trait, a unified interface for
//! fetching a daily price series from any market-data vendor, and the
//! [`SeriesFetcher`] that enforces the series contract on top of it.
//!
//! Each concrete provider (such as [`coinmarketcap`]) handles vendor-specific
//! API logic. The fetcher then normalises whatever the vendor returned to
//! newest-first order without duplicate dates, and rejects series too short
//! for the moving average.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use crypto_price_tracker::models::{quote::DailyQuote, request_params::SeriesRequest};
//! use crypto_price_tracker::providers::{ProviderError, SeriesProvider};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl SeriesProvider for MyProvider {
//!     async fn fetch_series(
//!         &self,
//!         _request: &SeriesRequest,
//!     ) -> Result<Vec<DailyQuote>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod coinmarketcap;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu, ensure};
use tracing::debug;

use crate::models::{
    currency::Currency, quote::DailyQuote, request_params::SeriesRequest, window::ReportWindow,
};

/// Trait for fetching a daily series from a market-data vendor.
///
/// The trait is async and supports dynamic dispatch (`dyn SeriesProvider`) so
/// the pipeline can be handed any vendor, or a fake in tests.
#[async_trait]
pub trait SeriesProvider {
    /// Fetches the daily quotes covering `request.start..=request.end`.
    ///
    /// Order is whatever the vendor returns; [`SeriesFetcher`] normalises it.
    async fn fetch_series(&self, request: &SeriesRequest) -> Result<Vec<DailyQuote>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `SeriesProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with a non-success status.
    #[snafu(display("API error (HTTP {status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The response body did not match the expected payload.
    #[snafu(display("Malformed response payload: {source}"))]
    Decode {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The series is shorter than the moving-average window.
    #[snafu(display("Not enough data points for {name}: got {got}, need at least {required}"))]
    InsufficientData {
        name: String,
        got: usize,
        required: usize,
        backtrace: Backtrace,
    },
}

/// Fetches a currency's series through a [`SeriesProvider`] and checks it.
pub struct SeriesFetcher {
    provider: Box<dyn SeriesProvider + Send + Sync>,
    window_size: usize,
    lookback_days: u32,
}

impl SeriesFetcher {
    /// `lookback_days` extra leading days are requested before each report
    /// window so the average is seeded by its first reported day.
    pub fn new(
        provider: Box<dyn SeriesProvider + Send + Sync>,
        window_size: usize,
        lookback_days: u32,
    ) -> Self {
        Self {
            provider,
            window_size,
            lookback_days,
        }
    }

    /// Returns the series for `currency` over `window` plus look-back,
    /// newest first.
    ///
    /// Fails with [`ProviderError::InsufficientData`] when fewer than
    /// `window_size` distinct days come back.
    pub async fn fetch(
        &self,
        currency: &Currency,
        window: &ReportWindow,
    ) -> Result<Vec<DailyQuote>, ProviderError> {
        let request = SeriesRequest::for_window(currency, window, self.lookback_days);
        debug!(
            currency = %request.name,
            start = %request.start,
            end = %request.end,
            "requesting daily series"
        );

        let mut series = self.provider.fetch_series(&request).await?;
        normalize_newest_first(&mut series);

        ensure!(
            series.len() >= self.window_size,
            InsufficientDataSnafu {
                name: &request.name,
                got: series.len(),
                required: self.window_size,
            }
        );

        Ok(series)
    }
}

/// Sorts newest first and keeps the first occurrence of each date.
fn normalize_newest_first(series: &mut Vec<DailyQuote>) {
    series.sort_by(|a, b| b.date.cmp(&a.date));
    series.dedup_by_key(|quote| quote.date);
}
