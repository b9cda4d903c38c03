//! Best-effort forwarding of new daily rates to an accounting system.
//!
//! Forwarding is a side channel: the merge step logs a failed forward and
//! keeps going, the row is persisted either way.

pub mod priority;

use async_trait::async_trait;
use chrono::NaiveDate;
use snafu::{Backtrace, Snafu};

use crate::models::currency::Currency;

#[async_trait]
pub trait Forwarder {
    /// Pushes the ILS value of one unit of `currency` on `date`.
    async fn forward(
        &self,
        currency: &Currency,
        exchange_rate: f64,
        date: NaiveDate,
    ) -> Result<(), ForwardError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ForwardError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Forwarding request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The accounting system refused the record.
    #[snafu(display("Rejected with HTTP {status}: {message}"))]
    Rejected {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },
}
