use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{currency::Currency, window::ReportWindow};

/// Vendor-agnostic parameters for requesting a daily series.
///
/// This is the standard input for every
/// [`SeriesProvider`](crate::providers::SeriesProvider). The range already
/// includes the look-back days that only seed the moving average.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRequest {
    /// Display name, used for logging and error context.
    pub name: String,

    /// Vendor id of the currency (CoinMarketCap numeric id).
    pub vendor_id: String,

    /// First day requested, inclusive.
    pub start: NaiveDate,

    /// Last day requested, inclusive.
    pub end: NaiveDate,
}

impl SeriesRequest {
    /// Builds the request covering `window` plus `lookback_days` leading days.
    pub fn for_window(currency: &Currency, window: &ReportWindow, lookback_days: u32) -> Self {
        let start = window
            .start
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);

        Self {
            name: currency.name.clone(),
            vendor_id: currency.cmc_id.clone(),
            start,
            end: window.end,
        }
    }
}
