//! Canonical in-memory representation of one day of market data.
//!
//! This struct is the standard output of every
//! [`SeriesProvider`](crate::providers::SeriesProvider), whatever the upstream
//! vendor looks like.

use chrono::NaiveDate;

/// A single daily OHLCV quote for one currency, priced in USD.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyQuote {
    /// Calendar day (UTC) the quote describes.
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price during the day.
    pub high: f64,

    /// Lowest price during the day.
    pub low: f64,

    /// Closing price. Zero or negative closes are treated as missing data.
    pub close: f64,

    /// Volume traded during the day.
    pub volume: f64,

    /// Market capitalisation at the close. Zero when the vendor omits it.
    pub market_cap: i64,
}

impl DailyQuote {
    /// Midpoint of open and close, the figure the report calls "Daily Average".
    pub fn daily_average(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    /// Whether the close carries a usable price.
    pub fn has_valid_close(&self) -> bool {
        self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_average_is_open_close_midpoint() {
        let quote = DailyQuote {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            open: 100.0,
            high: 130.0,
            low: 90.0,
            close: 120.0,
            volume: 1.0,
            market_cap: 0,
        };
        assert_eq!(quote.daily_average(), 110.0);
        assert!(quote.has_valid_close());
    }
}
