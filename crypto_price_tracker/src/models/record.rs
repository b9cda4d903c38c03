use chrono::NaiveDate;

use crate::models::quote::DailyQuote;

/// Format of the row key, the first column of every report row.
pub const ROW_KEY_FORMAT: &str = "%Y-%m-%d";

/// Formats `date` the way the report stores it in its first column.
pub fn row_key(date: NaiveDate) -> String {
    date.format(ROW_KEY_FORMAT).to_string()
}

/// A [`DailyQuote`] with the analytics derived from it.
///
/// Built once per date by the
/// [`MovingAverageProcessor`](crate::processing::MovingAverageProcessor) and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub quote: DailyQuote,

    /// Trailing mean of valid closes, `None` until enough history exists.
    pub moving_average: Option<f64>,

    /// USD to ILS rate resolved for the quote's date.
    pub conversion_rate: f64,

    /// `daily_average * conversion_rate`.
    pub converted_daily_average: f64,
}

impl EnrichedRecord {
    pub fn new(quote: DailyQuote, moving_average: Option<f64>, conversion_rate: f64) -> Self {
        let converted_daily_average = quote.daily_average() * conversion_rate;
        Self {
            quote,
            moving_average,
            conversion_rate,
            converted_daily_average,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.quote.date
    }

    pub fn row_key(&self) -> String {
        row_key(self.quote.date)
    }
}
