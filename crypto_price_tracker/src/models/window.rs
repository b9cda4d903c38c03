//! The calendar range a single run reports on.

use chrono::{Days, NaiveDate};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("Window start {start} is after its end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("Invalid input: {}", message)]
    InvalidInput { message: String },
}

/// Inclusive `[start, end]` range of days whose rows a run may append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The last `days` days, ending with `end`.
    pub fn trailing(end: NaiveDate, days: u32) -> Result<Self, WindowError> {
        if days == 0 {
            return Err(WindowError::InvalidInput {
                message: "days to fetch must be at least 1".into(),
            });
        }
        let start = end
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| WindowError::InvalidInput {
                message: format!("{days} days before {end} is out of range"),
            })?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Name of the per-run delta report: `<start>` or `<start>_<end>`.
    pub fn label(&self) -> String {
        let mut label = self.start.format("%Y-%m-%d").to_string();
        if self.start != self.end {
            label.push('_');
            label.push_str(&self.end.format("%Y-%m-%d").to_string());
        }
        label
    }
}
