use std::{collections::HashSet, path::PathBuf};

use snafu::{Backtrace, Snafu};

use crate::models::record::EnrichedRecord;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// A file or directory of the report could not be read or written.
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// A sheet could not be parsed or a row could not be encoded.
    #[snafu(display("CSV error on {}: {source}", path.display()))]
    Csv {
        path: PathBuf,
        source: csv::Error,
        backtrace: Backtrace,
    },

    /// The currency name cannot be used as a sheet name.
    #[snafu(display("Invalid sheet name: {name:?}"))]
    InvalidSheetName { name: String, backtrace: Backtrace },
}

/// One currency's append-only table inside a report.
///
/// The first column of every row is the row key (the formatted date); a key
/// that is already present must never be appended again.
pub trait ReportSheet {
    /// Name of the sheet, for logging and error context.
    fn name(&self) -> &str;

    /// All row keys currently stored, header excluded.
    fn existing_keys(&self) -> Result<HashSet<String>, SinkError>;

    /// Appends `record` as the last row and makes it durable.
    fn append(&mut self, record: &EnrichedRecord) -> Result<(), SinkError>;
}
