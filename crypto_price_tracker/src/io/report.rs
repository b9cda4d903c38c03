//! CSV workbook storage for the price report.
//!
//! A workbook is a directory; each currency owns one CSV sheet in it, named
//! after the currency. A sheet starts with a header row and then grows one row
//! per day, in ascending date order. Rows are flushed as they are written.

use std::{
    collections::HashSet,
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use snafu::{ResultExt, ensure};
use tracing::{debug, info};

use crate::{
    io::sink::{CsvSnafu, InvalidSheetNameSnafu, IoSnafu, ReportSheet, SinkError},
    models::{currency::Currency, record::EnrichedRecord, window::ReportWindow},
};

/// Default location of the primary report.
pub const PRIMARY_REPORT_DIR: &str = "Crypto-HistoricalPrice";

/// Written into every row so a row can be traced back to the build that made it.
pub const IMPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

const LOCAL_DATE_FORMAT: &str = "%d/%m/%y";

/// Header row of a sheet whose average spans `window_size` days.
pub fn header_row(window_size: usize) -> Vec<String> {
    [
        "Date",
        "Open",
        "High",
        "Low",
        "Close",
        "Volume",
        "Market Cap",
        "Daily Average",
    ]
    .into_iter()
    .map(String::from)
    .chain(std::iter::once(format!("{window_size} Days Average")))
    .chain(
        [
            "Year",
            "Month",
            "Day",
            "Average USD",
            "Dollar rate",
            "Local Date",
            "Average ILS",
            "Importer version",
        ]
        .into_iter()
        .map(String::from),
    )
    .collect()
}

/// Cells of the row describing `record`, in [`header_row`] order.
///
/// An unavailable average is written as `0`, like the sheets have always had it.
pub fn record_row(record: &EnrichedRecord) -> Vec<String> {
    let quote = &record.quote;
    let daily_average = quote.daily_average();

    vec![
        record.row_key(),
        quote.open.to_string(),
        quote.high.to_string(),
        quote.low.to_string(),
        quote.close.to_string(),
        quote.volume.to_string(),
        quote.market_cap.to_string(),
        daily_average.to_string(),
        record.moving_average.unwrap_or(0.0).to_string(),
        quote.date.format("%Y").to_string(),
        quote.date.format("%m").to_string(),
        quote.date.format("%d").to_string(),
        daily_average.to_string(),
        record.conversion_rate.to_string(),
        quote.date.format(LOCAL_DATE_FORMAT).to_string(),
        record.converted_daily_average.to_string(),
        IMPORTER_VERSION.to_string(),
    ]
}

/// File name of a currency's sheet. Path separators are not allowed.
fn sheet_file_name(name: &str) -> Result<String, SinkError> {
    let trimmed = name.trim();
    ensure!(
        !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed.contains(['/', '\\', '\0']),
        InvalidSheetNameSnafu { name }
    );
    Ok(format!("{trimmed}.csv"))
}

/// A report directory. Nothing is created on disk until a sheet is opened.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    root: PathBuf,
    window_size: usize,
}

impl CsvWorkbook {
    pub fn new(root: impl Into<PathBuf>, window_size: usize) -> Self {
        Self {
            root: root.into(),
            window_size,
        }
    }

    /// The delta workbook for `window`, a sibling of the primary report.
    pub fn delta_for(primary: &CsvWorkbook, window: &ReportWindow) -> Self {
        let parent = primary.root.parent().unwrap_or_else(|| Path::new(""));
        Self::new(parent.join(window.label()), primary.window_size)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens the sheet of `currency`, creating the directory and the header
    /// row on first use. An empty file left behind by an interrupted run gets
    /// its header too.
    pub fn sheet(&self, currency: &Currency) -> Result<CsvSheet, SinkError> {
        let path = self.root.join(sheet_file_name(&currency.name)?);

        let needs_header = fs::metadata(&path).map_or(true, |meta| meta.len() == 0);
        if needs_header {
            fs::create_dir_all(&self.root).context(IoSnafu { path: &self.root })?;
            let mut writer = csv::Writer::from_path(&path).context(CsvSnafu { path: &path })?;
            writer
                .write_record(header_row(self.window_size))
                .context(CsvSnafu { path: &path })?;
            writer.flush().context(IoSnafu { path: &path })?;
            info!(sheet = %currency.name, path = %path.display(), "created report sheet");
        }

        Ok(CsvSheet {
            name: currency.name.clone(),
            path,
        })
    }
}

#[derive(Debug)]
pub struct CsvSheet {
    name: String,
    path: PathBuf,
}

impl CsvSheet {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSheet for CsvSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn existing_keys(&self) -> Result<HashSet<String>, SinkError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .context(CsvSnafu { path: &self.path })?;

        let mut keys = HashSet::new();
        for row in reader.records() {
            let row = row.context(CsvSnafu { path: &self.path })?;
            if let Some(key) = row.get(0) {
                keys.insert(key.to_string());
            }
        }

        debug!(sheet = %self.name, rows = keys.len(), "indexed existing rows");
        Ok(keys)
    }

    fn append(&mut self, record: &EnrichedRecord) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .context(IoSnafu { path: &self.path })?;
        terminate_last_line(&mut file).context(IoSnafu { path: &self.path })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(record_row(record))
            .context(CsvSnafu { path: &self.path })?;
        writer.flush().context(IoSnafu { path: &self.path })?;
        Ok(())
    }
}

/// Writes a newline if the file's last line is unterminated, so the next
/// row starts on a line of its own.
fn terminate_last_line(file: &mut File) -> std::io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}
