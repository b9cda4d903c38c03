//! Idempotent merge of enriched records into a report.
//!
//! The existing sheet is indexed once by row key. Records are checked
//! newest to oldest against that index (and against each other, so a date
//! appears once even if the batch repeats it), then the new ones are committed
//! oldest to newest. Re-running a merge with the same records appends nothing.
//!
//! Per new row the optional forwarder is called first, then the row goes to
//! the primary sheet and, when present, the delta sheet. A failed forward is
//! logged and counted; a failed write aborts the merge.

use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::{
    forward::Forwarder,
    io::sink::{ReportSheet, SinkError},
    models::{currency::Currency, record::EnrichedRecord},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MergeError {
    #[snafu(display("Failed to read sheet {sheet}: {source}"))]
    Index {
        sheet: String,
        #[snafu(backtrace)]
        source: SinkError,
    },

    #[snafu(display("Failed to append {date} to sheet {sheet}: {source}"))]
    Persist {
        sheet: String,
        date: String,
        #[snafu(backtrace)]
        source: SinkError,
    },
}

/// Outcome of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub appended: usize,
    pub skipped: usize,
    pub forward_failures: usize,
}

pub struct ReportMerger<'a> {
    forwarder: Option<&'a (dyn Forwarder + Send + Sync)>,
}

impl<'a> ReportMerger<'a> {
    pub fn new(forwarder: Option<&'a (dyn Forwarder + Send + Sync)>) -> Self {
        Self { forwarder }
    }

    /// Appends the records of `records` whose date is not yet in `primary`.
    ///
    /// `records` may come in either date order; rows are always appended in
    /// ascending date order.
    pub async fn merge(
        &self,
        currency: &Currency,
        records: &[EnrichedRecord],
        primary: &mut dyn ReportSheet,
        mut delta: Option<&mut dyn ReportSheet>,
    ) -> Result<MergeSummary, MergeError> {
        let mut summary = MergeSummary::default();

        let mut known = primary
            .existing_keys()
            .context(IndexSnafu { sheet: primary.name() })?;

        let mut ordered: Vec<&EnrichedRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.date());

        let mut pending = Vec::new();
        for record in ordered.into_iter().rev() {
            if known.insert(record.row_key()) {
                pending.push(record);
            } else {
                debug!(currency = %currency.name, date = %record.date(), "skipping existing row");
                summary.skipped += 1;
            }
        }

        for record in pending.into_iter().rev() {
            let date = record.row_key();

            if let Some(forwarder) = self.forwarder {
                if let Err(err) = forwarder
                    .forward(currency, record.converted_daily_average, record.date())
                    .await
                {
                    warn!(currency = %currency.name, %date, error = %err, "forwarding failed");
                    summary.forward_failures += 1;
                }
            }

            primary.append(record).context(PersistSnafu {
                sheet: primary.name(),
                date: &date,
            })?;

            if let Some(sheet) = delta.as_deref_mut() {
                sheet.append(record).context(PersistSnafu {
                    sheet: sheet.name(),
                    date: &date,
                })?;
            }

            info!(currency = %currency.name, %date, "appended row");
            summary.appended += 1;
        }

        Ok(summary)
    }
}
