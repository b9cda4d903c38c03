//! Per-currency orchestration: fetch, enrich, merge.
//!
//! Currencies are processed one after another against a single
//! [`RateConverter`], so the exchange-rate cache is shared by the whole run.
//! By default the first failure ends the run. With `keep_going` a failed
//! currency is recorded in the [`RunSummary`] and the next one is tried,
//! except for rate exhaustion, which always ends the run.

use indexmap::IndexMap;
use snafu::{ResultExt, Snafu};
use tracing::{error, info};

use crate::{
    config::RunSettings,
    forward::Forwarder,
    io::{
        merge::{MergeError, MergeSummary, ReportMerger},
        report::CsvWorkbook,
        sink::{ReportSheet, SinkError},
    },
    models::{currency::Currency, window::ReportWindow},
    processing::MovingAverageProcessor,
    providers::{ProviderError, SeriesFetcher, SeriesProvider},
    rates::{RateConverter, RateError, RateSource},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    #[snafu(display("Failed to fetch series for {currency}: {source}"))]
    Fetch {
        currency: String,
        #[snafu(backtrace)]
        source: ProviderError,
    },

    #[snafu(display("Failed to resolve exchange rate for {currency}: {source}"))]
    Rate {
        currency: String,
        #[snafu(backtrace)]
        source: RateError,
    },

    #[snafu(display("Failed to open report sheet for {currency}: {source}"))]
    Report {
        currency: String,
        #[snafu(backtrace)]
        source: SinkError,
    },

    #[snafu(display("Failed to merge {currency}: {source}"))]
    Merge {
        currency: String,
        #[snafu(backtrace)]
        source: MergeError,
    },
}

impl PipelineError {
    /// Whether the error must end the run even when failures are isolated.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Rate { source, .. } if source.is_exhausted())
    }
}

/// What happened to each currency, in processing order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub merged: IndexMap<String, MergeSummary>,
    pub failed: IndexMap<String, String>,
}

impl RunSummary {
    pub fn appended(&self) -> usize {
        self.merged.values().map(|s| s.appended).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct Pipeline {
    fetcher: SeriesFetcher,
    processor: MovingAverageProcessor,
    rates: RateConverter,
    window: ReportWindow,
    primary: CsvWorkbook,
    delta: Option<CsvWorkbook>,
    forwarder: Option<Box<dyn Forwarder + Send + Sync>>,
    keep_going: bool,
}

impl Pipeline {
    pub fn new(
        settings: &RunSettings,
        provider: Box<dyn SeriesProvider + Send + Sync>,
        rate_source: Box<dyn RateSource + Send + Sync>,
    ) -> Self {
        let lookback = settings.threshold.lookback_days(settings.window_size);
        let primary = CsvWorkbook::new(&settings.report_dir, settings.window_size);
        let delta = settings
            .write_delta
            .then(|| CsvWorkbook::delta_for(&primary, &settings.window));

        Self {
            fetcher: SeriesFetcher::new(provider, settings.window_size, lookback),
            processor: MovingAverageProcessor::new(settings.window_size, settings.threshold),
            rates: RateConverter::new(rate_source, settings.rate_retries),
            window: settings.window,
            primary,
            delta,
            forwarder: None,
            keep_going: settings.keep_going,
        }
    }

    pub fn with_forwarder(mut self, forwarder: Box<dyn Forwarder + Send + Sync>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn rates(&self) -> &RateConverter {
        &self.rates
    }

    pub async fn run(&mut self, currencies: &[Currency]) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();

        for currency in currencies {
            info!(currency = %currency.name, window = %self.window.label(), "processing currency");

            match self.process_currency(currency).await {
                Ok(merged) => {
                    info!(
                        currency = %currency.name,
                        appended = merged.appended,
                        skipped = merged.skipped,
                        forward_failures = merged.forward_failures,
                        "currency done"
                    );
                    summary.merged.insert(currency.name.clone(), merged);
                }
                Err(err) if self.keep_going && !err.is_fatal() => {
                    error!(currency = %currency.name, error = %err, "currency failed, continuing");
                    summary.failed.insert(currency.name.clone(), err.to_string());
                }
                Err(err) => return Err(err),
            }
        }

        Ok(summary)
    }

    async fn process_currency(&mut self, currency: &Currency) -> Result<MergeSummary, PipelineError> {
        let series = self
            .fetcher
            .fetch(currency, &self.window)
            .await
            .context(FetchSnafu { currency: &currency.name })?;

        let records = self
            .processor
            .process(&series, &mut self.rates)
            .await
            .context(RateSnafu { currency: &currency.name })?;

        let window = self.window;
        let reportable: Vec<_> = records
            .into_iter()
            .filter(|record| window.contains(record.date()))
            .collect();

        let mut primary = self
            .primary
            .sheet(currency)
            .context(ReportSnafu { currency: &currency.name })?;
        let mut delta = match &self.delta {
            Some(workbook) => Some(
                workbook
                    .sheet(currency)
                    .context(ReportSnafu { currency: &currency.name })?,
            ),
            None => None,
        };

        ReportMerger::new(self.forwarder.as_deref())
            .merge(
                currency,
                &reportable,
                &mut primary,
                delta.as_mut().map(|sheet| sheet as &mut dyn ReportSheet),
            )
            .await
            .context(MergeSnafu { currency: &currency.name })
    }
}
