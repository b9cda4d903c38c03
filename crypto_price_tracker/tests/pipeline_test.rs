use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use crypto_price_tracker::{
    config::RunSettings,
    forward::{ForwardError, Forwarder, RejectedSnafu},
    models::{
        currency::Currency, quote::DailyQuote, request_params::SeriesRequest,
        window::ReportWindow,
    },
    pipeline::{Pipeline, PipelineError},
    processing::AverageThreshold,
    providers::{ProviderError, SeriesProvider, ValidationSnafu},
    rates::{RateError, RateLookup, RateSource},
};
use tempfile::TempDir;

/// Serves one close per day from 2024-01-01 on, oldest first, for every
/// currency except those listed as failing.
struct FakeMarket {
    days: u32,
    failing: HashSet<String>,
    requests: Arc<Mutex<Vec<SeriesRequest>>>,
}

impl FakeMarket {
    fn new(days: u32) -> Self {
        Self {
            days,
            failing: HashSet::new(),
            requests: Arc::default(),
        }
    }
}

#[async_trait]
impl SeriesProvider for FakeMarket {
    async fn fetch_series(&self, request: &SeriesRequest) -> Result<Vec<DailyQuote>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.name) {
            return ValidationSnafu {
                message: "unknown id",
            }
            .fail();
        }

        Ok((0..self.days)
            .map(|i| {
                let close = f64::from(i + 1);
                DailyQuote {
                    date: day(1).checked_add_days(Days::new(u64::from(i))).unwrap(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 100.0,
                    market_cap: 1_000,
                }
            })
            .filter(|q| request.start <= q.date && q.date <= request.end)
            .collect())
    }
}

/// 3.5 on weekdays, nothing on weekends; counts calls.
struct FakeBank {
    calls: Arc<AtomicUsize>,
    missing: Option<NaiveDate>,
}

#[async_trait]
impl RateSource for FakeBank {
    async fn rate_on(&self, date: NaiveDate) -> Result<RateLookup, RateError> {
        use chrono::Datelike;

        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.missing.is_some_and(|m| date <= m) {
            return Ok(RateLookup::Unavailable);
        }
        Ok(match date.weekday() {
            chrono::Weekday::Sat | chrono::Weekday::Sun => RateLookup::Unavailable,
            _ => RateLookup::Available(3.5),
        })
    }
}

#[derive(Default)]
struct RejectingForwarder {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Forwarder for RejectingForwarder {
    async fn forward(&self, _: &Currency, _: f64, _: NaiveDate) -> Result<(), ForwardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        RejectedSnafu {
            status: 500u16,
            message: "down",
        }
        .fail()
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn currency(name: &str) -> Currency {
    Currency {
        name: name.into(),
        symbol: name.to_uppercase(),
        cmc: name.to_lowercase(),
        cmc_id: "1".into(),
    }
}

fn bank() -> Box<FakeBank> {
    Box::new(FakeBank {
        calls: Arc::default(),
        missing: None,
    })
}

fn settings(root: &Path, start: u32, end: u32) -> RunSettings {
    let mut settings = RunSettings::new(ReportWindow::new(day(start), day(end)).unwrap());
    settings.window_size = 3;
    settings.report_dir = root.join("Crypto-HistoricalPrice");
    settings
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn writes_window_rows_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), 10, 12);
    let btc = vec![currency("Bitcoin")];

    let market = FakeMarket::new(20);
    let requests = market.requests.clone();
    let mut pipeline = Pipeline::new(&settings, Box::new(market), bank());
    let summary = pipeline.run(&btc).await.unwrap();

    assert_eq!(summary.appended(), 3);
    // Strict threshold with window 3 asks for 3 extra days.
    assert_eq!(requests.lock().unwrap()[0].start, day(7));

    let sheet = dir.path().join("Crypto-HistoricalPrice").join("Bitcoin.csv");
    let rows = read_rows(&sheet);
    let dates: Vec<_> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(dates, ["2024-01-10", "2024-01-11", "2024-01-12"]);
    // Closes 7..=12; on the 10th the window holds 8, 9, 10.
    assert_eq!(rows[0][8], "9");
    // The 10th is a Wednesday with its own rate.
    assert_eq!(rows[0][13], "3.5");

    let delta = dir.path().join("2024-01-10_2024-01-12").join("Bitcoin.csv");
    assert_eq!(read_rows(&delta).len(), 3);

    let mut again = Pipeline::new(&settings, Box::new(FakeMarket::new(20)), bank());
    let summary = again.run(&btc).await.unwrap();
    assert_eq!(summary.appended(), 0);
    assert_eq!(summary.merged["Bitcoin"].skipped, 3);
    assert_eq!(read_rows(&sheet).len(), 3);
}

#[tokio::test]
async fn rate_cache_is_shared_across_currencies() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path(), 10, 12);
    settings.write_delta = false;

    let calls = Arc::new(AtomicUsize::new(0));
    let source = FakeBank {
        calls: calls.clone(),
        missing: None,
    };
    let mut pipeline = Pipeline::new(&settings, Box::new(FakeMarket::new(20)), Box::new(source));

    pipeline
        .run(&[currency("Bitcoin"), currency("Ethereum")])
        .await
        .unwrap();

    // The 7th is a Sunday and walks back through the 6th to the 5th; the
    // 8th to the 12th are weekdays. The second currency is all cache hits.
    assert_eq!(calls.load(Ordering::SeqCst), 8);
    assert_eq!(pipeline.rates().cache().len(), 6);
    assert!(!dir.path().join("2024-01-10_2024-01-12").exists());
}

#[tokio::test]
async fn short_series_leaves_report_untouched() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), 1, 2);

    let mut pipeline = Pipeline::new(&settings, Box::new(FakeMarket::new(2)), bank());
    let err = pipeline.run(&[currency("Bitcoin")]).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch {
            source: ProviderError::InsufficientData { .. },
            ..
        }
    ));
    assert!(!dir.path().join("Crypto-HistoricalPrice").exists());
}

#[tokio::test]
async fn failure_aborts_by_default_and_is_isolated_with_keep_going() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path(), 10, 12);
    let currencies = [currency("Broken"), currency("Bitcoin")];

    let mut market = FakeMarket::new(20);
    market.failing.insert("Broken".into());
    let mut pipeline = Pipeline::new(&settings, Box::new(market), bank());
    assert!(pipeline.run(&currencies).await.is_err());
    assert!(!dir.path().join("Crypto-HistoricalPrice").exists());

    settings.keep_going = true;
    let mut market = FakeMarket::new(20);
    market.failing.insert("Broken".into());
    let mut pipeline = Pipeline::new(&settings, Box::new(market), bank());
    let summary = pipeline.run(&currencies).await.unwrap();

    assert!(summary.has_failures());
    assert!(summary.failed.contains_key("Broken"));
    assert_eq!(summary.merged["Bitcoin"].appended, 3);
}

#[tokio::test]
async fn rate_exhaustion_ends_the_run_even_with_keep_going() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path(), 10, 12);
    settings.keep_going = true;
    settings.rate_retries = 5;

    let source = FakeBank {
        calls: Arc::default(),
        missing: Some(day(31)),
    };
    let mut pipeline = Pipeline::new(&settings, Box::new(FakeMarket::new(20)), Box::new(source));
    let err = pipeline
        .run(&[currency("Bitcoin"), currency("Ethereum")])
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err,
        PipelineError::Rate {
            source: RateError::Exhausted { attempts: 5, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn forwarding_failures_are_counted_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path(), 10, 12);
    settings.threshold = AverageThreshold::Inclusive;

    let forwarder = RejectingForwarder::default();
    let calls = forwarder.calls.clone();
    let mut pipeline = Pipeline::new(&settings, Box::new(FakeMarket::new(20)), bank())
        .with_forwarder(Box::new(forwarder));

    let summary = pipeline.run(&[currency("Bitcoin")]).await.unwrap();

    assert_eq!(summary.merged["Bitcoin"].appended, 3);
    assert_eq!(summary.merged["Bitcoin"].forward_failures, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn sheet_header_names_the_average_span() {
    let dir = TempDir::new().unwrap();
    let workbook = crypto_price_tracker::io::report::CsvWorkbook::new(dir.path(), 3);
    let sheet = workbook.sheet(&currency("Bitcoin")).unwrap();

    let header = fs::read_to_string(sheet.path()).unwrap();
    assert!(header.starts_with(
        "Date,Open,High,Low,Close,Volume,Market Cap,Daily Average,3 Days Average,Year"
    ));
    assert!(read_rows(sheet.path()).is_empty());
}
