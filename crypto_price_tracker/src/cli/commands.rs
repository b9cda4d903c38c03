use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::{
    io::report::PRIMARY_REPORT_DIR,
    processing::{AverageThreshold, DEFAULT_WINDOW_SIZE},
    rates::DEFAULT_RETRY_BUDGET,
};

/// Default number of trailing days reported when no start date is given.
pub const DEFAULT_DAYS_BACK: u32 = 15;

/// Fetch daily crypto prices, add a trailing average and the ILS rate, and
/// append the new days to the price report.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Currency list (JSON or TOML). Defaults to config.json next to the
    /// executable, then in the current directory.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Primary report directory
    #[arg(long, value_name = "DIR", default_value = PRIMARY_REPORT_DIR)]
    pub report: PathBuf,

    /// Days to report when no start date is given, ending at the end date
    #[arg(long, default_value_t = DEFAULT_DAYS_BACK)]
    pub days_back_to_fetch: u32,

    /// First day to report (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day to report (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Days in the trailing average
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window_size: usize,

    /// When the first average is reported
    #[arg(long, value_enum, default_value_t = AverageThreshold::Strict)]
    pub average_threshold: AverageThreshold,

    /// Days to walk back looking for a published exchange rate
    #[arg(long, default_value_t = DEFAULT_RETRY_BUDGET)]
    pub rate_retries: u32,

    /// Continue with the next currency after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Do not write the per-run delta report
    #[arg(long)]
    pub no_delta: bool,

    /// Priority OData root; forwarding is off without it
    #[arg(long, value_name = "URL")]
    pub priority_endpoint: Option<String>,

    /// Priority user, falls back to PRIORITY_USERNAME
    #[arg(long)]
    pub priority_username: Option<String>,

    /// Priority password, falls back to PRIORITY_PASSWORD
    #[arg(long)]
    pub priority_password: Option<String>,
}
