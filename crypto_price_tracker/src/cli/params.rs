use chrono::NaiveDate;
use secrecy::SecretString;
use shared_utils::env::{MissingEnvVarError, explicit_or_env};

use crate::{
    config::RunSettings,
    forward::priority::PriorityCredentials,
    models::window::{ReportWindow, WindowError},
};

use super::commands::Cli;

pub const PRIORITY_USERNAME_VAR: &str = "PRIORITY_USERNAME";
pub const PRIORITY_PASSWORD_VAR: &str = "PRIORITY_PASSWORD";

/// `[start, end]` when a start is given, otherwise the last `days_back` days
/// up to `end`. `end` defaults to `today`.
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    days_back: u32,
    today: NaiveDate,
) -> Result<ReportWindow, WindowError> {
    let end = end.unwrap_or(today);
    match start {
        Some(start) => ReportWindow::new(start, end),
        None => ReportWindow::trailing(end, days_back),
    }
}

/// Flags first, then the environment.
pub fn priority_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Result<PriorityCredentials, MissingEnvVarError> {
    let username = explicit_or_env(username, PRIORITY_USERNAME_VAR)?;
    let password = explicit_or_env(password, PRIORITY_PASSWORD_VAR)?;
    Ok(PriorityCredentials {
        username,
        password: SecretString::new(password.into()),
    })
}

impl Cli {
    pub fn run_settings(&self, today: NaiveDate) -> Result<RunSettings, WindowError> {
        if self.window_size == 0 {
            return Err(WindowError::InvalidInput {
                message: "window size must be at least 1".into(),
            });
        }
        if self.rate_retries == 0 {
            return Err(WindowError::InvalidInput {
                message: "rate retries must be at least 1".into(),
            });
        }

        let window = resolve_window(self.start_date, self.end_date, self.days_back_to_fetch, today)?;
        let mut settings = RunSettings::new(window);
        settings.window_size = self.window_size;
        settings.threshold = self.average_threshold;
        settings.rate_retries = self.rate_retries;
        settings.report_dir = self.report.clone();
        settings.write_delta = !self.no_delta;
        settings.keep_going = self.keep_going;
        Ok(settings)
    }
}
