//! Bank of Israel representative-rate client.
//!
//! The bank answers `GET currency.xml?curr=01&rdate=YYYYMMDD` with
//!
//! ```xml
//! <CURRENCIES>
//!   <LAST_UPDATE>2024-01-02</LAST_UPDATE>
//!   <CURRENCY>
//!     <NAME>Dollar</NAME>
//!     <UNIT>1</UNIT>
//!     <CURRENCYCODE>USD</CURRENCYCODE>
//!     <RATE>3.640</RATE>
//!   </CURRENCY>
//! </CURRENCIES>
//! ```
//!
//! and with an error document (or an empty rate) for days it published
//! nothing, which we report as [`RateLookup::Unavailable`].

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::Deserialize;
use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::rates::{
    ClientBuildSnafu, RateError, RateLookup, RateSource, TransportSnafu, UnitMismatchSnafu,
};

pub const BASE_URL: &str = "https://www.boi.org.il/currency.xml";

/// The bank's code for the US dollar.
pub const USD: &str = "01";

const QUERY_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Deserialize, Debug)]
struct RateDocument {
    #[serde(rename = "CURRENCY", default)]
    currencies: Vec<CurrencyEntry>,
}

#[derive(Deserialize, Debug)]
struct CurrencyEntry {
    #[serde(rename = "UNIT", default)]
    unit: u32,
    #[serde(rename = "RATE", default)]
    rate: f64,
}

/// Interprets one `currency.xml` answer for `date`.
pub(crate) fn parse_rate_document(body: &str, date: NaiveDate) -> Result<RateLookup, RateError> {
    let document: RateDocument = match quick_xml::de::from_str(body) {
        Ok(document) => document,
        Err(err) => {
            debug!(%date, error = %err, "rate document not understood");
            return Ok(RateLookup::Unavailable);
        }
    };

    let Some(entry) = document.currencies.into_iter().next() else {
        return Ok(RateLookup::Unavailable);
    };

    ensure!(entry.unit <= 1, UnitMismatchSnafu { date, unit: entry.unit });

    if entry.rate == 0.0 {
        Ok(RateLookup::Unavailable)
    } else {
        Ok(RateLookup::Available(entry.rate))
    }
}

pub struct BankOfIsraelSource {
    client: Client,
    base_url: String,
    currency_code: String,
    limiter: DefaultDirectRateLimiter,
}

impl BankOfIsraelSource {
    /// Creates a USD source against the bank's public endpoint.
    pub fn new() -> Result<Self, RateError> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, RateError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            currency_code: USD.to_string(),
            limiter: RateLimiter::direct(Quota::per_second(nonzero!(5u32))),
        })
    }
}

#[async_trait]
impl RateSource for BankOfIsraelSource {
    async fn rate_on(&self, date: NaiveDate) -> Result<RateLookup, RateError> {
        self.limiter.until_ready().await;

        let rdate = date.format(QUERY_DATE_FORMAT).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("curr", self.currency_code.as_str()), ("rdate", rdate.as_str())])
            .send()
            .await
            .context(TransportSnafu { date })?;

        if !response.status().is_success() {
            debug!(%date, status = %response.status(), "rate source answered with an error status");
            return Ok(RateLookup::Unavailable);
        }

        let body = response.text().await.context(TransportSnafu { date })?;
        parse_rate_document(&body, date)
    }
}
