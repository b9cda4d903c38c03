//! Priority ERP `LOADCURRENCY_SUBFORM` client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::info;

use crate::{
    forward::{ClientBuildSnafu, ForwardError, Forwarder, RejectedSnafu, ReqwestSnafu},
    models::currency::Currency,
};

/// Basic-auth credentials for the Priority REST API.
#[derive(Debug)]
pub struct PriorityCredentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Serialize, Debug)]
struct LoadCurrencyBody {
    #[serde(rename = "EXCHANGE")]
    exchange: f64,
    #[serde(rename = "CURDATE")]
    currency_date: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    #[serde(rename = "FORM", default)]
    form: Option<ErrorForm>,
}

#[derive(Deserialize, Debug)]
struct ErrorForm {
    #[serde(rename = "InterfaceErrors", default)]
    interface_errors: Option<InterfaceErrors>,
}

#[derive(Deserialize, Debug)]
struct InterfaceErrors {
    #[serde(default)]
    text: Option<String>,
}

/// Pulls `FORM.InterfaceErrors.text` out of an error response, if present.
pub(crate) fn interface_error_text(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()?
        .form?
        .interface_errors?
        .text
}

pub struct PriorityClient {
    client: Client,
    endpoint: String,
    credentials: PriorityCredentials,
}

impl PriorityClient {
    /// `endpoint` is the environment's OData root (test or production).
    pub fn new(
        endpoint: impl Into<String>,
        credentials: PriorityCredentials,
    ) -> Result<Self, ForwardError> {
        let client = Client::builder().build().context(ClientBuildSnafu)?;
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            endpoint,
            credentials,
        })
    }

    fn load_currency_url(&self, symbol: &str) -> String {
        format!(
            "{}/CURRENCIES('{}')/LOADCURRENCY_SUBFORM",
            self.endpoint, symbol
        )
    }
}

#[async_trait]
impl Forwarder for PriorityClient {
    async fn forward(
        &self,
        currency: &Currency,
        exchange_rate: f64,
        date: NaiveDate,
    ) -> Result<(), ForwardError> {
        let body = LoadCurrencyBody {
            exchange: exchange_rate,
            currency_date: date.and_time(chrono::NaiveTime::MIN).and_utc(),
        };

        let response = self
            .client
            .post(self.load_currency_url(&currency.symbol))
            .basic_auth(
                &self.credentials.username,
                Some(self.credentials.password.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if status == StatusCode::CREATED {
            info!(currency = %currency.name, %date, exchange_rate, "forwarded rate to Priority");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = interface_error_text(&text).unwrap_or(text);
        RejectedSnafu {
            status: status.as_u16(),
            message,
        }
        .fail()
    }
}
