use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{quote::DailyQuote, request_params::SeriesRequest},
    providers::{
        ApiSnafu, ClientBuildSnafu, DecodeSnafu, ProviderError, ProviderInitError, ReqwestSnafu,
        SeriesProvider,
        coinmarketcap::{
            params::{construct_params, validate_request},
            response::CmcResponse,
        },
    },
};

pub const BASE_URL: &str = "https://web-api.coinmarketcap.com/v1/cryptocurrency/ohlcv/historical";

pub struct CoinMarketCapProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl CoinMarketCapProvider {
    /// Creates a provider talking to the public CoinMarketCap web API.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_base_url(BASE_URL)
    }

    /// Creates a provider for a different endpoint, e.g. a local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            limiter: RateLimiter::direct(Quota::per_second(nonzero!(2u32))),
        })
    }
}

#[async_trait]
impl SeriesProvider for CoinMarketCapProvider {
    async fn fetch_series(&self, request: &SeriesRequest) -> Result<Vec<DailyQuote>, ProviderError> {
        validate_request(request)?;

        self.limiter.until_ready().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(&construct_params(request))
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        let body = response.text().await.context(ReqwestSnafu)?;
        let parsed: CmcResponse = serde_json::from_str(&body).context(DecodeSnafu)?;

        debug!(
            currency = %request.name,
            points = parsed.data.quotes.len(),
            "received daily series"
        );

        Ok(parsed.data.quotes.into_iter().map(DailyQuote::from).collect())
    }
}
