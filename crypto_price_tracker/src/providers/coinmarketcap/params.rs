use crate::{
    models::request_params::SeriesRequest,
    providers::{ProviderError, ValidationSnafu},
};

/// Quote currency requested from CoinMarketCap; the response is keyed by it.
pub const CONVERT: &str = "USD";

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Rejects requests CoinMarketCap cannot answer.
pub fn validate_request(request: &SeriesRequest) -> Result<(), ProviderError> {
    if request.vendor_id.trim().is_empty() {
        return ValidationSnafu {
            message: format!("{} has no CoinMarketCap id", request.name),
        }
        .fail();
    }
    if request.start > request.end {
        return ValidationSnafu {
            message: format!("start {} is after end {}", request.start, request.end),
        }
        .fail();
    }
    Ok(())
}

/// Builds the query string for the `ohlcv/historical` endpoint.
pub fn construct_params(request: &SeriesRequest) -> Vec<(String, String)> {
    vec![
        ("id".to_string(), request.vendor_id.trim().to_string()),
        ("convert".to_string(), CONVERT.to_string()),
        (
            "time_start".to_string(),
            request.start.format(QUERY_DATE_FORMAT).to_string(),
        ),
        (
            "time_end".to_string(),
            request.end.format(QUERY_DATE_FORMAT).to_string(),
        ),
        ("interval".to_string(), "daily".to_string()),
    ]
}
