use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::quote::DailyQuote;

#[derive(Deserialize, Debug)]
pub struct CmcResponse {
    pub data: CmcData,
}

#[derive(Deserialize, Debug)]
pub struct CmcData {
    #[serde(default)]
    pub quotes: Vec<CmcQuote>,
}

#[derive(Deserialize, Debug)]
pub struct CmcQuote {
    pub quote: CmcQuoteByCurrency,
}

#[derive(Deserialize, Debug)]
pub struct CmcQuoteByCurrency {
    #[serde(rename = "USD")]
    pub usd: CmcOhlcv,
}

#[derive(Deserialize, Debug)]
pub struct CmcOhlcv {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<CmcQuote> for DailyQuote {
    fn from(quote: CmcQuote) -> Self {
        let ohlcv = quote.quote.usd;
        DailyQuote {
            date: ohlcv.timestamp.date_naive(),
            open: ohlcv.open,
            high: ohlcv.high,
            low: ohlcv.low,
            close: ohlcv.close,
            volume: ohlcv.volume.unwrap_or_default(),
            market_cap: ohlcv.market_cap.unwrap_or_default() as i64,
        }
    }
}
