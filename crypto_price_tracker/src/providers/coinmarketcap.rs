//! CoinMarketCap historical OHLCV client.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::CoinMarketCapProvider;
