use serde::{Deserialize, Serialize};

/// One tracked cryptocurrency, as listed in the configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Display name. Also names the currency's sheet in every report.
    pub name: String,

    /// Ticker symbol (e.g. `BTC`). The accounting system keys currencies by it.
    pub symbol: String,

    /// CoinMarketCap slug (e.g. `bitcoin`). Informational only.
    #[serde(default)]
    pub cmc: String,

    /// CoinMarketCap numeric id, sent as the `id` query parameter.
    pub cmc_id: String,
}
