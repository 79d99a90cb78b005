pub mod error;
pub mod http;

use crate::domain::contract::{PortfolioResponse, SpreadRequest, StockRecord};

pub use http::HttpOptimizerClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    StocksData,
    CalculateSpread,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::StocksData => "/stocks/GetAllStocksData",
            Self::CalculateSpread => "/stocks/CalculateSpreadStocks",
        }
    }
}

/// The external optimizer/data service.
#[async_trait::async_trait]
pub trait OptimizerClient: Send + Sync {
    async fn fetch_stocks(&self) -> anyhow::Result<Vec<StockRecord>>;

    async fn calculate_spread(&self, request: &SpreadRequest)
        -> anyhow::Result<PortfolioResponse>;
}
