use crate::config::Settings;
use crate::domain::contract::{
    validate_stock_records, PortfolioResponse, SpreadRequest, StockRecord,
};
use crate::optimizer::error::OptimizerDiagnosticsError;
use crate::optimizer::{Endpoint, OptimizerClient};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HttpOptimizerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retries: u32,
}

impl HttpOptimizerClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.optimizer_base_url(),
            settings.optimizer_api_key.clone(),
            Duration::from_secs(settings.optimizer_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            settings.optimizer_retries.unwrap_or(DEFAULT_RETRIES),
        )
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build optimizer http client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            retries: retries.max(1),
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint.path())
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn fetch_stocks_once(&self) -> Result<Vec<StockRecord>> {
        let endpoint = Endpoint::StocksData;
        let res = self
            .http
            .get(self.url(endpoint))
            .headers(self.headers()?)
            .send()
            .await
            .context("stocks data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read stocks data response")?;
        decode(endpoint, status, &text)
    }
}

#[async_trait::async_trait]
impl OptimizerClient for HttpOptimizerClient {
    async fn fetch_stocks(&self) -> Result<Vec<StockRecord>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_stocks_once().await {
                Ok(records) => {
                    let records = validate_stock_records(records);
                    tracing::debug!(count = records.len(), "fetched stock reference data");
                    return Ok(records);
                }
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        error = %err,
                        "stocks data fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn calculate_spread(&self, request: &SpreadRequest) -> Result<PortfolioResponse> {
        let endpoint = Endpoint::CalculateSpread;
        tracing::info!(
            portfolio_target = %request.portfolio_target,
            risk_percentage = request.risk_percentage,
            amount_of_stocks = request.amount_of_stocks,
            "submitting allocation request"
        );

        let res = self
            .http
            .post(self.url(endpoint))
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .context("allocation request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read allocation response")?;
        let parsed: PortfolioResponse = decode(endpoint, status, &text)?;
        parsed.validate()?;
        Ok(parsed)
    }
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, status: StatusCode, text: &str) -> Result<T> {
    if !status.is_success() {
        return Err(OptimizerDiagnosticsError {
            endpoint,
            stage: "http",
            status: Some(status.as_u16()),
            detail: format!("status={status}"),
            raw_body: Some(text.to_string()),
        }
        .into());
    }

    serde_json::from_str::<T>(text).map_err(|e| {
        OptimizerDiagnosticsError {
            endpoint,
            stage: "decode",
            status: Some(status.as_u16()),
            detail: e.to_string(),
            raw_body: Some(text.to_string()),
        }
        .into()
    })
}
