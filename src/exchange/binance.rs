use std::num::NonZeroU32;

use chrono::DateTime;
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::exchange::MarketData;
use crate::model::{Candle, TimeFrame};

const KLINES_PATH: &str = "/api/v3/klines";
const PREMIUM_INDEX_PATH: &str = "/fapi/v1/premiumIndex";
const OPEN_INTEREST_PATH: &str = "/fapi/v1/openInterest";
const OPEN_INTEREST_HIST_PATH: &str = "/futures/data/openInterestHist";
const MAX_CANDLES_PER_REQUEST: usize = 1000;
const MAX_OPEN_INTEREST_PER_REQUEST: usize = 500;

/// Binance spot klines plus USDT-margined futures statistics.
///
/// Spot and futures live on different hosts with separate weight budgets, so
/// each gets its own limiter.
pub struct BinanceMarketData {
    client: reqwest::Client,
    spot_base_url: String,
    futures_base_url: String,
    spot_limiter: DefaultDirectRateLimiter,
    futures_limiter: DefaultDirectRateLimiter,
}

impl BinanceMarketData {
    pub fn new(config: &ExchangeConfig) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(20u32));
        let quota = Quota::per_second(per_second);
        Self {
            client: reqwest::Client::new(),
            spot_base_url: config.spot_base_url.trim_end_matches('/').to_owned(),
            futures_base_url: config.futures_base_url.trim_end_matches('/').to_owned(),
            spot_limiter: RateLimiter::direct(quota),
            futures_limiter: RateLimiter::direct(quota),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        limiter: &DefaultDirectRateLimiter,
        base_url: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Report<ExchangeError>> {
        // Wait for rate limiter before making the request
        limiter.until_ready().await;

        let url = format!("{base_url}{path}");
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .change_context(ExchangeError::Request {
                endpoint: path.into(),
            })
            .attach_with(|| format!("params: {params:?}"))?;

        if !response.status().is_success() {
            return Err(Report::new(ExchangeError::Request {
                endpoint: path.into(),
            })
            .attach(format!("HTTP status: {}", response.status()))
            .attach(format!("params: {params:?}")));
        }

        response
            .json()
            .await
            .change_context(ExchangeError::ResponseParse {
                endpoint: path.into(),
            })
    }
}

impl MarketData for BinanceMarketData {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Candle>, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let limit_str = limit.min(MAX_CANDLES_PER_REQUEST).to_string();
            let params = [
                ("symbol", symbol.as_str()),
                ("interval", timeframe.binance_interval()),
                ("limit", limit_str.as_str()),
            ];

            let raw: Vec<BinanceKlineRow> = self
                .get_json(&self.spot_limiter, &self.spot_base_url, KLINES_PATH, &params)
                .await?;

            debug!(
                symbol = %symbol,
                timeframe = %timeframe,
                fetched = raw.len(),
                "binance candle fetch complete"
            );

            raw.into_iter()
                .map(|row| row.into_candle(&symbol, timeframe))
                .collect()
        })
    }

    fn fetch_funding_rate(&self, symbol: &str) -> BoxFuture<'_, Result<f64, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let params = [("symbol", symbol.as_str())];
            let index: BinancePremiumIndex = self
                .get_json(
                    &self.futures_limiter,
                    &self.futures_base_url,
                    PREMIUM_INDEX_PATH,
                    &params,
                )
                .await?;

            parse_f64(&index.last_funding_rate, PREMIUM_INDEX_PATH)
        })
    }

    fn fetch_open_interest(
        &self,
        symbol: &str,
    ) -> BoxFuture<'_, Result<f64, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let params = [("symbol", symbol.as_str())];
            let oi: BinanceOpenInterest = self
                .get_json(
                    &self.futures_limiter,
                    &self.futures_base_url,
                    OPEN_INTEREST_PATH,
                    &params,
                )
                .await?;

            parse_f64(&oi.open_interest, OPEN_INTEREST_PATH)
        })
    }

    fn fetch_open_interest_history(
        &self,
        symbol: &str,
        period: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<f64>, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let Some(period_str) = period.binance_open_interest_period() else {
                return Err(Report::new(ExchangeError::Request {
                    endpoint: OPEN_INTEREST_HIST_PATH.into(),
                })
                .attach(format!("unsupported period: {period}")));
            };

            let limit_str = limit.min(MAX_OPEN_INTEREST_PER_REQUEST).to_string();
            let params = [
                ("symbol", symbol.as_str()),
                ("period", period_str),
                ("limit", limit_str.as_str()),
            ];

            let rows: Vec<BinanceOpenInterestHistRow> = self
                .get_json(
                    &self.futures_limiter,
                    &self.futures_base_url,
                    OPEN_INTEREST_HIST_PATH,
                    &params,
                )
                .await?;

            debug!(
                symbol = %symbol,
                period = %period,
                fetched = rows.len(),
                "binance open interest history fetch complete"
            );

            rows.iter()
                .map(|row| parse_f64(&row.sum_open_interest, OPEN_INTEREST_HIST_PATH))
                .collect()
        })
    }
}

fn parse_f64(s: &str, endpoint: &str) -> Result<f64, Report<ExchangeError>> {
    s.parse::<f64>()
        .change_context(ExchangeError::ResponseParse {
            endpoint: endpoint.into(),
        })
        .attach_with(|| format!("value: {s:?}"))
}

// ── REST response types ───────────────────────────────────────────────────────

/// Binance kline row: 12-element array
/// [open_time, open, high, low, close, volume, close_time, ...]
#[derive(Debug, Deserialize)]
struct BinanceKlineRow(
    i64,                        // 0: open_time (ms)
    String,                     // 1: open
    String,                     // 2: high
    String,                     // 3: low
    String,                     // 4: close
    String,                     // 5: volume
    #[allow(dead_code)] i64,    // 6: close_time
    #[allow(dead_code)] String, // 7: quote asset volume
    #[allow(dead_code)] i64,    // 8: number of trades
    #[allow(dead_code)] String, // 9: taker buy base volume
    #[allow(dead_code)] String, // 10: taker buy quote volume
    #[allow(dead_code)] String, // 11: ignore
);

impl BinanceKlineRow {
    fn into_candle(
        self,
        symbol: &str,
        timeframe: TimeFrame,
    ) -> Result<Candle, Report<ExchangeError>> {
        let open_time = DateTime::from_timestamp_millis(self.0).ok_or_else(|| {
            Report::new(ExchangeError::ResponseParse {
                endpoint: KLINES_PATH.into(),
            })
            .attach(format!("open_time out of range: {}", self.0))
        })?;

        Ok(Candle {
            symbol: symbol.to_owned(),
            timeframe,
            open_time,
            open: parse_f64(&self.1, KLINES_PATH)?,
            high: parse_f64(&self.2, KLINES_PATH)?,
            low: parse_f64(&self.3, KLINES_PATH)?,
            close: parse_f64(&self.4, KLINES_PATH)?,
            volume: parse_f64(&self.5, KLINES_PATH)?,
        })
    }
}

/// `GET /fapi/v1/premiumIndex?symbol=...`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinancePremiumIndex {
    last_funding_rate: String,
}

/// `GET /fapi/v1/openInterest?symbol=...`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceOpenInterest {
    open_interest: String,
}

/// One row of `GET /futures/data/openInterestHist`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceOpenInterestHistRow {
    sum_open_interest: String,
}
