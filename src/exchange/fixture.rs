//! In-memory `MarketData` for tests.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::ExchangeError;
use crate::exchange::MarketData;
use crate::model::{Candle, TimeFrame};

#[derive(Debug, Clone, Default)]
pub struct FixtureMarket {
    /// Closes per timeframe; a missing timeframe makes the fetch fail.
    pub closes: HashMap<TimeFrame, Vec<f64>>,
    pub funding_rate: Option<f64>,
    pub open_interest: Option<f64>,
    pub open_interest_history: Option<Vec<f64>>,
    /// Delay applied before every fetch for this symbol.
    pub delay: Duration,
}

impl FixtureMarket {
    /// Every series present, rising closes on both timeframes.
    pub fn complete(len: usize) -> Self {
        let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
        Self {
            closes: HashMap::from([
                (TimeFrame::Min3, closes.clone()),
                (TimeFrame::Hour4, closes),
            ]),
            funding_rate: Some(0.0001),
            open_interest: Some(15.0),
            open_interest_history: Some(vec![10.0, 20.0, 30.0]),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
pub struct FixtureMarketData {
    markets: HashMap<String, FixtureMarket>,
}

impl FixtureMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market(mut self, symbol: &str, market: FixtureMarket) -> Self {
        self.markets.insert(symbol.to_owned(), market);
        self
    }

    fn market(&self, symbol: &str) -> Result<&FixtureMarket, Report<ExchangeError>> {
        self.markets.get(symbol).ok_or_else(|| {
            Report::new(ExchangeError::Request {
                endpoint: "fixture".into(),
            })
            .attach(format!("unknown symbol: {symbol}"))
        })
    }
}

fn missing(what: &str) -> Report<ExchangeError> {
    Report::new(ExchangeError::Request {
        endpoint: "fixture".into(),
    })
    .attach(format!("no {what} configured"))
}

fn candle(symbol: &str, timeframe: TimeFrame, i: usize, close: f64) -> Candle {
    Candle {
        symbol: symbol.to_owned(),
        timeframe,
        open_time: Utc.timestamp_millis_opt(1_704_067_200_000 + i as i64 * 60_000).unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10.0 + i as f64,
    }
}

impl MarketData for FixtureMarketData {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Candle>, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let market = self.market(&symbol)?;
            tokio::time::sleep(market.delay).await;
            let closes = market
                .closes
                .get(&timeframe)
                .ok_or_else(|| missing("candles"))?;
            let skip = closes.len().saturating_sub(limit);
            Ok(closes
                .iter()
                .enumerate()
                .skip(skip)
                .map(|(i, &c)| candle(&symbol, timeframe, i, c))
                .collect())
        })
    }

    fn fetch_funding_rate(&self, symbol: &str) -> BoxFuture<'_, Result<f64, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let market = self.market(&symbol)?;
            tokio::time::sleep(market.delay).await;
            market.funding_rate.ok_or_else(|| missing("funding rate"))
        })
    }

    fn fetch_open_interest(
        &self,
        symbol: &str,
    ) -> BoxFuture<'_, Result<f64, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let market = self.market(&symbol)?;
            tokio::time::sleep(market.delay).await;
            market.open_interest.ok_or_else(|| missing("open interest"))
        })
    }

    fn fetch_open_interest_history(
        &self,
        symbol: &str,
        _period: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<f64>, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let market = self.market(&symbol)?;
            tokio::time::sleep(market.delay).await;
            let history = market
                .open_interest_history
                .as_ref()
                .ok_or_else(|| missing("open interest history"))?;
            Ok(history[history.len().saturating_sub(limit)..].to_vec())
        })
    }
}
