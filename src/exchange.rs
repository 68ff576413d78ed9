pub mod binance;
#[cfg(test)]
pub mod fixture;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::ExchangeError;
use crate::model::{Candle, TimeFrame};

/// Read-only market data needed to build instrument snapshots.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn MarketData`).
pub trait MarketData: Send + Sync {
    /// Fetch up to `limit` candles, oldest first.
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Candle>, Report<ExchangeError>>>;

    /// Current perpetual funding rate as a decimal (0.0001 = 0.01%).
    fn fetch_funding_rate(&self, symbol: &str) -> BoxFuture<'_, Result<f64, Report<ExchangeError>>>;

    /// Latest open interest, in base-asset units.
    fn fetch_open_interest(&self, symbol: &str)
    -> BoxFuture<'_, Result<f64, Report<ExchangeError>>>;

    /// Open interest samples at `period` spacing, oldest first. May be empty.
    fn fetch_open_interest_history(
        &self,
        symbol: &str,
        period: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<f64>, Report<ExchangeError>>>;
}
