use std::sync::Arc;

use error_stack::{Report, ResultExt};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{ExchangeError, ReportError};
use crate::exchange::MarketData;
use crate::model::{TimeFrame, market_symbol};
use crate::snapshot::{InstrumentSnapshot, SnapshotInput};

/// What to fetch for each coin.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub quote_asset: String,
    pub intraday_timeframe: TimeFrame,
    pub intraday_limit: usize,
    pub longterm_timeframe: TimeFrame,
    pub longterm_limit: usize,
    pub open_interest_period: TimeFrame,
    pub open_interest_limit: usize,
}

impl ReportSettings {
    /// Settings from a validated config.
    pub fn from_config(config: &AppConfig) -> Self {
        let report = &config.report;
        Self {
            quote_asset: config.exchange.quote_asset.clone(),
            intraday_timeframe: report.intraday_timeframe,
            intraday_limit: report.intraday_limit,
            longterm_timeframe: report.longterm_timeframe,
            longterm_limit: report.longterm_limit,
            open_interest_period: report.open_interest_period,
            open_interest_limit: report.open_interest_limit,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Builds per-coin snapshots concurrently against one market-data source.
#[derive(Clone)]
pub struct ReportBuilder {
    source: Arc<dyn MarketData>,
    settings: ReportSettings,
}

impl ReportBuilder {
    pub fn new(source: Arc<dyn MarketData>, settings: ReportSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Snapshots for every coin that could be fetched, in request order.
    ///
    /// Coins whose snapshot fails are dropped. The only error is a pipeline
    /// task that panicked or was cancelled.
    pub async fn build_report(
        &self,
        coins: &[String],
    ) -> Result<Vec<InstrumentSnapshot>, Report<ReportError>> {
        info!(coins = coins.len(), "building report");

        let handles: Vec<_> = coins
            .iter()
            .map(|coin| {
                let builder = self.clone();
                let coin = coin.clone();
                tokio::spawn(async move { builder.fetch_snapshot(&coin).await })
            })
            .collect();

        // Awaited by index so the order mirrors `coins`, not completion order.
        let mut snapshots = Vec::with_capacity(handles.len());
        for (coin, handle) in coins.iter().zip(handles) {
            let snapshot = handle.await.change_context(ReportError::Task {
                coin: coin.clone(),
            })?;
            snapshots.extend(snapshot);
        }

        info!(
            requested = coins.len(),
            succeeded = snapshots.len(),
            "report complete"
        );
        Ok(snapshots)
    }

    /// Fetch every series for `coin` concurrently and build its snapshot.
    ///
    /// Each fetch fails on its own: optional series become `None`, and only a
    /// missing candle series fails the whole snapshot.
    pub async fn fetch_snapshot(&self, coin: &str) -> Option<InstrumentSnapshot> {
        let settings = &self.settings;
        let source = self.source.as_ref();
        let symbol = market_symbol(coin, &settings.quote_asset);

        let (intraday, longterm, funding_rate, open_interest_latest, open_interest_history) =
            tokio::join!(
                source.fetch_candles(&symbol, settings.intraday_timeframe, settings.intraday_limit),
                source.fetch_candles(&symbol, settings.longterm_timeframe, settings.longterm_limit),
                source.fetch_funding_rate(&symbol),
                source.fetch_open_interest(&symbol),
                source.fetch_open_interest_history(
                    &symbol,
                    settings.open_interest_period,
                    settings.open_interest_limit,
                ),
            );

        InstrumentSnapshot::build(SnapshotInput {
            coin: coin.to_owned(),
            intraday: settle(coin, "intraday candles", intraday),
            longterm: settle(coin, "long-term candles", longterm),
            funding_rate: settle(coin, "funding rate", funding_rate),
            open_interest_latest: settle(coin, "open interest", open_interest_latest),
            open_interest_history: settle(coin, "open interest history", open_interest_history),
        })
    }
}

fn settle<T>(coin: &str, what: &str, result: Result<T, Report<ExchangeError>>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(coin, error = ?e, "{what} fetch failed");
            None
        }
    }
}

/// Normalize a caller-supplied coin list: trimmed and uppercased, at least
/// one entry, no blanks.
pub fn validate_coins(coins: &[String]) -> Result<Vec<String>, Report<ReportError>> {
    if coins.is_empty() {
        return Err(Report::new(ReportError::InvalidRequest {
            reason: "coin list is empty".into(),
        }));
    }

    coins
        .iter()
        .map(|coin| {
            let coin = coin.trim();
            if coin.is_empty() {
                return Err(Report::new(ReportError::InvalidRequest {
                    reason: "coin names must not be blank".into(),
                }));
            }
            Ok(coin.to_uppercase())
        })
        .collect()
}
