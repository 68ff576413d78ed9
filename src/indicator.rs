pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;

use crate::model::Candle;

/// Indicator output aligned 1:1 with its input; `None` marks the warm-up
/// window where the value is undefined.
pub type Series = Vec<Option<f64>>;

/// A technical analysis indicator that operates on a slice of candles.
///
/// Candles must be in ascending chronological order (oldest first). Short
/// input never fails: the output always has one entry per candle.
pub trait Indicator: Send + Sync {
    /// Display name including parameters (e.g. "rsi(14)").
    fn name(&self) -> String;

    /// Minimum number of candles required to produce at least one defined value.
    fn required_candles(&self) -> usize;

    fn calculate(&self, candles: &[Candle]) -> Series;
}

/// Extract close prices from a slice of candles.
pub fn close_prices(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Extract volumes from a slice of candles.
pub fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}

/// The last `n` points of a series (all of it when shorter).
pub fn tail(series: &[Option<f64>], n: usize) -> Series {
    series[series.len().saturating_sub(n)..].to_vec()
}

/// The most recent point of a series, `None` if empty or undefined.
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

#[cfg(test)]
pub(crate) fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    use crate::model::TimeFrame;
    use chrono::Utc;

    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle {
            symbol: "TESTUSDT".into(),
            timeframe: TimeFrame::Min1,
            open_time: Utc::now() + chrono::Duration::minutes(i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 1.0,
        })
        .collect()
}
