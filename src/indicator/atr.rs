use std::num::NonZeroUsize;

use crate::indicator::{Indicator, Series};
use crate::model::Candle;

/// Average True Range with Wilder smoothing.
///
/// ```text
/// TR[0] = high[0] - low[0]
/// TR[i] = max(high - low, |high - close[i-1]|, |low - close[i-1]|)
/// ATR[period-1] = mean(TR[0..period])
/// ATR[i]        = (ATR[i-1] * (period - 1) + TR[i]) / period
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Atr {
    period: NonZeroUsize,
}

impl Atr {
    pub fn new(period: NonZeroUsize) -> Self {
        Self { period }
    }

    /// Calculate ATR from parallel high/low/close series. Series of unequal
    /// length are truncated to the shortest.
    pub fn calculate_hlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Series {
        let period = self.period.get();
        let period_f = period as f64;
        let tr = true_range(high, low, close);

        let mut results: Series = Vec::with_capacity(tr.len());
        let mut atr = 0.0;
        for (i, &range) in tr.iter().enumerate() {
            if i + 1 < period {
                results.push(None);
                continue;
            }
            atr = if i + 1 == period {
                tr[..period].iter().sum::<f64>() / period_f
            } else {
                (atr * (period_f - 1.0) + range) / period_f
            };
            results.push(Some(atr));
        }

        results
    }
}

fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let len = high.len().min(low.len()).min(close.len());
    (0..len)
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                return hl;
            }
            let prev_close = close[i - 1];
            hl.max((high[i] - prev_close).abs())
                .max((low[i] - prev_close).abs())
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> String {
        format!("atr({})", self.period)
    }

    fn required_candles(&self) -> usize {
        self.period.get()
    }

    fn calculate(&self, candles: &[Candle]) -> Series {
        let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
        self.calculate_hlc(&high, &low, &close)
    }
}
