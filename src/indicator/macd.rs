use std::num::NonZeroUsize;

use nonzero_ext::nonzero;

use crate::indicator::ema::Ema;
use crate::indicator::{Indicator, Series, close_prices};
use crate::model::Candle;

/// MACD line: fast EMA minus slow EMA, position by position.
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast_period: NonZeroUsize,
    slow_period: NonZeroUsize,
    // Carried for naming only; the signal line is never computed.
    signal_period: NonZeroUsize,
}

impl Macd {
    pub fn new(
        fast_period: NonZeroUsize,
        slow_period: NonZeroUsize,
        signal_period: NonZeroUsize,
    ) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }

    /// MACD line values; `None` wherever either EMA is still warming up.
    pub fn calculate_prices(&self, prices: &[f64]) -> Series {
        let fast = Ema::new(self.fast_period).calculate_prices(prices);
        let slow = Ema::new(self.slow_period).calculate_prices(prices);

        fast.into_iter()
            .zip(slow)
            .map(|(f, s)| f.zip(s).map(|(f, s)| f - s))
            .collect()
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(nonzero!(12usize), nonzero!(26usize), nonzero!(9usize))
    }
}

impl Indicator for Macd {
    fn name(&self) -> String {
        format!(
            "macd({},{},{})",
            self.fast_period, self.slow_period, self.signal_period
        )
    }

    fn required_candles(&self) -> usize {
        self.fast_period.get().max(self.slow_period.get())
    }

    fn calculate(&self, candles: &[Candle]) -> Series {
        self.calculate_prices(&close_prices(candles))
    }
}
