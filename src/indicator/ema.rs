use std::num::NonZeroUsize;

use crate::indicator::{Indicator, Series, close_prices};
use crate::model::Candle;

/// Exponential Moving Average, seeded with the first price.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: NonZeroUsize,
}

impl Ema {
    pub fn new(period: NonZeroUsize) -> Self {
        Self { period }
    }

    /// Calculate EMA values from a price slice.
    ///
    /// Fewer than `period` prices yields an all-`None` series; otherwise every
    /// position is defined, starting from `ema[0] = prices[0]`.
    pub fn calculate_prices(&self, prices: &[f64]) -> Series {
        let period = self.period.get();
        if prices.len() < period {
            return vec![None; prices.len()];
        }

        let k = 2.0 / (period as f64 + 1.0);
        let mut ema = prices[0];
        let mut results = Vec::with_capacity(prices.len());
        results.push(Some(ema));

        for &price in &prices[1..] {
            ema = price * k + ema * (1.0 - k);
            results.push(Some(ema));
        }

        results
    }
}

impl Indicator for Ema {
    fn name(&self) -> String {
        format!("ema({})", self.period)
    }

    fn required_candles(&self) -> usize {
        self.period.get()
    }

    fn calculate(&self, candles: &[Candle]) -> Series {
        self.calculate_prices(&close_prices(candles))
    }
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;

    use super::*;
    use crate::indicator::candles_from_closes;

    #[test]
    fn ema_insufficient_data_is_all_none() {
        let ema = Ema::new(nonzero!(5usize));
        let values = ema.calculate_prices(&[1.0; 4]);
        assert_eq!(values, vec![None; 4]);
    }

    #[test]
    fn ema_empty_input() {
        let ema = Ema::new(nonzero!(3usize));
        assert!(ema.calculate_prices(&[]).is_empty());
    }

    #[test]
    fn ema_flat_prices() {
        let ema = Ema::new(nonzero!(3usize));
        let values = ema.calculate(&candles_from_closes(&[10.0; 6]));
        assert_eq!(values.len(), 6);
        for v in values {
            assert!((v.unwrap() - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn ema_seed_equals_first_price() {
        let prices: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let values = Ema::new(nonzero!(9usize)).calculate_prices(&prices);
        assert_eq!(values.len(), 10);
        assert_eq!(values[0], Some(1.0));
        assert!(values.iter().all(Option::is_some));
    }

    #[test]
    fn ema_known_recurrence() {
        // k = 2 / (3 + 1) = 0.5
        let values = Ema::new(nonzero!(3usize)).calculate_prices(&[2.0, 4.0, 8.0]);
        assert_eq!(values, vec![Some(2.0), Some(3.0), Some(5.5)]);
    }

    #[test]
    fn ema_is_deterministic() {
        let prices = [1.5, 2.25, 1.75, 3.0, 2.5, 4.125];
        let ema = Ema::new(nonzero!(4usize));
        let a = ema.calculate_prices(&prices);
        let b = ema.calculate_prices(&prices);
        let bits = |s: &Series| s.iter().map(|v| v.map(f64::to_bits)).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn ema_required_candles_is_period() {
        assert_eq!(Ema::new(nonzero!(20usize)).required_candles(), 20);
        assert_eq!(Ema::new(nonzero!(20usize)).name(), "ema(20)");
    }
}
