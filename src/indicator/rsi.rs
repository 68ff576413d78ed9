use std::num::NonZeroUsize;

use crate::indicator::{Indicator, Series, close_prices};
use crate::model::Candle;

/// RSI (Relative Strength Index) with a Wilder-style smoothing step.
///
/// After the simple-average seed, the previous averages are rebuilt from the
/// previous RSI value and the previous raw loss rather than carried forward:
///
/// ```text
/// prev_rs       = (100 - rsi[i-1]) / rsi[i-1]
/// prev_avg_loss = loss[i-1]
/// prev_avg_gain = prev_rs * loss[i-1]
/// avg_x         = (prev_avg_x * (period - 1) + x[i]) / period
/// ```
///
/// This diverges from canonical Wilder RSI after the seed point. Downstream
/// consumers compare against output produced this way, so keep it as is.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: NonZeroUsize,
}

impl Rsi {
    pub fn new(period: NonZeroUsize) -> Self {
        Self { period }
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Series {
        let period = self.period.get();
        if prices.len() <= period {
            return vec![None; prices.len()];
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = prices
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        let period_f = period as f64;
        let mut rsi: Vec<f64> = Vec::with_capacity(gains.len());

        let avg_gain = gains[..period].iter().sum::<f64>() / period_f;
        let avg_loss = losses[..period].iter().sum::<f64>() / period_f;
        rsi.push(rsi_value(avg_gain, avg_loss));

        for i in period..gains.len() {
            let prev_rsi = rsi[rsi.len() - 1];
            let prev_rs = (100.0 - prev_rsi) / prev_rsi;
            let prev_avg_gain = prev_rs * losses[i - 1];
            let prev_avg_loss = losses[i - 1];

            let avg_gain = (prev_avg_gain * (period_f - 1.0) + gains[i]) / period_f;
            let avg_loss = (prev_avg_loss * (period_f - 1.0) + losses[i]) / period_f;
            rsi.push(rsi_value(avg_gain, avg_loss));
        }

        // One leading None for the undifferenced first price, then the
        // warm-up positions of the differenced series.
        std::iter::repeat_n(None, period)
            .chain(rsi.into_iter().map(Some))
            .collect()
    }
}

/// Zero average loss is deliberately unguarded: `gain / 0` is infinite and
/// resolves to exactly 100; `0 / 0` propagates as NaN.
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

impl Indicator for Rsi {
    fn name(&self) -> String {
        format!("rsi({})", self.period)
    }

    fn required_candles(&self) -> usize {
        self.period.get() + 1
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
    fn rsi_insufficient_data_is_all_none() {
        let rsi = Rsi::new(nonzero!(14usize));
        assert_eq!(rsi.calculate(&candles_from_closes(&[1.0; 10])), vec![None; 10]);
        // period + 1 prices are required, exactly period is not enough
        assert_eq!(rsi.calculate_prices(&[1.0; 14]), vec![None; 14]);
    }

    #[test]
    fn rsi_output_length_matches_input() {
        let rsi = Rsi::new(nonzero!(14usize));
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let values = rsi.calculate_prices(&prices);
        assert_eq!(values.len(), 20);
        assert!(values[..14].iter().all(Option::is_none));
        assert!(values[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_all_gains_returns_exactly_100() {
        let rsi = Rsi::new(nonzero!(3usize));
        let values = rsi.calculate_prices(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(values[..3], [None, None, None]);
        for v in &values[3..] {
            assert_eq!(*v, Some(100.0));
        }
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = Rsi::new(nonzero!(3usize));
        let values = rsi.calculate_prices(&[4.0, 3.0, 2.0, 1.0]);
        assert!((values[3].unwrap() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_flat_prices_propagate_nan() {
        let rsi = Rsi::new(nonzero!(3usize));
        let values = rsi.calculate_prices(&[5.0; 6]);
        assert!(values[3].unwrap().is_nan());
        assert!(values[5].unwrap().is_nan());
    }

    #[test]
    fn rsi_seed_uses_simple_average() {
        // deltas: +2, -1, +1 -> avg_gain = 1, avg_loss = 1/3, rs = 3 -> rsi = 75
        let rsi = Rsi::new(nonzero!(3usize));
        let values = rsi.calculate_prices(&[10.0, 12.0, 11.0, 12.0]);
        assert!((values[3].unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_reconstructs_previous_averages_from_raw_loss() {
        // deltas: +2, -1, +1, -2
        // seed rsi = 75 (see above)
        // prev_rs = 25 / 75 = 1/3, prev_avg_loss = loss[2] = 0, prev_avg_gain = 0
        // avg_gain = (0 * 2 + 0) / 3 = 0, avg_loss = (0 * 2 + 2) / 3 = 2/3
        // rs = 0 -> rsi = 0
        let rsi = Rsi::new(nonzero!(3usize));
        let values = rsi.calculate_prices(&[10.0, 12.0, 11.0, 12.0, 10.0]);
        assert!((values[4].unwrap() - 0.0).abs() < 1e-9);

        // deltas: +2, -1, -1, +3
        // seed: avg_gain = 2/3, avg_loss = 2/3 -> rsi = 50
        // prev_rs = 1, prev_avg_loss = loss[2] = 1, prev_avg_gain = 1
        // avg_gain = (1 * 2 + 3) / 3 = 5/3, avg_loss = (1 * 2 + 0) / 3 = 2/3
        // rs = 2.5 -> rsi = 100 - 100 / 3.5
        let values = rsi.calculate_prices(&[10.0, 12.0, 11.0, 10.0, 13.0]);
        assert!((values[3].unwrap() - 50.0).abs() < 1e-9);
        assert!((values[4].unwrap() - (100.0 - 100.0 / 3.5)).abs() < 1e-9);
    }

    #[test]
    fn rsi_is_deterministic() {
        let prices = [44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8];
        let rsi = Rsi::new(nonzero!(4usize));
        let a: Vec<_> = rsi.calculate_prices(&prices).iter().map(|v| v.map(f64::to_bits)).collect();
        let b: Vec<_> = rsi.calculate_prices(&prices).iter().map(|v| v.map(f64::to_bits)).collect();
        assert_eq!(a, b);
    }
}
