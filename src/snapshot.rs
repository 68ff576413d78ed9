use nonzero_ext::nonzero;
use serde::Serialize;
use tracing::{debug, warn};

use crate::indicator::atr::Atr;
use crate::indicator::ema::Ema;
use crate::indicator::macd::Macd;
use crate::indicator::rsi::Rsi;
use crate::indicator::{Indicator, Series, latest, tail, volumes};
use crate::model::{Candle, TimeFrame};

/// Number of trailing indicator points kept for reporting.
pub const REPORT_WINDOW: usize = 10;

/// Everything fetched for one coin. Only the two candle series are required.
#[derive(Debug, Clone, Default)]
pub struct SnapshotInput {
    pub coin: String,
    pub intraday: Option<Vec<Candle>>,
    pub longterm: Option<Vec<Candle>>,
    pub funding_rate: Option<f64>,
    pub open_interest_latest: Option<f64>,
    pub open_interest_history: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntradayIndicators {
    pub ema20: Series,
    pub macd: Series,
    pub rsi7: Series,
    pub rsi14: Series,
    pub current_ema20: Option<f64>,
    pub current_macd: Option<f64>,
    pub current_rsi7: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LongTermIndicators {
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub atr3: Option<f64>,
    pub atr14: Option<f64>,
    pub macd: Series,
    pub rsi14: Series,
    pub current_volume: f64,
    pub average_volume: f64,
}

/// Per-coin aggregate of both timeframes and the futures statistics.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSnapshot {
    pub coin: String,
    pub intraday_timeframe: TimeFrame,
    pub longterm_timeframe: TimeFrame,
    pub intraday_candles: Vec<Candle>,
    pub longterm_candles: Vec<Candle>,
    pub intraday: IntradayIndicators,
    pub longterm: LongTermIndicators,
    pub funding_rate: Option<f64>,
    pub open_interest_latest: Option<f64>,
    pub open_interest_average: Option<f64>,
}

impl InstrumentSnapshot {
    /// Build a snapshot, or `None` when either candle series is missing or
    /// empty. Optional inputs that are absent stay `None` in the output.
    pub fn build(input: SnapshotInput) -> Option<Self> {
        let SnapshotInput {
            coin,
            intraday,
            longterm,
            funding_rate,
            open_interest_latest,
            open_interest_history,
        } = input;

        let (Some(intraday_candles), Some(longterm_candles)) = (intraday, longterm) else {
            warn!(coin = %coin, "required candle series missing");
            return None;
        };
        let (Some(first_intraday), Some(first_longterm)) =
            (intraday_candles.first(), longterm_candles.first())
        else {
            warn!(
                coin = %coin,
                intraday = intraday_candles.len(),
                longterm = longterm_candles.len(),
                "required candle series empty"
            );
            return None;
        };
        let intraday_timeframe = first_intraday.timeframe;
        let longterm_timeframe = first_longterm.timeframe;

        let intraday = intraday_indicators(&coin, &intraday_candles);
        let longterm = longterm_indicators(&coin, &longterm_candles);
        let open_interest_average =
            open_interest_average(open_interest_history.as_deref(), open_interest_latest);

        Some(Self {
            coin,
            intraday_timeframe,
            longterm_timeframe,
            intraday_candles,
            longterm_candles,
            intraday,
            longterm,
            funding_rate,
            open_interest_latest,
            open_interest_average,
        })
    }

    /// Close of the newest intraday candle.
    pub fn current_price(&self) -> f64 {
        self.intraday_candles.last().map_or(f64::NAN, |c| c.close)
    }
}

fn run(coin: &str, indicator: &dyn Indicator, candles: &[Candle]) -> Series {
    let required = indicator.required_candles();
    if candles.len() < required {
        debug!(
            coin,
            indicator = %indicator.name(),
            available = candles.len(),
            required,
            "insufficient history for indicator"
        );
    }
    indicator.calculate(candles)
}

fn intraday_indicators(coin: &str, candles: &[Candle]) -> IntradayIndicators {
    let ema20 = tail(&run(coin, &Ema::new(nonzero!(20usize)), candles), REPORT_WINDOW);
    let macd = tail(&run(coin, &Macd::default(), candles), REPORT_WINDOW);
    let rsi7 = tail(&run(coin, &Rsi::new(nonzero!(7usize)), candles), REPORT_WINDOW);
    let rsi14 = tail(&run(coin, &Rsi::new(nonzero!(14usize)), candles), REPORT_WINDOW);

    IntradayIndicators {
        current_ema20: latest(&ema20),
        current_macd: latest(&macd),
        current_rsi7: latest(&rsi7),
        ema20,
        macd,
        rsi7,
        rsi14,
    }
}

fn longterm_indicators(coin: &str, candles: &[Candle]) -> LongTermIndicators {
    let vols = volumes(candles);
    let current_volume = vols.last().copied().unwrap_or(f64::NAN);
    let average_volume = vols.iter().sum::<f64>() / vols.len() as f64;

    LongTermIndicators {
        ema20: latest(&run(coin, &Ema::new(nonzero!(20usize)), candles)),
        ema50: latest(&run(coin, &Ema::new(nonzero!(50usize)), candles)),
        atr3: latest(&run(coin, &Atr::new(nonzero!(3usize)), candles)),
        atr14: latest(&run(coin, &Atr::new(nonzero!(14usize)), candles)),
        macd: tail(&run(coin, &Macd::default(), candles), REPORT_WINDOW),
        rsi14: tail(&run(coin, &Rsi::new(nonzero!(14usize)), candles), REPORT_WINDOW),
        current_volume,
        average_volume,
    }
}

/// Mean of the history when it has samples, otherwise the latest reading.
pub fn open_interest_average(history: Option<&[f64]>, latest: Option<f64>) -> Option<f64> {
    match history {
        Some(samples) if !samples.is_empty() => {
            Some(samples.iter().sum::<f64>() / samples.len() as f64)
        }
        _ => latest,
    }
}
