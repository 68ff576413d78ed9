use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candle timeframe supported by the application.
///
/// String representations match the config file format (e.g. `"1m"`, `"1h"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "3m")]
    Min3,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

impl TimeFrame {
    /// Return the config-format string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min3 => "3m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }

    /// Return the Binance kline interval string for this timeframe.
    pub fn binance_interval(self) -> &'static str {
        self.as_str()
    }

    /// Return the Binance open-interest statistics period, if the
    /// `openInterestHist` endpoint supports this timeframe.
    pub fn binance_open_interest_period(self) -> Option<&'static str> {
        match self {
            Self::Min1 | Self::Min3 => None,
            other => Some(other.as_str()),
        }
    }

    /// Human-readable interval used in rendered prompts, e.g. `"3-minute"`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Min1 => "1-minute",
            Self::Min3 => "3-minute",
            Self::Min5 => "5-minute",
            Self::Min15 => "15-minute",
            Self::Min30 => "30-minute",
            Self::Hour1 => "1-hour",
            Self::Hour4 => "4-hour",
            Self::Day1 => "1-day",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Exchange market symbol for a coin quoted in `quote`, e.g. `BTC` + `USDT`
/// gives `BTCUSDT`. Binance uses the same symbol for spot and USDT-margined
/// perpetuals.
pub fn market_symbol(coin: &str, quote: &str) -> String {
    format!("{}{}", coin.trim().to_uppercase(), quote.trim().to_uppercase())
}
