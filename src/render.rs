//! Plain-text prompt rendering.
//!
//! Number formatting follows JavaScript's `toFixed`, `toPrecision` and
//! `Number#toString` so the text is byte-compatible with prompts consumers
//! already parse.

use crate::model::TimeFrame;
use crate::snapshot::{InstrumentSnapshot, REPORT_WINDOW};

/// Placeholder for a scalar that could not be computed.
const ABSENT: &str = "N/A";

/// Header plus one block per snapshot, each followed by a blank line.
pub fn render_report(snapshots: &[InstrumentSnapshot], intraday_timeframe: TimeFrame) -> String {
    let mut out = format!(
        "ALL OF THE PRICE OR SIGNAL DATA BELOW IS ORDERED: OLDEST → NEWEST\n\
         \n\
         Timeframes note: Unless stated otherwise in a section title, intraday series are provided at {} intervals. \
         If a coin uses a different interval, it is explicitly stated in that coin's section.\n\
         CURRENT MARKET STATE FOR ALL COINS\n\
         \n",
        intraday_timeframe.label()
    );
    for snapshot in snapshots {
        out.push_str(&render_snapshot(snapshot));
        out.push('\n');
    }
    out
}

pub fn render_snapshot(s: &InstrumentSnapshot) -> String {
    let coin = &s.coin;
    let intraday = &s.intraday;
    let longterm = &s.longterm;

    let open_interest = match (s.open_interest_latest, s.open_interest_average) {
        (Some(latest), Some(average)) => format!(
            "Open Interest: Latest: {} Average: {}\n",
            to_fixed(latest, 2),
            to_fixed(average, 2)
        ),
        _ => String::new(),
    };
    let funding = s
        .funding_rate
        .map(|rate| format!("Funding Rate: {}", js_number(rate)))
        .unwrap_or_default();

    let recent = &s.intraday_candles[s.intraday_candles.len().saturating_sub(REPORT_WINDOW)..];
    let mid_prices: Vec<Option<f64>> = recent.iter().map(|c| Some(c.close)).collect();

    format!(
        "ALL {coin} DATA\n\
         current_price = {price}, current_ema20 = {ema20}, current_macd = {macd}, current_rsi (7 period) = {rsi7}\n\
         In addition, here is the latest {coin} open interest and funding rate for perps (the instrument you are trading):\n\
         {open_interest}{funding}\n\
         Intraday series ({intraday_label} intervals, oldest → latest):\n\
         Mid prices: {mid_prices}\n\
         EMA indicators (20-period): {ema20_series}\n\
         MACD indicators: {macd_series}\n\
         RSI indicators (7-Period): {rsi7_series}\n\
         RSI indicators (14-Period): {rsi14_series}\n\
         Longer-term context ({longterm_label} timeframe):\n\
         20-Period EMA: {lt_ema20} vs. 50-Period EMA: {lt_ema50}\n\
         3-Period ATR: {atr3} vs. 14-Period ATR: {atr14}\n\
         Current Volume: {volume} vs. Average Volume: {avg_volume}\n\
         MACD indicators: {lt_macd}\n\
         RSI indicators (14-Period): {lt_rsi14}\n",
        price = to_precision(s.current_price(), 5),
        ema20 = opt(intraday.current_ema20, |v| to_precision(v, 5)),
        macd = opt(intraday.current_macd, |v| to_fixed(v, 3)),
        rsi7 = opt(intraday.current_rsi7, |v| to_fixed(v, 3)),
        intraday_label = s.intraday_timeframe.label(),
        mid_prices = json_array(&mid_prices, 5),
        ema20_series = json_array(&intraday.ema20, 3),
        macd_series = json_array(&intraday.macd, 3),
        rsi7_series = json_array(&intraday.rsi7, 3),
        rsi14_series = json_array(&intraday.rsi14, 3),
        longterm_label = s.longterm_timeframe.label(),
        lt_ema20 = opt(longterm.ema20, |v| to_fixed(v, 3)),
        lt_ema50 = opt(longterm.ema50, |v| to_fixed(v, 3)),
        atr3 = opt(longterm.atr3, |v| to_fixed(v, 3)),
        atr14 = opt(longterm.atr14, |v| to_fixed(v, 3)),
        volume = to_fixed(longterm.current_volume, 3),
        avg_volume = to_fixed(longterm.average_volume, 3),
        lt_macd = json_array(&longterm.macd, 3),
        lt_rsi14 = json_array(&longterm.rsi14, 3),
    )
}

fn opt(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| ABSENT.to_owned(), format)
}

/// Compact JSON array of values rounded to `precision` significant digits.
/// Absent and non-finite values become `null`, as `JSON.stringify` does.
pub fn json_array(values: &[Option<f64>], precision: usize) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| match v {
            Some(v) if v.is_finite() => {
                let rounded = to_precision(*v, precision);
                js_number(rounded.parse().unwrap_or(*v))
            }
            _ => "null".to_owned(),
        })
        .collect();
    format!("[{}]", items.join(","))
}

fn non_finite(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value > 0.0 {
        "Infinity".to_owned()
    } else {
        "-Infinity".to_owned()
    }
}

/// Split Rust's `{:e}` output into mantissa and exponent.
fn split_exponent(sci: &str) -> (&str, i32) {
    match sci.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (sci, 0),
    }
}

fn js_exponent(mantissa: &str, exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{}", exp.abs())
}

/// `Number.prototype.toString()`: shortest round-trip digits, exponent form
/// outside `[1e-6, 1e21)`.
pub fn js_number(value: f64) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    if value == 0.0 {
        return "0".to_owned();
    }
    let abs = value.abs();
    if (1e-6..1e21).contains(&abs) {
        format!("{value}")
    } else {
        let sci = format!("{value:e}");
        let (mantissa, exp) = split_exponent(&sci);
        js_exponent(mantissa, exp)
    }
}

/// `Number.prototype.toFixed(digits)`.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    if value.abs() >= 1e21 {
        return js_number(value);
    }
    // JS drops the sign of negative zero
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.digits$}")
}

/// `Number.prototype.toPrecision(precision)`, `precision >= 1`.
pub fn to_precision(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    let precision = precision.max(1);
    if value == 0.0 {
        return format!("{:.*}", precision - 1, 0.0);
    }

    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exp) = split_exponent(&sci);
    if exp < -6 || exp >= precision as i32 {
        js_exponent(mantissa, exp)
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        format!("{value:.decimals$}")
    }
}
