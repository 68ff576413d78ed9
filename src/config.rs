use std::net::SocketAddr;
use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::TimeFrame;

/// Binance caps klines at 1000 rows per request.
const MAX_CANDLE_LIMIT: usize = 1000;
/// Binance caps open-interest statistics at 500 rows per request.
const MAX_OPEN_INTEREST_LIMIT: usize = 500;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_spot_base_url() -> String {
    "https://api.binance.com".into()
}

fn default_futures_base_url() -> String {
    "https://fapi.binance.com".into()
}

fn default_quote_asset() -> String {
    "USDT".into()
}

fn default_requests_per_second() -> u32 {
    20
}

fn default_coins() -> Vec<String> {
    ["BTC", "ETH", "SOL", "BNB", "XRP", "DOGE"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_intraday_timeframe() -> TimeFrame {
    TimeFrame::Min3
}

fn default_longterm_timeframe() -> TimeFrame {
    TimeFrame::Hour4
}

fn default_candle_limit() -> usize {
    100
}

fn default_open_interest_period() -> TimeFrame {
    TimeFrame::Hour1
}

fn default_open_interest_limit() -> usize {
    50
}

fn default_bind() -> String {
    "0.0.0.0:3000".into()
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_spot_base_url")]
    pub spot_base_url: String,
    #[serde(default = "default_futures_base_url")]
    pub futures_base_url: String,
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Shared by every request issued against one host.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            spot_base_url: default_spot_base_url(),
            futures_base_url: default_futures_base_url(),
            quote_asset: default_quote_asset(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_coins")]
    pub coins: Vec<String>,
    /// Unknown spellings fail at parse time.
    #[serde(default = "default_intraday_timeframe")]
    pub intraday_timeframe: TimeFrame,
    #[serde(default = "default_candle_limit")]
    pub intraday_limit: usize,
    #[serde(default = "default_longterm_timeframe")]
    pub longterm_timeframe: TimeFrame,
    #[serde(default = "default_candle_limit")]
    pub longterm_limit: usize,
    #[serde(default = "default_open_interest_period")]
    pub open_interest_period: TimeFrame,
    #[serde(default = "default_open_interest_limit")]
    pub open_interest_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            coins: default_coins(),
            intraday_timeframe: default_intraday_timeframe(),
            intraday_limit: default_candle_limit(),
            longterm_timeframe: default_longterm_timeframe(),
            longterm_limit: default_candle_limit(),
            open_interest_period: default_open_interest_period(),
            open_interest_limit: default_open_interest_limit(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

pub fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_exchange(config)?;
    validate_timeframes(config)?;
    validate_limits(config)?;
    validate_coins(config)?;
    validate_server(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>) -> Report<ConfigError> {
    Report::new(ConfigError::Validation {
        field: field.into(),
    })
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let format = config.general.log_format.as_str();
    if !VALID_LOG_FORMATS.contains(&format) {
        return Err(invalid(format!(
            "general.log_format \"{format}\" must be one of {VALID_LOG_FORMATS:?}"
        )));
    }
    Ok(())
}

fn validate_exchange(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let exchange = &config.exchange;
    if exchange.requests_per_second == 0 {
        return Err(invalid("exchange.requests_per_second must be > 0"));
    }
    if exchange.quote_asset.trim().is_empty() {
        return Err(invalid("exchange.quote_asset must not be empty"));
    }
    for (name, url) in [
        ("spot_base_url", &exchange.spot_base_url),
        ("futures_base_url", &exchange.futures_base_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(invalid(format!(
                "exchange.{name} \"{url}\" must be an http(s) URL"
            )));
        }
    }
    Ok(())
}

fn validate_timeframes(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let report = &config.report;
    if report.open_interest_period.binance_open_interest_period().is_none() {
        return Err(invalid(format!(
            "report.open_interest_period: \"{}\" is not a supported open interest period",
            report.open_interest_period
        )));
    }
    Ok(())
}

fn validate_limits(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let report = &config.report;
    for (name, limit, max) in [
        ("intraday_limit", report.intraday_limit, MAX_CANDLE_LIMIT),
        ("longterm_limit", report.longterm_limit, MAX_CANDLE_LIMIT),
        (
            "open_interest_limit",
            report.open_interest_limit,
            MAX_OPEN_INTEREST_LIMIT,
        ),
    ] {
        if limit == 0 || limit > max {
            return Err(invalid(format!(
                "report.{name} = {limit} must be within 1..={max}"
            )));
        }
    }
    Ok(())
}

fn validate_coins(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.report.coins.is_empty() {
        return Err(invalid("report.coins must list at least one coin"));
    }
    if config.report.coins.iter().any(|c| c.trim().is_empty()) {
        return Err(invalid("report.coins must not contain blank entries"));
    }
    Ok(())
}

fn validate_server(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let bind = &config.server.bind;
    if bind.parse::<SocketAddr>().is_err() {
        return Err(invalid(format!(
            "server.bind \"{bind}\" is not a socket address"
        )));
    }
    Ok(())
}
