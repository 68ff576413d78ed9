use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum ExchangeError {
    #[display("request to {endpoint} failed")]
    Request { endpoint: String },
    #[display("failed to parse response from {endpoint}")]
    ResponseParse { endpoint: String },
}

#[derive(Debug, Display, Error)]
pub enum ReportError {
    #[display("invalid request: {reason}")]
    InvalidRequest { reason: String },
    #[display("instrument pipeline for {coin} did not complete")]
    Task { coin: String },
}
