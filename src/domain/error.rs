//! Domain error types.
//!
//! Only faults live here. Short reads, data exhaustion, dropped signals and
//! degenerate statistics are ordinary outcomes and never surface as errors.

/// Top-level error type for replaytrader.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("unknown symbol {symbol}: not registered with the bar store")]
    UnknownSymbol { symbol: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    pub(crate) fn unknown_symbol(symbol: &str) -> Self {
        ReplayError::UnknownSymbol {
            symbol: symbol.to_string(),
        }
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ReplayError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&ReplayError> for std::process::ExitCode {
    fn from(err: &ReplayError) -> Self {
        let code: u8 = match err {
            ReplayError::Io(_) | ReplayError::Report { .. } => 1,
            ReplayError::ConfigParse { .. }
            | ReplayError::ConfigMissing { .. }
            | ReplayError::ConfigInvalid { .. } => 2,
            ReplayError::DataSource { .. } => 3,
            ReplayError::UnknownSymbol { .. } | ReplayError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
