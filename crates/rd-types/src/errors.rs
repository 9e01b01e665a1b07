use thiserror::Error;

/// Errors raised by the risk estimators, the aggregator and the alert evaluator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Insufficient data for {what}: need at least {required} points, got {available}")]
    InsufficientData {
        what: &'static str,
        required: usize,
        available: usize,
    },

    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("Correlation is undefined: {reason}")]
    UndefinedCorrelation { reason: String },

    #[error("No asset in the batch produced metrics")]
    NoData,

    #[error("Invalid price series: {message}")]
    InvalidSeries { message: String },
}

impl RiskError {
    pub fn insufficient(what: &'static str, required: usize, available: usize) -> Self {
        RiskError::InsufficientData {
            what,
            required,
            available,
        }
    }

    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        RiskError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Data-related errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Asset not found: {asset}")]
    AssetNotFound { asset: String },

    #[error("Data parsing error: {message}")]
    ParseError { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Invalid series from provider: {0}")]
    Series(#[from] RiskError),
}

/// Result type alias for estimator-level operations
pub type RiskResult<T> = Result<T, RiskError>;

/// Result type alias for market-data operations
pub type DataResult<T> = Result<T, DataError>;
