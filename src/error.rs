/*!
The error type shared by every stage of the forecasting pipeline
*/
use thiserror::Error;

/// An error raised while fetching, forecasting or simulating
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied parameter was out of range or malformed
    #[error("{0}")]
    InvalidParameter(String),
    /// The price series is too short to form a single window
    #[error("Insufficient data: need at least {needed} prices, got {got}")]
    InsufficientData {
        /// The minimum number of prices required
        needed: usize,
        /// The number of prices available
        got: usize,
    },
    /// Predicted and actual sequences differ in length, or are empty
    #[error("Shape mismatch: {predicted} predicted values against {actual} actual values")]
    ShapeMismatch {
        /// The number of predicted values
        predicted: usize,
        /// The number of actual values
        actual: usize,
    },
    /// The market data provider failed or returned unusable data
    #[error("Data source error: {0}")]
    DataSource(String),
    /// The forecaster failed to train or predict
    #[error("Training error: {0}")]
    Training(String),
    /// An IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A CSV (de)serialization error
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Whether this error was caused by the caller's input, rather than by the pipeline itself.
    ///
    /// Only `InvalidParameter` counts: insufficient data and provider failures are reported as internal errors.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidParameter(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::DataSource(err.to_string())
    }
}

#[cfg(feature = "lstm")]
impl From<tch::TchError> for Error {
    fn from(err: tch::TchError) -> Error {
        Error::Training(err.to_string())
    }
}

/// A `Result` carrying a pipeline [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_parameters_are_client_errors() {
        assert!(Error::InvalidParameter("bad".into()).is_client_error());
        assert!(!Error::InsufficientData { needed: 61, got: 3 }.is_client_error());
        assert!(!Error::DataSource("down".into()).is_client_error());
        assert!(!Error::Training("nan".into()).is_client_error());
    }

    #[test]
    fn messages_carry_detail() {
        let err = Error::InsufficientData { needed: 61, got: 3 };
        assert_eq!(
            err.to_string(),
            "Insufficient data: need at least 61 prices, got 3"
        );
        let err = Error::ShapeMismatch {
            predicted: 2,
            actual: 0,
        };
        assert!(err.to_string().contains("2 predicted"));
    }
}
