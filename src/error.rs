use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum AppError {
    #[error("missing required columns for {ticker}: {columns:?}")]
    MissingColumns { ticker: String, columns: Vec<String> },

    #[error("unable to parse date: {0}")]
    DateParse(String),

    #[error("invalid numeric value: {0}")]
    InvalidNumericValue(String),

    #[error("column {column} for {ticker} contains non-numeric values")]
    NumericCoercion { ticker: String, column: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Io(format!("CSV error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Io(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Alias for convenience
pub type Error = AppError;
