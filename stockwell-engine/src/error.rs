use thiserror::Error;

/// Errors from the engine's ingestion edge. The decision cores themselves
/// are pure and infallible; a bad SKU is excluded, never raised.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Every row of the file was malformed or unusable.
    #[error("no usable candidate rows in '{0}'")]
    EmptyInput(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
