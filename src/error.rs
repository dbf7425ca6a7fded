use thiserror::Error;

pub type Result<T, E = QpcrError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum QpcrError {
    /// The instrument text lacks one of the signatures identifying the
    /// instrument model or software version.
    #[error("content is not a valid {instrument} export: missing '{signature}'")]
    Format {
        instrument: &'static str,
        signature: String,
    },
    #[error("{format} export failed: {reason}")]
    Export {
        format: &'static str,
        reason: String,
    },
    #[error("unknown export format '{0}'")]
    UnknownFormat(String),
    #[error("no sample called 'mock' found, name the reference sample")]
    MissingMock,
    #[error("experiment '{0}' not found")]
    NotFound(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
