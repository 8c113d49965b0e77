use thiserror::Error;

use crate::annotator::AnnotatorError;
use crate::config::ConfigError;
use crate::source::SourceError;

/// Request-level failures. Numeric estimation problems never show up here;
/// they are absorbed into sentinel values inside the result.
#[derive(Error, Debug)]
pub enum FacepaceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error("annotation could not be parsed: {0}")]
    AnnotationParse(String),
    #[error("annotator unavailable: {0}")]
    AnnotatorUnavailable(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<AnnotatorError> for FacepaceError {
    fn from(err: AnnotatorError) -> Self {
        match err {
            AnnotatorError::Parse(msg) => Self::AnnotationParse(msg),
            other => Self::AnnotatorUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FacepaceError>;
