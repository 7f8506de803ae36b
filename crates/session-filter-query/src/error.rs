use session_filter_core::FilterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),
}
