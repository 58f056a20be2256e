use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfStudioError {
    /// Missing file, blank required field, unsupported option
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Failed to load document: {0}")]
    DocumentLoad(String),

    /// Mutation or serialization failed; no output was produced
    #[error("Failed to produce document: {0}")]
    Commit(String),

    /// Non-2xx answer from the processing server, message taken from the body
    #[error("Server error: {0}")]
    RemoteService(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PdfStudioError {
    /// Local, recoverable conditions that the UI reports without side effects
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PdfStudioError::InvalidInput(_)
                | PdfStudioError::InvalidRange(_)
                | PdfStudioError::InvalidPage(_)
        )
    }
}
