use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Text extraction failed for '{source_name}': {reason}")]
    Extraction { source_name: String, reason: String },

    #[error("HTTP status error: {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Model service returned no text: {reason}")]
    EmptyResponse { reason: String },

    #[error("File upload failed: {reason}")]
    Upload { reason: String },

    #[error("Could not parse assessment from model response: {reason}")]
    Parse { reason: String, raw: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Output directory error: {reason}")]
    OutputDirectory { reason: String },

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Coarse failure classes surfaced to callers of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Extraction,
    Service,
    Parse,
    Other,
}

impl FeedbackError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Extraction { .. } => FailureKind::Extraction,
            Self::Http(_) | Self::HttpStatus { .. } | Self::EmptyResponse { .. } | Self::Upload { .. } => {
                FailureKind::Service
            }
            Self::Parse { .. } => FailureKind::Parse,
            _ => FailureKind::Other,
        }
    }

    /// Raw model output attached to a parse failure, for diagnostic display.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
