//! # PDF Feedback Library
//!
//! Grades assignment documents with a large-language-model service and
//! returns a fixed-shape assessment (grade, score, strengths, areas for
//! improvement and per-category scores).
//!
//! Long documents are split into word-aligned chunks, each chunk is
//! analyzed on its own, and a final request synthesizes the partial notes
//! into one assessment.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pdf_feedback::{Assessor, DocumentExtractor, GeminiClient, ModelClient, ModelConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ModelConfig::from_env()?;
//!     let client: Arc<dyn ModelClient> = Arc::new(GeminiClient::new(config)?);
//!     let assessor = Assessor::new(client)?;
//!
//!     let document = DocumentExtractor::load_document("assignment.pdf").await?;
//!     let requirements = DocumentExtractor::load_requirements(Some("brief.pdf"), None).await?;
//!
//!     let assessment = assessor
//!         .analyze(&document.content, requirements.as_deref())
//!         .await?;
//!
//!     println!("{}: {} ({}/100)", assessment.title, assessment.grade, assessment.score);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export main types and services for easier usage
pub use config::ModelConfig;
pub use error::{FailureKind, FeedbackError, Result};
pub use services::{
    Assessor, DocumentExtractor, GeminiClient, ModelClient, ResponseParser, TextChunker,
    DEFAULT_MAX_CHUNK_SIZE, LONG_DOCUMENT_THRESHOLD,
};
pub use types::{
    AnalysisOutcome, AnalysisPath, AnalysisReport, AnalysisSession, ChunkPreview,
    DocumentFormat, DocumentMetadata, DocumentText, SourceType, StructuredAssessment,
    UploadedFile,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
