use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed-shape grading result decoded from the model's reply.
///
/// Scores are taken as the model reports them; nothing is clamped into
/// `0..=100`. `category_scores` keeps the order the model emitted and
/// accepts any key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAssessment {
    pub title: String,
    pub grade: String,
    pub score: f64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub detailed_feedback: String,
    pub category_scores: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub source_type: SourceType,
    pub format: DocumentFormat,
    pub created_at: String,
    pub byte_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    LocalFile,
    Url,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Markdown,
    PlainText,
}

impl DocumentFormat {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".markdown") {
            Self::Markdown
        } else if lower.ends_with(".txt") {
            Self::PlainText
        } else {
            Self::Pdf
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Markdown => "text/markdown",
            Self::PlainText => "text/plain",
        }
    }
}

/// Extracted text of one document together with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentText {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl DocumentText {
    pub fn character_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Handle returned by the model service's file API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPath {
    /// One request over the full text.
    Short,
    /// Per-chunk map requests followed by one reduce request.
    Long,
    /// One request against an uploaded document.
    File,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub assessment: StructuredAssessment,
    pub path: AnalysisPath,
    pub chunk_count: usize,
    pub model_calls: usize,
}

/// State carried across one analysis run, passed in and handed back
/// explicitly instead of living in shared state.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    pub document: DocumentText,
    pub requirements: Option<String>,
    pub assessment: Option<StructuredAssessment>,
}

impl AnalysisSession {
    pub fn new(document: DocumentText, requirements: Option<String>) -> Self {
        Self {
            document,
            requirements,
            assessment: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source: String,
    pub model: String,
    pub analyzed_at: String,
    pub path: AnalysisPath,
    pub chunk_count: usize,
    pub word_count: usize,
    pub character_count: usize,
    pub assessment: StructuredAssessment,
}

impl AnalysisReport {
    pub fn new(document: &DocumentText, outcome: &AnalysisOutcome, model: &str) -> Self {
        Self {
            source: document.metadata.filename.clone(),
            model: model.to_string(),
            analyzed_at: chrono::Utc::now().to_rfc3339(),
            path: outcome.path,
            chunk_count: outcome.chunk_count,
            word_count: document.word_count(),
            character_count: document.character_count(),
            assessment: outcome.assessment.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkPreview {
    pub source: String,
    pub character_count: usize,
    pub word_count: usize,
    pub long_document: bool,
    pub chunk_sizes: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub output_dir: PathBuf,
    pub requirements: Option<String>,
    pub upload_fallback: bool,
}
