use crate::error::{FeedbackError, Result};
use crate::types::{DocumentFormat, DocumentMetadata, DocumentText, SourceType};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "md", "markdown", "txt"];

pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Fetches and extracts one source in a single step.
    pub async fn load_document(source: &str) -> Result<DocumentText> {
        let (bytes, metadata) = Self::fetch_document(source).await?;
        Self::extract_text(bytes, metadata).await
    }

    pub async fn fetch_document(source: &str) -> Result<(Vec<u8>, DocumentMetadata)> {
        if Self::is_url(source) {
            Self::fetch_from_url(source).await
        } else {
            Self::fetch_from_file(source).await
        }
    }

    /// Turns raw document bytes into text. An empty result counts as a
    /// failed extraction.
    pub async fn extract_text(bytes: Vec<u8>, metadata: DocumentMetadata) -> Result<DocumentText> {
        let filename = metadata.filename.clone();

        let content = match metadata.format {
            DocumentFormat::Pdf => {
                info!("Extracting text from PDF: {}", filename);
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| FeedbackError::Extraction {
                        source_name: filename.clone(),
                        reason: format!("extraction task aborted: {}", e),
                    })?
                    .map_err(|e| FeedbackError::Extraction {
                        source_name: filename.clone(),
                        reason: e.to_string(),
                    })?
            }
            DocumentFormat::Markdown | DocumentFormat::PlainText => {
                String::from_utf8(bytes).map_err(|e| FeedbackError::Extraction {
                    source_name: filename.clone(),
                    reason: format!("not valid UTF-8: {}", e),
                })?
            }
        };

        if content.trim().is_empty() {
            warn!("No text could be extracted from {}", filename);
            return Err(FeedbackError::Extraction {
                source_name: filename,
                reason: "document contains no extractable text".to_string(),
            });
        }

        debug!("Extracted {} characters from {}", content.chars().count(), filename);

        Ok(DocumentText { content, metadata })
    }

    /// Resolves the optional requirements, either from a document or from
    /// text given directly. Inline text wins when both are supplied.
    pub async fn load_requirements(source: Option<&str>, inline: Option<&str>) -> Result<Option<String>> {
        if let Some(text) = inline.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(Some(text.to_string()));
        }

        match source {
            Some(source) => {
                info!("Loading requirements from: {}", source);
                let document = Self::load_document(source).await?;
                Ok(Some(document.content))
            }
            None => Ok(None),
        }
    }

    /// Expands directories into the supported files they contain and checks
    /// that every other source exists or parses as a URL.
    pub fn collect_sources(inputs: &[String]) -> Result<Vec<String>> {
        let mut collected = Vec::new();

        for input in inputs {
            if Self::is_url(input) {
                Url::parse(input)?;
                collected.push(input.clone());
                continue;
            }

            let path = Path::new(input);
            if path.is_dir() {
                let mut found: Vec<String> = WalkDir::new(path)
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_file() && Self::is_supported(entry.path()))
                    .map(|entry| entry.path().to_string_lossy().into_owned())
                    .collect();
                found.sort();

                debug!("Found {} documents under {}", found.len(), input);
                collected.extend(found);
            } else if path.is_file() {
                collected.push(input.clone());
            } else {
                return Err(FeedbackError::FileNotFound {
                    path: input.clone(),
                });
            }
        }

        Ok(collected)
    }

    pub fn is_url(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    async fn fetch_from_url(url: &str) -> Result<(Vec<u8>, DocumentMetadata)> {
        info!("Fetching document from URL: {}", url);

        let parsed_url = Url::parse(url)?;
        let response = reqwest::Client::new().get(url).send().await?;

        if !response.status().is_success() {
            return Err(FeedbackError::HttpStatus {
                status: response.status().as_u16(),
                body: String::new(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        let filename = Self::extract_filename_from_url(&parsed_url);

        let metadata = DocumentMetadata {
            format: DocumentFormat::from_name(&filename),
            filename,
            source_type: SourceType::Url,
            created_at: chrono::Utc::now().to_rfc3339(),
            byte_size: bytes.len(),
        };

        Ok((bytes, metadata))
    }

    async fn fetch_from_file(file_path: &str) -> Result<(Vec<u8>, DocumentMetadata)> {
        info!("Reading file: {}", file_path);

        let path = Path::new(file_path);

        if !path.exists() {
            return Err(FeedbackError::FileNotFound {
                path: file_path.to_string(),
            });
        }

        let bytes = fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let metadata = DocumentMetadata {
            format: DocumentFormat::from_name(&filename),
            filename,
            source_type: SourceType::LocalFile,
            created_at: chrono::Utc::now().to_rfc3339(),
            byte_size: bytes.len(),
        };

        Ok((bytes, metadata))
    }

    fn extract_filename_from_url(url: &Url) -> String {
        url.path_segments()
            .and_then(|segments| segments.last())
            .and_then(|name| if name.is_empty() { None } else { Some(name) })
            .unwrap_or("downloaded.pdf")
            .to_string()
    }

    fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}
