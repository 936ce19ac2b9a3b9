use crate::config::ModelConfig;
use crate::error::{FailureKind, Result};
use crate::services::chunker::TextChunker;
use crate::services::extractor::DocumentExtractor;
use crate::services::model::{GeminiClient, ModelClient};
use crate::services::parser::ResponseParser;
use crate::services::prompts;
use crate::types::{
    AnalysisOutcome, AnalysisPath, AnalysisSession, DocumentMetadata, DocumentText,
    StructuredAssessment,
};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Documents longer than this many characters go through the map-reduce path.
pub const LONG_DOCUMENT_THRESHOLD: usize = 30_000;

/// Separator placed between partial summaries before the reduce request.
const SUMMARY_SEPARATOR: &str = "\n\n";

/// Turns assignment text into a [`StructuredAssessment`], splitting long
/// documents into independently analyzed chunks and synthesizing the partial
/// results in a second request.
///
/// Any failed request aborts the whole run; nothing is retried and partial
/// map results are dropped.
pub struct Assessor {
    client: Arc<dyn ModelClient>,
    parser: ResponseParser,
    map_concurrency: usize,
}

impl Assessor {
    pub fn new(client: Arc<dyn ModelClient>) -> Result<Self> {
        Ok(Self {
            client,
            parser: ResponseParser::new()?,
            map_concurrency: 1,
        })
    }

    /// Builds a Gemini-backed assessor using the configured map concurrency.
    pub fn from_config(config: ModelConfig) -> Result<Self> {
        let map_concurrency = config.map_concurrency;
        let client = GeminiClient::new(config)?;
        Ok(Self::new(Arc::new(client))?.with_map_concurrency(map_concurrency))
    }

    pub fn map_concurrency(&self) -> usize {
        self.map_concurrency
    }

    /// Allows up to `map_concurrency` chunk requests in flight. Summaries are
    /// still combined in chunk order.
    pub fn with_map_concurrency(mut self, map_concurrency: usize) -> Self {
        self.map_concurrency = map_concurrency.max(1);
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn is_long_document(text: &str) -> bool {
        text.chars().count() > LONG_DOCUMENT_THRESHOLD
    }

    pub async fn analyze(
        &self,
        assignment_text: &str,
        requirements: Option<&str>,
    ) -> Result<StructuredAssessment> {
        Ok(self.analyze_detailed(assignment_text, requirements).await?.assessment)
    }

    pub async fn analyze_detailed(
        &self,
        assignment_text: &str,
        requirements: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        if Self::is_long_document(assignment_text) {
            self.analyze_long(assignment_text, requirements).await
        } else {
            self.analyze_short(assignment_text, requirements).await
        }
    }

    /// Runs the analysis for a session and hands it back with the new
    /// assessment. Any earlier assessment is discarded up front, so a failed
    /// run never leaves a stale result attached.
    pub async fn run(&self, mut session: AnalysisSession) -> Result<AnalysisSession> {
        session.assessment = None;
        let assessment = self
            .analyze(&session.document.content, session.requirements.as_deref())
            .await?;
        session.assessment = Some(assessment);
        Ok(session)
    }

    /// Assesses a document the service reads itself, for files whose text
    /// could not be extracted locally.
    pub async fn analyze_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
        requirements: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        info!("Analyzing '{}' through the file API", display_name);

        let file = self.client.upload(bytes, mime_type, display_name).await?;
        let prompt = prompts::file_analysis_prompt(requirements);
        let response = self.client.generate_with_file(&file, &prompt).await?;

        Ok(AnalysisOutcome {
            assessment: self.parser.parse(&response)?,
            path: AnalysisPath::File,
            chunk_count: 0,
            model_calls: 1,
        })
    }

    /// Extracts text from fetched document bytes and assesses it. When
    /// extraction fails and `upload_fallback` is set, the original bytes go
    /// through [`Assessor::analyze_file`] instead; every other failure is
    /// returned as is.
    pub async fn analyze_document(
        &self,
        bytes: Vec<u8>,
        metadata: DocumentMetadata,
        requirements: Option<&str>,
        upload_fallback: bool,
    ) -> Result<(DocumentText, AnalysisOutcome)> {
        let fallback_bytes = upload_fallback.then(|| bytes.clone());

        match DocumentExtractor::extract_text(bytes, metadata.clone()).await {
            Ok(document) => {
                info!(
                    "Extracted {} words ({} characters) from {}",
                    document.word_count(),
                    document.character_count(),
                    document.metadata.filename
                );
                let outcome = self.analyze_detailed(&document.content, requirements).await?;
                Ok((document, outcome))
            }
            Err(e) if e.kind() == FailureKind::Extraction && fallback_bytes.is_some() => {
                warn!("{}; falling back to document upload", e);
                let bytes = fallback_bytes.unwrap_or_default();
                let outcome = self
                    .analyze_file(bytes, metadata.format.mime_type(), &metadata.filename, requirements)
                    .await?;
                let document = DocumentText {
                    content: String::new(),
                    metadata,
                };
                Ok((document, outcome))
            }
            Err(e) => Err(e),
        }
    }

    async fn analyze_short(
        &self,
        assignment_text: &str,
        requirements: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        info!("Analyzing document in a single request");

        let prompt = prompts::short_document_prompt(assignment_text, requirements);
        let response = self.client.generate(&prompt).await?;

        Ok(AnalysisOutcome {
            assessment: self.parser.parse(&response)?,
            path: AnalysisPath::Short,
            chunk_count: 0,
            model_calls: 1,
        })
    }

    async fn analyze_long(
        &self,
        assignment_text: &str,
        requirements: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        let chunks = TextChunker::chunk_default(assignment_text);
        info!("Document is large. Processing {} chunks", chunks.len());

        let summaries = self.map_chunks(&chunks, requirements).await?;
        let combined_summary = Self::combine_summaries(&summaries);
        debug!("Combined summary is {} characters", combined_summary.len());

        info!("Synthesizing final assessment from {} partial summaries", summaries.len());
        let prompt = prompts::final_assessment_prompt(&combined_summary, requirements);
        let response = self.client.generate(&prompt).await?;

        Ok(AnalysisOutcome {
            assessment: self.parser.parse(&response)?,
            path: AnalysisPath::Long,
            chunk_count: chunks.len(),
            model_calls: chunks.len() + 1,
        })
    }

    async fn map_chunks(&self, chunks: &[String], requirements: Option<&str>) -> Result<Vec<String>> {
        let total = chunks.len();

        stream::iter(chunks.iter().enumerate())
            .map(|(idx, chunk)| async move {
                info!("Analyzing chunk {}/{}", idx + 1, total);
                let prompt = prompts::chunk_analysis_prompt(chunk, requirements);
                self.client.generate(&prompt).await
            })
            .buffered(self.map_concurrency)
            .try_collect()
            .await
    }

    pub fn combine_summaries(summaries: &[String]) -> String {
        summaries.join(SUMMARY_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedbackError;
    use crate::types::{DocumentFormat, SourceType, UploadedFile};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    const ASSESSMENT_REPLY: &str = r#"Sure, here it is:
```json
{"title":"Essay on Rivers","grade":"B+","score":87,"summary":"Solid work.","strengths":["Clear thesis"],"areas_for_improvement":["More sources"],"detailed_feedback":"Good.","category_scores":{"Content":88,"Structure":85,"Analysis":84,"Language":90,"References":80}}
```"#;

    type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

    /// Records prompts and answers from a closure, optionally failing on one call.
    struct ScriptedClient {
        prompts: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
        responder: Responder,
        uploads: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responder: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_on_call: None,
                responder: Box::new(responder),
                uploads: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            let call = {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(prompt.to_string());
                prompts.len() - 1
            };

            if self.fail_on_call == Some(call) {
                return Err(FeedbackError::HttpStatus {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }

            Ok((self.responder)(prompt))
        }

        async fn upload(&self, _bytes: Vec<u8>, mime_type: &str, display_name: &str) -> Result<UploadedFile> {
            self.uploads.lock().unwrap().push(display_name.to_string());
            Ok(UploadedFile {
                name: "files/1".to_string(),
                uri: "mem://files/1".to_string(),
                mime_type: mime_type.to_string(),
            })
        }

        async fn generate_with_file(&self, file: &UploadedFile, prompt: &str) -> Result<String> {
            assert_eq!(file.name, "files/1");
            self.generate(prompt).await
        }
    }

    fn is_map_prompt(prompt: &str) -> bool {
        prompt.contains("Extract key points, strengths, and weaknesses")
    }

    fn always_assess() -> ScriptedClient {
        ScriptedClient::new(|prompt| {
            if is_map_prompt(prompt) {
                "partial notes".to_string()
            } else {
                ASSESSMENT_REPLY.to_string()
            }
        })
    }

    fn text_of_length(len: usize) -> String {
        "abcd ".repeat(len / 5 + 1).chars().take(len).collect()
    }

    // Unique tokens so every chunk's text identifies its position.
    fn numbered_text(words: usize) -> String {
        (0..words)
            .map(|i| format!("tok{:06}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn assessor_for(client: &Arc<ScriptedClient>) -> Assessor {
        Assessor::new(client.clone() as Arc<dyn ModelClient>).unwrap()
    }

    #[tokio::test]
    async fn test_short_path_single_call() {
        let client = Arc::new(always_assess());
        let text = text_of_length(29_999);
        assert_eq!(text.chars().count(), 29_999);

        let outcome = assessor_for(&client).analyze_detailed(&text, None).await.unwrap();

        assert_eq!(outcome.path, AnalysisPath::Short);
        assert_eq!(outcome.model_calls, 1);
        assert_eq!(client.prompts().len(), 1);
        assert_eq!(outcome.assessment.title, "Essay on Rivers");
        assert_eq!(outcome.assessment.score, 87.0);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive_for_short_path() {
        let client = Arc::new(always_assess());
        let text = text_of_length(LONG_DOCUMENT_THRESHOLD);

        assessor_for(&client).analyze(&text, None).await.unwrap();
        assert_eq!(client.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_long_path_map_then_reduce() {
        let client = Arc::new(always_assess());
        let text = text_of_length(30_001);

        let outcome = assessor_for(&client).analyze_detailed(&text, None).await.unwrap();
        let prompts = client.prompts();
        let expected_chunks = TextChunker::chunk_default(&text).len();

        assert_eq!(outcome.path, AnalysisPath::Long);
        assert_eq!(outcome.chunk_count, expected_chunks);
        assert!(prompts.len() >= 2);
        assert_eq!(prompts.len(), expected_chunks + 1);
        assert!(prompts[..expected_chunks].iter().all(|p| is_map_prompt(p)));
        assert!(!is_map_prompt(prompts.last().unwrap()));
        assert!(prompts.last().unwrap().contains("category_scores"));
    }

    #[tokio::test]
    async fn test_summaries_combined_in_chunk_order() {
        let text = numbered_text(6_000);
        let chunks = TextChunker::chunk_default(&text);
        assert!(chunks.len() >= 3);

        let lookup = chunks.clone();
        let client = Arc::new(ScriptedClient::new(move |prompt| {
            if is_map_prompt(prompt) {
                let idx = lookup.iter().position(|c| prompt.contains(c.as_str())).unwrap();
                format!("SUMMARY_{}", idx)
            } else {
                ASSESSMENT_REPLY.to_string()
            }
        }));

        assessor_for(&client).analyze(&text, None).await.unwrap();

        let prompts = client.prompts();
        let reduce = prompts.last().unwrap();
        let positions: Vec<usize> = (0..chunks.len())
            .map(|i| reduce.find(&format!("SUMMARY_{}", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(reduce.contains("SUMMARY_0\n\nSUMMARY_1"));
    }

    #[tokio::test]
    async fn test_concurrent_map_keeps_order() {
        let text = numbered_text(6_000);
        let chunks = TextChunker::chunk_default(&text);
        let total = chunks.len();

        struct SlowFirst {
            inner: ScriptedClient,
            chunks: Vec<String>,
        }

        #[async_trait]
        impl ModelClient for SlowFirst {
            fn model_name(&self) -> &str {
                "slow-first"
            }

            async fn generate(&self, prompt: &str) -> Result<String> {
                if let Some(idx) = self.chunks.iter().position(|c| prompt.contains(c.as_str())) {
                    // Earlier chunks finish last.
                    let delay = 10 * (self.chunks.len() - idx) as u64;
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                self.inner.generate(prompt).await
            }

            async fn upload(&self, bytes: Vec<u8>, mime_type: &str, name: &str) -> Result<UploadedFile> {
                self.inner.upload(bytes, mime_type, name).await
            }

            async fn generate_with_file(&self, file: &UploadedFile, prompt: &str) -> Result<String> {
                self.inner.generate_with_file(file, prompt).await
            }
        }

        let lookup = chunks.clone();
        let client = Arc::new(SlowFirst {
            inner: ScriptedClient::new(move |prompt| {
                if is_map_prompt(prompt) {
                    let idx = lookup.iter().position(|c| prompt.contains(c.as_str())).unwrap();
                    format!("SUMMARY_{}", idx)
                } else {
                    ASSESSMENT_REPLY.to_string()
                }
            }),
            chunks,
        });

        let assessor = Assessor::new(client.clone() as Arc<dyn ModelClient>)
            .unwrap()
            .with_map_concurrency(total);
        assessor.analyze(&text, None).await.unwrap();

        let prompts = client.inner.prompts();
        let expected: Vec<String> = (0..total).map(|i| format!("SUMMARY_{}", i)).collect();
        assert!(prompts.last().unwrap().contains(&expected.join("\n\n")));
    }

    #[tokio::test]
    async fn test_reduce_failure_after_map_calls() {
        // Wide spacing pushes the character count over the threshold while
        // the joined words fit in three chunks.
        let text = vec!["abcd"; 4_000].join("    ");
        assert!(text.chars().count() > LONG_DOCUMENT_THRESHOLD);
        assert_eq!(TextChunker::chunk_default(&text).len(), 3);

        let client = Arc::new(always_assess().failing_on(3));
        let err = assessor_for(&client).analyze(&text, None).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::Service);
        assert_eq!(client.prompts().len(), 4);
    }

    #[tokio::test]
    async fn test_map_failure_stops_remaining_calls() {
        let client = Arc::new(always_assess().failing_on(1));
        let text = text_of_length(40_000);

        let err = assessor_for(&client).analyze(&text, None).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::Service);
        assert_eq!(client.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_reduce_is_parse_failure() {
        let client = Arc::new(ScriptedClient::new(|prompt| {
            if is_map_prompt(prompt) {
                "notes".to_string()
            } else {
                "I cannot produce JSON today.".to_string()
            }
        }));
        let text = text_of_length(35_000);

        let err = assessor_for(&client).analyze(&text, None).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
        assert_eq!(err.raw_response(), Some("I cannot produce JSON today."));
    }

    #[tokio::test]
    async fn test_requirements_reach_every_prompt() {
        let client = Arc::new(always_assess());
        let text = text_of_length(31_000);
        let requirements = "Compare at least two primary sources.";

        assessor_for(&client).analyze(&text, Some(requirements)).await.unwrap();

        let prompts = client.prompts();
        assert!(prompts.len() > 1);
        assert!(prompts.iter().all(|p| p.contains(requirements)));
    }

    #[tokio::test]
    async fn test_run_replaces_session_assessment() {
        let client = Arc::new(always_assess());
        let document = DocumentText {
            content: "A short reflective essay.".to_string(),
            metadata: DocumentMetadata {
                filename: "essay.txt".to_string(),
                source_type: SourceType::Inline,
                format: DocumentFormat::PlainText,
                created_at: chrono::Utc::now().to_rfc3339(),
                byte_size: 25,
            },
        };

        let mut session = AnalysisSession::new(document, None);
        let mut stale = assessor_for(&client).analyze("x", None).await.unwrap();
        stale.title = "Old".to_string();
        session.assessment = Some(stale);

        let session = assessor_for(&client).run(session).await.unwrap();
        assert_eq!(session.assessment.unwrap().title, "Essay on Rivers");
    }

    #[tokio::test]
    async fn test_analyze_file_uploads_then_assesses() {
        let client = Arc::new(always_assess());

        let outcome = assessor_for(&client)
            .analyze_file(b"%PDF".to_vec(), "application/pdf", "scan.pdf", Some("Max 5 pages"))
            .await
            .unwrap();

        assert_eq!(outcome.path, AnalysisPath::File);
        assert_eq!(client.uploads.lock().unwrap().as_slice(), ["scan.pdf".to_string()]);
        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Max 5 pages"));
    }

    fn text_metadata(filename: &str) -> DocumentMetadata {
        DocumentMetadata {
            filename: filename.to_string(),
            source_type: SourceType::LocalFile,
            format: DocumentFormat::from_name(filename),
            created_at: chrono::Utc::now().to_rfc3339(),
            byte_size: 0,
        }
    }

    #[tokio::test]
    async fn test_extracted_document_skips_upload() {
        let client = Arc::new(always_assess());

        let (document, outcome) = assessor_for(&client)
            .analyze_document(b"A short essay.".to_vec(), text_metadata("essay.txt"), None, true)
            .await
            .unwrap();

        assert_eq!(outcome.path, AnalysisPath::Short);
        assert_eq!(document.content, "A short essay.");
        assert!(client.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_falls_back_to_upload() {
        let client = Arc::new(always_assess());

        let (document, outcome) = assessor_for(&client)
            .analyze_document(b"   ".to_vec(), text_metadata("scan.txt"), Some("Max 5 pages"), true)
            .await
            .unwrap();

        assert_eq!(outcome.path, AnalysisPath::File);
        assert!(document.content.is_empty());
        assert_eq!(document.metadata.filename, "scan.txt");
        assert_eq!(client.uploads.lock().unwrap().as_slice(), ["scan.txt".to_string()]);
        assert!(client.prompts()[0].contains("Max 5 pages"));
    }

    #[tokio::test]
    async fn test_extraction_failure_without_fallback_is_surfaced() {
        let client = Arc::new(always_assess());

        let err = assessor_for(&client)
            .analyze_document(b"   ".to_vec(), text_metadata("scan.txt"), None, false)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Extraction);
        assert!(client.prompts().is_empty());
        assert!(client.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_does_not_trigger_upload() {
        let client = Arc::new(always_assess().failing_on(0));

        let err = assessor_for(&client)
            .analyze_document(b"A short essay.".to_vec(), text_metadata("essay.txt"), None, true)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Service);
        assert!(client.uploads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_from_config_uses_map_concurrency() {
        let assessor = Assessor::from_config(ModelConfig::new("key").with_map_concurrency(4)).unwrap();
        assert_eq!(assessor.map_concurrency(), 4);
        assert_eq!(assessor.model_name(), crate::config::DEFAULT_MODEL);

        assert!(Assessor::from_config(ModelConfig::new("key").with_map_concurrency(0)).is_err());
    }

    #[test]
    fn test_combine_summaries() {
        let combined = Assessor::combine_summaries(&["one".to_string(), "two".to_string()]);
        assert_eq!(combined, "one\n\ntwo");
        assert_eq!(Assessor::combine_summaries(&[]), "");
    }
}
