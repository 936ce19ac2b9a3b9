use crate::error::{FeedbackError, Result};
use crate::types::StructuredAssessment;
use regex::Regex;
use tracing::{debug, warn};

/// Pulls a [`StructuredAssessment`] out of free-form model output.
pub struct ResponseParser {
    fence_pattern: Regex,
}

impl ResponseParser {
    pub fn new() -> Result<Self> {
        let fence_pattern = Regex::new(r"(?s)```json\s*(.*?)\s*```").map_err(|e| {
            FeedbackError::Config {
                reason: format!("Invalid fenced block pattern: {}", e),
            }
        })?;

        Ok(Self { fence_pattern })
    }

    /// Decodes the first ```` ```json ```` block, or the whole response when
    /// there is none. More than one tagged block is ambiguous and rejected.
    /// No range checks are applied to the decoded scores.
    pub fn parse(&self, raw_response: &str) -> Result<StructuredAssessment> {
        let payload = self.extract_payload(raw_response)?;
        debug!("Decoding assessment payload of {} bytes", payload.len());

        serde_json::from_str::<StructuredAssessment>(payload).map_err(|e| {
            warn!("Model response did not match the assessment schema: {}", e);
            FeedbackError::Parse {
                reason: e.to_string(),
                raw: raw_response.to_string(),
            }
        })
    }

    fn extract_payload<'a>(&self, raw_response: &'a str) -> Result<&'a str> {
        let blocks: Vec<&'a str> = self
            .fence_pattern
            .captures_iter(raw_response)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        match blocks.as_slice() {
            [] => Ok(raw_response.trim()),
            [block] => Ok(*block),
            many => Err(FeedbackError::Parse {
                reason: format!("Found {} fenced json blocks, expected one", many.len()),
                raw: raw_response.to_string(),
            }),
        }
    }
}
