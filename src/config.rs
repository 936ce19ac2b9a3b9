use crate::error::{FeedbackError, Result};
use std::env;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Settings for talking to the model service.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Upper bound on in-flight map-phase requests. 1 keeps chunks strictly sequential.
    pub map_concurrency: usize,
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            map_concurrency: 1,
        }
    }

    /// Reads `GEMINI_API_KEY`, `GEMINI_MODEL` and `GEMINI_BASE_URL`, loading a
    /// `.env` file first when one is present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("GEMINI_API_KEY").map_err(|_| FeedbackError::Config {
            reason: "No Gemini API key found. Set GEMINI_API_KEY in the environment or a .env file"
                .to_string(),
        })?;

        let mut config = Self::new(api_key);
        if let Ok(model) = env::var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_map_concurrency(mut self, map_concurrency: usize) -> Self {
        self.map_concurrency = map_concurrency;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(FeedbackError::Config {
                reason: "API key must not be empty".to_string(),
            });
        }

        if self.model.trim().is_empty() {
            return Err(FeedbackError::Config {
                reason: "Model identifier must not be empty".to_string(),
            });
        }

        if self.map_concurrency == 0 {
            return Err(FeedbackError::Config {
                reason: "Map concurrency must be greater than 0".to_string(),
            });
        }

        url::Url::parse(&self.base_url)?;
        Ok(())
    }
}
