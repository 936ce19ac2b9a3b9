use clap::{Args, Parser, Subcommand};
use pdf_feedback::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use pdf_feedback::DEFAULT_MAX_CHUNK_SIZE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-feedback")]
#[command(about = "A CLI tool for grading PDF assignments with an LLM and producing structured feedback")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output directory for feedback reports
    #[arg(short, long, global = true, default_value = "./feedback")]
    pub output: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Grade assignments and write feedback reports
    Analyze(AnalyzeArgs),

    /// Preview how documents would be chunked, without calling the model
    Chunk(ChunkArgs),

    /// Validate input sources
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct ModelArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Model identifier
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the model service
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum chunk requests in flight during the map phase
    #[arg(long, default_value = "1")]
    pub concurrency: usize,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Assignment sources (file paths, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Requirements document (file path or URL)
    #[arg(long, value_name = "SOURCE", conflicts_with = "requirements_text")]
    pub requirements: Option<String>,

    /// Requirements given directly as text
    #[arg(long, value_name = "TEXT")]
    pub requirements_text: Option<String>,

    /// Upload documents whose text cannot be extracted and let the model read them
    #[arg(long)]
    pub upload_fallback: bool,

    /// Also write all reports to a single JSON file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Force overwrite existing output files
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub service: ModelArgs,
}

#[derive(Args)]
pub struct ChunkArgs {
    /// Input sources (file paths, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Maximum characters per chunk
    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_SIZE)]
    pub max_chunk_size: usize,

    /// Show every chunk's size
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input sources (file paths, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Check that text can be extracted from each source
    #[arg(long)]
    pub check_access: bool,
}
