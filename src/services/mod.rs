pub mod assessor;
pub mod chunker;
pub mod extractor;
pub mod model;
pub mod parser;
pub mod prompts;

pub use assessor::{Assessor, LONG_DOCUMENT_THRESHOLD};
pub use chunker::{TextChunker, DEFAULT_MAX_CHUNK_SIZE};
pub use extractor::DocumentExtractor;
pub use model::{GeminiClient, ModelClient};
pub use parser::ResponseParser;
