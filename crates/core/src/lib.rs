pub mod chunking;
pub mod error;
pub mod ingest;
pub mod keywords;
pub mod llm;
pub mod loader;
pub mod models;
pub mod orchestrator;
pub mod pattern;
pub mod search;
pub mod stores;
pub mod traits;
pub mod triples;

pub use chunking::{build_chunks, chunk_by_paragraph, normalize_whitespace, ChunkingConfig};
pub use error::{GraphError, IngestError, LlmError};
pub use ingest::{
    discover_text_files, load_folder_chunks, load_folder_chunks_best_effort, IngestionReport,
    SkippedFile,
};
pub use keywords::{extract_keywords, normalize_keywords, try_extract_keywords};
pub use llm::{LlmConfig, OpenAiChatClient, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
pub use loader::{load_chunk, load_chunks};
pub use models::{
    Answer, ChunkOutcome, ChunkReport, CommitOutcome, DocumentChunk, EntityId, GraphStats,
    LoadReport, NewRelation, RelationRow, SchemaOutcome, SchemaStatus, SearchOutcome, SkipReason,
    Triple, TripleOutcome, NO_RELATIONSHIPS_MESSAGE, SEARCH_ERROR_PREFIX,
};
pub use orchestrator::KnowledgeGraph;
pub use pattern::{GraphSchema, RelationPattern, SEARCH_LIMIT};
pub use search::search_graph;
pub use stores::{OracleRestStore, SqliteGraphStore};
pub use traits::{GraphStore, LanguageModel};
pub use triples::{normalize_relation, parse_extraction, parse_triple_line, Extraction};
