use crate::keywords::extract_keywords;
use crate::loader::load_chunks;
use crate::search::search_graph;
use crate::traits::{GraphStore, LanguageModel};
use crate::{Answer, DocumentChunk, LoadReport, SearchOutcome};

/// Holds the storage session and the model client that every procedure is handed.
pub struct KnowledgeGraph<S, L>
where
    S: GraphStore,
    L: LanguageModel,
{
    store: S,
    llm: L,
}

impl<S, L> KnowledgeGraph<S, L>
where
    S: GraphStore + Send + Sync,
    L: LanguageModel + Send + Sync,
{
    pub fn new(store: S, llm: L) -> Self {
        Self { store, llm }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn ingest(&self, chunks: &[DocumentChunk]) -> LoadReport {
        load_chunks(&self.store, &self.llm, chunks).await
    }

    pub async fn keywords(&self, question: &str) -> String {
        extract_keywords(&self.llm, question).await
    }

    pub async fn search(&self, text: &str) -> SearchOutcome {
        search_graph(&self.store, text).await
    }

    /// Keyword extraction followed by a graph search on the joined keyword string.
    pub async fn ask(&self, question: &str) -> Answer {
        let keywords = self.keywords(question).await;
        let outcome = self.search(&keywords).await;
        Answer {
            question: question.to_string(),
            keywords,
            outcome,
        }
    }
}
