use crate::{EntityId, GraphError, GraphStats, LlmError, NewRelation, RelationRow, SchemaStatus};
use async_trait::async_trait;

#[async_trait]
pub trait LanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Storage session over the entity/relation tables and the property graph declared on them.
#[async_trait]
pub trait GraphStore {
    /// Creates the tables and the property graph; an existing graph is not an error.
    async fn ensure_schema(&self) -> Result<SchemaStatus, GraphError>;

    /// Atomic insert-or-get by exact name.
    async fn upsert_entity(&self, name: &str) -> Result<EntityId, GraphError>;

    async fn insert_relation(&self, relation: NewRelation<'_>) -> Result<(), GraphError>;

    async fn commit(&self) -> Result<(), GraphError>;

    /// Pattern search over `(entity)-[relation]->(entity)`; `term` must already be lowercase.
    async fn search_relations(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<RelationRow>, GraphError>;

    async fn stats(&self) -> Result<GraphStats, GraphError>;
}
