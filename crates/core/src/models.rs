use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntityId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Triple {
    pub source: String,
    pub relation: String,
    pub target: String,
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.relation, self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRelation<'a> {
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub relation_type: &'a str,
    pub provenance: &'a str,
}

/// One row of a graph search: the names on both ends and the edge label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationRow {
    pub from: String,
    pub relation: String,
    pub to: String,
}

impl fmt::Display for RelationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.from, self.relation, self.to)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GraphStats {
    pub entities: u64,
    pub relations: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchemaStatus {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchemaOutcome {
    Created,
    AlreadyExists,
    Failed(String),
}

impl From<SchemaStatus> for SchemaOutcome {
    fn from(value: SchemaStatus) -> Self {
        match value {
            SchemaStatus::Created => SchemaOutcome::Created,
            SchemaStatus::AlreadyExists => SchemaOutcome::AlreadyExists,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipReason {
    EmptyText,
    NoTriples,
    LlmFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TripleOutcome {
    Inserted {
        triple: Triple,
        source_id: EntityId,
        target_id: EntityId,
    },
    Failed {
        triple: Triple,
        cause: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChunkOutcome {
    Skipped(SkipReason),
    Processed {
        triples: Vec<TripleOutcome>,
        discarded_lines: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkReport {
    pub source: String,
    pub outcome: ChunkOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadReport {
    pub schema: SchemaOutcome,
    pub chunks: Vec<ChunkReport>,
    pub commit: CommitOutcome,
}

impl LoadReport {
    fn triple_outcomes(&self) -> impl Iterator<Item = &TripleOutcome> {
        self.chunks.iter().flat_map(|chunk| {
            let triples: &[TripleOutcome] = match &chunk.outcome {
                ChunkOutcome::Processed { triples, .. } => triples,
                ChunkOutcome::Skipped(_) => &[],
            };
            triples
        })
    }

    pub fn inserted_count(&self) -> usize {
        self.triple_outcomes()
            .filter(|outcome| matches!(outcome, TripleOutcome::Inserted { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.triple_outcomes()
            .filter(|outcome| matches!(outcome, TripleOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| matches!(chunk.outcome, ChunkOutcome::Skipped(_)))
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SearchOutcome {
    Matches(Vec<RelationRow>),
    NoMatches,
    Failed(String),
}

pub const NO_RELATIONSHIPS_MESSAGE: &str = "No relationships found matching the query.";
pub const SEARCH_ERROR_PREFIX: &str = "Error executing graph query: ";

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Matches(rows) => {
                let lines = rows.iter().map(ToString::to_string).collect::<Vec<_>>();
                f.write_str(&lines.join("\n"))
            }
            SearchOutcome::NoMatches => f.write_str(NO_RELATIONSHIPS_MESSAGE),
            SearchOutcome::Failed(cause) => write!(f, "{SEARCH_ERROR_PREFIX}{cause}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub question: String,
    pub keywords: String,
    pub outcome: SearchOutcome,
}
