use crate::traits::{GraphStore, LanguageModel};
use crate::triples::{parse_extraction, Extraction};
use crate::{
    ChunkOutcome, ChunkReport, CommitOutcome, DocumentChunk, EntityId, GraphError, LoadReport,
    NewRelation, SchemaOutcome, SkipReason, Triple, TripleOutcome,
};
use tracing::{info, warn};

pub fn extraction_prompt(text: &str) -> String {
    format!(
        "Extract the relationships between entities in the text below.\n\
         Return one relationship per line, exactly in this form:\n\
         Entity1 -[RELATION]-> Entity2\n\
         Use concise entity names and an UPPER_SNAKE_CASE relation type.\n\
         Do not number the lines and do not add any explanation.\n\
         If the text contains no relationships, return only: NONE\n\n\
         Text:\n{text}"
    )
}

/// Ensures the schema, extracts triples from every chunk and writes them, then commits once.
///
/// Nothing here returns an error: every failure lands in the report and the log, and the
/// batch carries on with the next triple or chunk.
pub async fn load_chunks<S, L>(store: &S, llm: &L, chunks: &[DocumentChunk]) -> LoadReport
where
    S: GraphStore + ?Sized + Sync,
    L: LanguageModel + ?Sized + Sync,
{
    let schema = ensure_schema(store).await;

    let mut reports = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let outcome = load_chunk(store, llm, chunk).await;
        reports.push(ChunkReport {
            source: chunk.source.clone(),
            outcome,
        });
    }

    let commit = match store.commit().await {
        Ok(()) => {
            info!(chunks = chunks.len(), "knowledge graph updated");
            CommitOutcome::Committed
        }
        Err(error) => {
            warn!(error = %error, "knowledge graph commit failed");
            CommitOutcome::Failed(error.to_string())
        }
    };

    LoadReport {
        schema,
        chunks: reports,
        commit,
    }
}

async fn ensure_schema<S>(store: &S) -> SchemaOutcome
where
    S: GraphStore + ?Sized + Sync,
{
    match store.ensure_schema().await {
        Ok(status) => {
            let outcome = SchemaOutcome::from(status);
            if outcome == SchemaOutcome::Created {
                info!("property graph created");
            }
            outcome
        }
        Err(error) => {
            warn!(error = %error, "property graph setup failed; continuing with existing schema");
            SchemaOutcome::Failed(error.to_string())
        }
    }
}

pub async fn load_chunk<S, L>(store: &S, llm: &L, chunk: &DocumentChunk) -> ChunkOutcome
where
    S: GraphStore + ?Sized + Sync,
    L: LanguageModel + ?Sized + Sync,
{
    if chunk.text.trim().is_empty() {
        return ChunkOutcome::Skipped(SkipReason::EmptyText);
    }

    let response = match llm.complete(&extraction_prompt(&chunk.text)).await {
        Ok(response) => response,
        Err(error) => {
            warn!(
                source = %chunk.source,
                error = %error,
                "triple extraction failed; skipping chunk"
            );
            return ChunkOutcome::Skipped(SkipReason::LlmFailed(error.to_string()));
        }
    };

    let (triples, discarded_lines) = match parse_extraction(&response) {
        Extraction::None => return ChunkOutcome::Skipped(SkipReason::NoTriples),
        Extraction::Triples { triples, discarded } => (triples, discarded),
    };

    let mut outcomes = Vec::with_capacity(triples.len());
    for triple in triples {
        let outcome = match write_triple(store, &triple, &chunk.source).await {
            Ok((source_id, target_id)) => {
                info!(source = %chunk.source, triple = %triple, "inserted triple");
                TripleOutcome::Inserted {
                    triple,
                    source_id,
                    target_id,
                }
            }
            Err(error) => {
                warn!(
                    source = %chunk.source,
                    triple = %triple,
                    error = %error,
                    "failed to insert triple"
                );
                TripleOutcome::Failed {
                    triple,
                    cause: error.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }

    ChunkOutcome::Processed {
        triples: outcomes,
        discarded_lines,
    }
}

async fn write_triple<S>(
    store: &S,
    triple: &Triple,
    provenance: &str,
) -> Result<(EntityId, EntityId), GraphError>
where
    S: GraphStore + ?Sized + Sync,
{
    let source_id = store.upsert_entity(&triple.source).await?;
    let target_id = store.upsert_entity(&triple.target).await?;
    store
        .insert_relation(NewRelation {
            source_id,
            target_id,
            relation_type: &triple.relation,
            provenance,
        })
        .await?;
    Ok((source_id, target_id))
}
