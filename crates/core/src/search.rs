use crate::pattern::SEARCH_LIMIT;
use crate::traits::GraphStore;
use crate::SearchOutcome;
use tracing::{debug, warn};

/// Runs the relation pattern search for `text` and never fails: storage errors come
/// back as [`SearchOutcome::Failed`].
pub async fn search_graph<S>(store: &S, text: &str) -> SearchOutcome
where
    S: GraphStore + ?Sized + Sync,
{
    if text.trim().is_empty() {
        debug!("blank graph search text");
        return SearchOutcome::NoMatches;
    }
    // Surrounding whitespace is part of the substring.
    let term = text.to_lowercase();

    match store.search_relations(&term, SEARCH_LIMIT).await {
        Ok(rows) if rows.is_empty() => SearchOutcome::NoMatches,
        Ok(mut rows) => {
            rows.truncate(SEARCH_LIMIT);
            SearchOutcome::Matches(rows)
        }
        Err(error) => {
            warn!(error = %error, term = %term, "graph search failed");
            SearchOutcome::Failed(error.to_string())
        }
    }
}
