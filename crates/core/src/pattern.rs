use crate::GraphError;
use regex::Regex;
use std::sync::OnceLock;

pub const SEARCH_LIMIT: usize = 20;

/// Names of the property graph, its backing tables and its labels.
///
/// These end up inside SQL text, so every name is checked to be a plain identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSchema {
    graph: String,
    entity_table: String,
    relation_table: String,
}

pub const ENTITY_LABEL: &str = "entity";
pub const RELATION_LABEL: &str = "relation";

impl Default for GraphSchema {
    fn default() -> Self {
        Self {
            graph: "kg_graph".to_string(),
            entity_table: "kg_entities".to_string(),
            relation_table: "kg_relations".to_string(),
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("static regex is valid"))
}

fn checked(name: &str) -> Result<String, GraphError> {
    if identifier_pattern().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(GraphError::InvalidIdentifier(name.to_string()))
    }
}

impl GraphSchema {
    pub fn new(
        graph: &str,
        entity_table: &str,
        relation_table: &str,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            graph: checked(graph)?,
            entity_table: checked(entity_table)?,
            relation_table: checked(relation_table)?,
        })
    }

    /// `<graph>` plus `<graph>_entities` / `<graph>_relations`.
    pub fn named(graph: &str) -> Result<Self, GraphError> {
        let graph = checked(graph)?;
        Ok(Self {
            entity_table: format!("{graph}_entities"),
            relation_table: format!("{graph}_relations"),
            graph,
        })
    }

    pub fn graph(&self) -> &str {
        &self.graph
    }

    pub fn entity_table(&self) -> &str {
        &self.entity_table
    }

    pub fn relation_table(&self) -> &str {
        &self.relation_table
    }
}

/// `(e1 IS entity) -[r IS relation]-> (e2 IS entity)` filtered by a containment
/// predicate on source name, relation label and target name.
///
/// The rendered text carries two placeholders, one for the lowercase search term
/// and one for the row limit; neither value is ever spliced into the SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPattern<'a> {
    schema: &'a GraphSchema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQL/PGQ `GRAPH_TABLE` with named binds (`:term`, `:limit`).
    SqlPgq,
    /// Query over the SQLite graph view with positional binds (`?1` term, `?2` limit).
    Sqlite,
}

pub const TERM_BIND: &str = "term";
/// Unicode-aware lowercase registered on every SQLite connection; the built-in
/// `lower()` only folds ASCII.
pub const UNICODE_LOWER_FN: &str = "lower_utf8";
pub const LIMIT_BIND: &str = "limit";

impl<'a> RelationPattern<'a> {
    pub fn new(schema: &'a GraphSchema) -> Self {
        Self { schema }
    }

    pub fn render(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::SqlPgq => self.render_pgq(),
            Dialect::Sqlite => self.render_view(),
        }
    }

    fn render_pgq(&self) -> String {
        let contains = |column: &str| format!("INSTR(LOWER({column}), :{TERM_BIND}) > 0");
        format!(
            "SELECT from_entity, relation, to_entity\n\
             FROM GRAPH_TABLE ( {graph}\n\
             \x20 MATCH (e1 IS {ENTITY_LABEL}) -[r IS {RELATION_LABEL}]-> (e2 IS {ENTITY_LABEL})\n\
             \x20 WHERE {source} OR {relation} OR {target}\n\
             \x20 COLUMNS (e1.name AS from_entity, r.relation_type AS relation, \
             e2.name AS to_entity)\n\
             )\n\
             FETCH FIRST :{LIMIT_BIND} ROWS ONLY",
            graph = self.schema.graph(),
            source = contains("e1.name"),
            relation = contains("r.relation_type"),
            target = contains("e2.name"),
        )
    }

    fn render_view(&self) -> String {
        let contains =
            |column: &str| format!("instr({UNICODE_LOWER_FN}({column}), ?1) > 0");
        format!(
            "SELECT source_name AS from_entity, relation_type AS relation, \
             target_name AS to_entity\n\
             FROM {graph}\n\
             WHERE {source} OR {relation} OR {target}\n\
             LIMIT ?2",
            graph = self.schema.graph(),
            source = contains("source_name"),
            relation = contains("relation_type"),
            target = contains("target_name"),
        )
    }
}
