use crate::pattern::{Dialect, GraphSchema, RelationPattern, UNICODE_LOWER_FN};
use crate::traits::GraphStore;
use crate::{EntityId, GraphError, GraphStats, NewRelation, RelationRow, SchemaStatus};
use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Embedded backend. The property graph is declared as a view joining both endpoints
/// of every relation, and searches read that view.
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
    schema: GraphSchema,
}

impl SqliteGraphStore {
    pub fn open(path: impl AsRef<Path>, schema: GraphSchema) -> Result<Self, GraphError> {
        Self::with_connection(Connection::open(path)?, schema)
    }

    pub fn in_memory(schema: GraphSchema) -> Result<Self, GraphError> {
        Self::with_connection(Connection::open_in_memory()?, schema)
    }

    fn with_connection(conn: Connection, schema: GraphSchema) -> Result<Self, GraphError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.create_scalar_function(
            UNICODE_LOWER_FN,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|text| text.to_lowercase()))
            },
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            schema,
        })
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, GraphError> {
        self.conn.lock().map_err(|_| GraphError::BackendResponse {
            backend: "sqlite".to_string(),
            details: "connection mutex poisoned".to_string(),
        })
    }

    fn table_ddl(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {entities} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS {relations} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id INTEGER NOT NULL REFERENCES {entities}(id),
                target_id INTEGER NOT NULL REFERENCES {entities}(id),
                relation_type TEXT NOT NULL,
                source_text TEXT
            );",
            entities = self.schema.entity_table(),
            relations = self.schema.relation_table(),
        )
    }

    fn graph_ddl(&self) -> String {
        format!(
            "CREATE VIEW {graph} AS
             SELECT r.id AS relation_id,
                    e1.id AS source_id, e1.name AS source_name,
                    r.relation_type, r.source_text,
                    e2.id AS target_id, e2.name AS target_name
             FROM {relations} r
             JOIN {entities} e1 ON e1.id = r.source_id
             JOIN {entities} e2 ON e2.id = r.target_id",
            graph = self.schema.graph(),
            entities = self.schema.entity_table(),
            relations = self.schema.relation_table(),
        )
    }
}

fn begin_if_needed(conn: &Connection) -> Result<(), GraphError> {
    if conn.is_autocommit() {
        conn.execute_batch("BEGIN")?;
    }
    Ok(())
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus, GraphError> {
        let conn = self.lock()?;
        conn.execute_batch(&self.table_ddl())?;

        match conn.execute_batch(&self.graph_ddl()) {
            Ok(()) => Ok(SchemaStatus::Created),
            Err(error) => {
                let error = GraphError::from(error);
                if error.is_already_exists() {
                    Ok(SchemaStatus::AlreadyExists)
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn upsert_entity(&self, name: &str) -> Result<EntityId, GraphError> {
        let conn = self.lock()?;
        begin_if_needed(&conn)?;

        conn.execute(
            &format!(
                "INSERT INTO {} (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                self.schema.entity_table()
            ),
            params![name],
        )?;

        conn.query_row(
            &format!("SELECT id FROM {} WHERE name = ?1", self.schema.entity_table()),
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| GraphError::MissingEntity(name.to_string()))
    }

    async fn insert_relation(&self, relation: NewRelation<'_>) -> Result<(), GraphError> {
        let conn = self.lock()?;
        begin_if_needed(&conn)?;

        conn.execute(
            &format!(
                "INSERT INTO {} (source_id, target_id, relation_type, source_text)
                 VALUES (?1, ?2, ?3, ?4)",
                self.schema.relation_table()
            ),
            params![
                relation.source_id,
                relation.target_id,
                relation.relation_type,
                relation.provenance
            ],
        )?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), GraphError> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            debug!("sqlite commit requested with no open transaction");
            return Ok(());
        }
        conn.execute_batch("COMMIT")?;
        Ok(())
    }

    async fn search_relations(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<RelationRow>, GraphError> {
        let conn = self.lock()?;
        let sql = RelationPattern::new(&self.schema).render(Dialect::Sqlite);
        let mut stmt = conn.prepare(&sql)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = stmt.query_map(params![term, limit], |row| {
            Ok(RelationRow {
                from: row.get(0)?,
                relation: row.get(1)?,
                to: row.get(2)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(GraphError::from)
    }

    async fn stats(&self) -> Result<GraphStats, GraphError> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<u64, GraphError> {
            let value: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(value.max(0) as u64)
        };

        Ok(GraphStats {
            entities: count(self.schema.entity_table())?,
            relations: count(self.schema.relation_table())?,
        })
    }
}
