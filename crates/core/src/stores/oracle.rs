use crate::pattern::{
    Dialect, GraphSchema, RelationPattern, ENTITY_LABEL, LIMIT_BIND, RELATION_LABEL, TERM_BIND,
};
use crate::traits::GraphStore;
use crate::{EntityId, GraphError, GraphStats, NewRelation, RelationRow, SchemaStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

const BACKEND: &str = "oracle";

/// Oracle Database 23ai through the ORDS REST-Enabled SQL service.
///
/// ORDS runs every request in its own session and commits it when the request
/// finishes, so each write call is atomic on its own and `commit` has nothing left to do.
pub struct OracleRestStore {
    sql_url: Url,
    username: String,
    password: String,
    schema: GraphSchema,
    client: Client,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Bind {
    name: &'static str,
    data_type: &'static str,
    value: Value,
}

impl Bind {
    fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            data_type: "VARCHAR2",
            value: Value::String(value.to_string()),
        }
    }

    fn number(name: &'static str, value: i64) -> Self {
        Self {
            name,
            data_type: "NUMBER",
            value: json!(value),
        }
    }
}

impl OracleRestStore {
    pub fn new(
        endpoint: &str,
        schema_alias: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        schema: GraphSchema,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            sql_url: sql_url(endpoint, schema_alias)?,
            username: username.into(),
            password: password.into(),
            schema,
            client: Client::new(),
        })
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    async fn run(&self, statement: &str, binds: &[Bind]) -> Result<Value, GraphError> {
        let response = self
            .client
            .post(self.sql_url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .json(&request_body(statement, binds))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GraphError::BackendResponse {
                backend: BACKEND.to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        check_statement_errors(&body)?;
        Ok(body)
    }

    async fn entity_id(&self, name: &str) -> Result<EntityId, GraphError> {
        let lookup = format!(
            "SELECT id FROM {} WHERE name = :name",
            self.schema.entity_table()
        );
        let body = self.run(&lookup, &[Bind::text("name", name)]).await?;
        result_rows(&body)
            .first()
            .and_then(|row| column(row, "id"))
            .and_then(value_as_i64)
            .ok_or_else(|| GraphError::MissingEntity(name.to_string()))
    }

    fn table_statements(&self) -> [String; 2] {
        let entities = self.schema.entity_table();
        let relations = self.schema.relation_table();
        [
            format!(
                "CREATE TABLE IF NOT EXISTS {entities} (
                    id NUMBER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                    name VARCHAR2(1000) NOT NULL,
                    CONSTRAINT {entities}_name_uk UNIQUE (name)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {relations} (
                    id NUMBER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                    source_id NUMBER NOT NULL REFERENCES {entities}(id),
                    target_id NUMBER NOT NULL REFERENCES {entities}(id),
                    relation_type VARCHAR2(200) NOT NULL,
                    source_text VARCHAR2(1000)
                )"
            ),
        ]
    }

    fn graph_statement(&self) -> String {
        format!(
            "CREATE PROPERTY GRAPH {graph}
                VERTEX TABLES (
                    {entities} KEY (id) LABEL {ENTITY_LABEL} PROPERTIES (id, name)
                )
                EDGE TABLES (
                    {relations} KEY (id)
                        SOURCE KEY (source_id) REFERENCES {entities} (id)
                        DESTINATION KEY (target_id) REFERENCES {entities} (id)
                        LABEL {RELATION_LABEL} PROPERTIES (id, relation_type, source_text)
                )",
            graph = self.schema.graph(),
            entities = self.schema.entity_table(),
            relations = self.schema.relation_table(),
        )
    }
}

#[async_trait]
impl GraphStore for OracleRestStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus, GraphError> {
        for statement in self.table_statements() {
            self.run(&statement, &[]).await?;
        }

        match self.run(&self.graph_statement(), &[]).await {
            Ok(_) => Ok(SchemaStatus::Created),
            Err(error) if error.is_already_exists() => Ok(SchemaStatus::AlreadyExists),
            Err(error) => Err(error),
        }
    }

    async fn upsert_entity(&self, name: &str) -> Result<EntityId, GraphError> {
        let merge = format!(
            "MERGE INTO {} e
             USING (SELECT :name AS name FROM dual) s
             ON (e.name = s.name)
             WHEN NOT MATCHED THEN INSERT (name) VALUES (s.name)",
            self.schema.entity_table()
        );

        match self.run(&merge, &[Bind::text("name", name)]).await {
            Ok(_) => {}
            // Another writer inserted the same name between our match and insert.
            Err(error) if error.is_unique_violation() => {
                debug!(backend = BACKEND, entity = name, "entity inserted concurrently");
            }
            Err(error) => return Err(error),
        }

        self.entity_id(name).await
    }

    async fn insert_relation(&self, relation: NewRelation<'_>) -> Result<(), GraphError> {
        let statement = format!(
            "INSERT INTO {} (source_id, target_id, relation_type, source_text)
             VALUES (:source_id, :target_id, :relation_type, :source_text)",
            self.schema.relation_table()
        );

        self.run(
            &statement,
            &[
                Bind::number("source_id", relation.source_id),
                Bind::number("target_id", relation.target_id),
                Bind::text("relation_type", relation.relation_type),
                Bind::text("source_text", relation.provenance),
            ],
        )
        .await?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), GraphError> {
        debug!(backend = BACKEND, "writes were committed per request");
        Ok(())
    }

    async fn search_relations(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<RelationRow>, GraphError> {
        let query = RelationPattern::new(&self.schema).render(Dialect::SqlPgq);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let body = self
            .run(
                &query,
                &[Bind::text(TERM_BIND, term), Bind::number(LIMIT_BIND, limit)],
            )
            .await?;

        Ok(result_rows(&body)
            .into_iter()
            .map(|row| RelationRow {
                from: text_column(row, "from_entity"),
                relation: text_column(row, "relation"),
                to: text_column(row, "to_entity"),
            })
            .collect())
    }

    async fn stats(&self) -> Result<GraphStats, GraphError> {
        let query = format!(
            "SELECT (SELECT COUNT(*) FROM {}) AS entities,
                    (SELECT COUNT(*) FROM {}) AS relations
             FROM dual",
            self.schema.entity_table(),
            self.schema.relation_table()
        );
        let body = self.run(&query, &[]).await?;
        let row = result_rows(&body)
            .first()
            .copied()
            .ok_or_else(|| GraphError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "count query returned no rows".to_string(),
            })?;

        let count = |name: &str| {
            column(row, name)
                .and_then(value_as_i64)
                .map(|value| value.max(0) as u64)
                .unwrap_or_default()
        };

        Ok(GraphStats {
            entities: count("entities"),
            relations: count("relations"),
        })
    }
}

fn sql_url(endpoint: &str, schema_alias: &str) -> Result<Url, GraphError> {
    let mut base = Url::parse(endpoint)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("ords/{schema_alias}/_/sql"))?)
}

fn request_body(statement: &str, binds: &[Bind]) -> Value {
    if binds.is_empty() {
        json!({ "statementText": statement })
    } else {
        json!({ "statementText": statement, "binds": binds })
    }
}

fn check_statement_errors(payload: &Value) -> Result<(), GraphError> {
    let Some(items) = payload.pointer("/items").and_then(Value::as_array) else {
        return Err(GraphError::BackendResponse {
            backend: BACKEND.to_string(),
            details: "response has no items".to_string(),
        });
    };

    for item in items {
        let Some(code) = item.get("errorCode") else {
            continue;
        };
        let code = match code {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let message = item
            .get("errorDetails")
            .or_else(|| item.get("errorMessage"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        return Err(GraphError::Statement {
            backend: BACKEND.to_string(),
            code,
            message,
        });
    }

    Ok(())
}

fn result_rows(payload: &Value) -> Vec<&Map<String, Value>> {
    payload
        .pointer("/items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer("/resultSet/items").and_then(Value::as_array))
                .flatten()
                .filter_map(Value::as_object)
                .collect()
        })
        .unwrap_or_default()
}

fn column<'a>(row: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    row.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn text_column(row: &Map<String, Value>, name: &str) -> String {
    column(row, name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn value_as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|number| number as i64))
        .or_else(|| value.as_str().and_then(|text| text.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_at(endpoint: &str) -> OracleRestStore {
        OracleRestStore::new(endpoint, "kg", "kg", "secret", GraphSchema::default()).unwrap()
    }

    async fn mount_entity_lookup(server: &MockServer, id: i64) {
        Mock::given(method("POST"))
            .and(path("/ords/kg/_/sql"))
            .and(body_string_contains("SELECT id FROM kg_entities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "statementId": 1,
                    "statementType": "query",
                    "resultSet": {"items": [{"ID": id}], "hasMore": false}
                }]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn merge_reply(item: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "items": [item] }))
    }

    #[tokio::test]
    async fn upsert_reads_back_the_id_after_merge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("MERGE INTO kg_entities"))
            .respond_with(merge_reply(json!({"statementId": 1, "result": 1})))
            .expect(1)
            .mount(&server)
            .await;
        mount_entity_lookup(&server, 7).await;

        let store = store_at(&server.uri());
        assert_eq!(store.upsert_entity("Kafka").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn concurrent_insert_of_the_same_name_resolves_to_the_existing_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("MERGE INTO kg_entities"))
            .respond_with(merge_reply(json!({
                "statementId": 1,
                "errorCode": 1,
                "errorDetails": "ORA-00001: unique constraint (KG.KG_ENTITIES_NAME_UK) violated"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_entity_lookup(&server, 42).await;

        let store = store_at(&server.uri());
        assert_eq!(store.upsert_entity("Kafka").await.unwrap(), 42);
    }

    #[tokio::test]
    async fn other_merge_errors_are_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("MERGE INTO kg_entities"))
            .respond_with(merge_reply(json!({
                "statementId": 1,
                "errorCode": 942,
                "errorDetails": "ORA-00942: table or view does not exist"
            })))
            .mount(&server)
            .await;

        let store = store_at(&server.uri());
        let error = store.upsert_entity("Kafka").await.unwrap_err();
        assert!(matches!(error, GraphError::Statement { ref code, .. } if code == "942"));
    }

    #[test]
    fn sql_url_points_at_rest_enabled_sql() {
        let url = sql_url("https://db.example.com", "kg_user").unwrap();
        assert_eq!(url.as_str(), "https://db.example.com/ords/kg_user/_/sql");

        let nested = sql_url("https://db.example.com/base", "kg_user").unwrap();
        assert_eq!(nested.as_str(), "https://db.example.com/base/ords/kg_user/_/sql");
    }

    #[test]
    fn search_term_travels_as_a_bind() {
        let body = request_body(
            "SELECT 1 FROM dual WHERE :term IS NOT NULL",
            &[Bind::text(TERM_BIND, "kafka' --"), Bind::number(LIMIT_BIND, 20)],
        );

        assert_eq!(body["binds"][0]["name"], "term");
        assert_eq!(body["binds"][0]["data_type"], "VARCHAR2");
        assert_eq!(body["binds"][0]["value"], "kafka' --");
        assert_eq!(body["binds"][1]["value"], 20);
        assert!(!body["statementText"].as_str().unwrap().contains("kafka"));
    }

    #[test]
    fn rows_are_read_from_every_result_set() {
        let payload = json!({
            "items": [
                {"statementId": 1, "statementType": "dml", "result": 1, "response": []},
                {
                    "statementId": 2,
                    "statementType": "query",
                    "resultSet": {
                        "metadata": [],
                        "items": [
                            {
                                "from_entity": "Kafka",
                                "relation": "PRODUCES",
                                "to_entity": "Events"
                            },
                            {
                                "FROM_ENTITY": "Consumer",
                                "RELATION": "READS_FROM",
                                "TO_ENTITY": "Kafka"
                            }
                        ],
                        "hasMore": false
                    }
                }
            ]
        });

        let rows = result_rows(&payload);
        assert_eq!(rows.len(), 2);
        assert_eq!(text_column(rows[1], "from_entity"), "Consumer");
        assert_eq!(text_column(rows[0], "to_entity"), "Events");
    }

    #[test]
    fn statement_errors_are_surfaced_and_classified() {
        let payload = json!({
            "items": [{
                "statementId": 1,
                "errorCode": 955,
                "errorDetails": "ORA-00955: name is already used by an existing object"
            }]
        });

        let error = check_statement_errors(&payload).unwrap_err();
        assert!(error.is_already_exists());

        let other = json!({"items": [{
            "errorCode": 942,
            "errorDetails": "ORA-00942: table or view does not exist"
        }]});
        let error = check_statement_errors(&other).unwrap_err();
        assert!(!error.is_already_exists());
        assert!(!error.is_unique_violation());

        let duplicate = json!({"items": [{
            "errorCode": 1,
            "errorDetails": "ORA-00001: unique constraint (KG.KG_ENTITIES_NAME_UK) violated"
        }]});
        let error = check_statement_errors(&duplicate).unwrap_err();
        assert!(error.is_unique_violation());
        assert!(!error.is_already_exists());

        assert!(check_statement_errors(&json!({"items": []})).is_ok());
        assert!(check_statement_errors(&json!({"oops": true})).is_err());
    }

    #[test]
    fn numeric_ids_accept_number_and_text() {
        assert_eq!(value_as_i64(&json!(7)), Some(7));
        assert_eq!(value_as_i64(&json!(7.0)), Some(7));
        assert_eq!(value_as_i64(&json!("7")), Some(7));
        assert_eq!(value_as_i64(&json!(null)), None);
    }

    #[test]
    fn graph_ddl_declares_both_labels() {
        let store = store_at("http://localhost:8080");
        let ddl = store.graph_statement();
        assert!(ddl.contains("CREATE PROPERTY GRAPH kg_graph"));
        assert!(ddl.contains("LABEL entity"));
        assert!(ddl.contains("LABEL relation"));
        assert!(ddl.contains("DESTINATION KEY (target_id) REFERENCES kg_entities (id)"));
    }
}
