//! SQLite document store
//!
//! One row per document in the `documents` table; the body is stored as
//! JSON text and queried with `json_extract` / `json_each`.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::store::{
    Direction, Document, DocumentStore, Fields, Filter, Query, WriteBatch, WriteOp, already_exists,
    missing_document,
};
use crate::error::AppError;
use crate::metrics::observe_store_op;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Document store connected and migrated");

        Ok(Self { pool })
    }
}

fn json_path(field: &str) -> String {
    format!("'$.{field}'")
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Bool(flag) => {
            builder.push_bind(*flag);
        }
        Value::Number(number) => match number.as_i64() {
            Some(int) => {
                builder.push_bind(int);
            }
            None => {
                builder.push_bind(number.as_f64().unwrap_or(0.0));
            }
        },
        Value::String(text) => {
            builder.push_bind(text.clone());
        }
        Value::Null => {
            builder.push("NULL");
        }
        Value::Array(_) | Value::Object(_) => {
            builder.push("json(");
            builder.push_bind(value.to_string());
            builder.push(")");
        }
    }
}

/// Build `SELECT <columns> FROM documents WHERE ...` for a query.
fn build_select<'q>(columns: &str, query: &'q Query, ordered: bool) -> QueryBuilder<'q, Sqlite> {
    let mut builder = QueryBuilder::new(format!("SELECT {columns} FROM documents WHERE collection = "));
    builder.push_bind(query.collection.as_str());

    for filter in &query.filters {
        match filter {
            Filter::Equals { field, value: Value::Null } => {
                builder.push(format!(" AND json_extract(data, {}) IS NULL", json_path(field)));
            }
            Filter::Equals { field, value } => {
                builder.push(format!(" AND json_extract(data, {}) = ", json_path(field)));
                push_value(&mut builder, value);
            }
            Filter::ArrayContains { field, value } => {
                builder.push(format!(
                    " AND EXISTS (SELECT 1 FROM json_each(data, {}) WHERE json_each.value = ",
                    json_path(field)
                ));
                push_value(&mut builder, value);
                builder.push(")");
            }
        }
    }

    if !ordered {
        return builder;
    }

    if let Some((field, direction)) = &query.order_by {
        let sort_key = format!("json_extract(data, {})", json_path(field));
        builder.push(format!(" AND json_type(data, {}) IS NOT NULL", json_path(field)));

        if let Some((after_value, after_id)) = &query.start_after {
            let cmp = match direction {
                Direction::Ascending => ">",
                Direction::Descending => "<",
            };
            builder.push(format!(" AND ({sort_key} {cmp} "));
            push_value(&mut builder, after_value);
            builder.push(format!(" OR ({sort_key} = "));
            push_value(&mut builder, after_value);
            builder.push(format!(" AND id {cmp} "));
            builder.push_bind(after_id.as_str());
            builder.push("))");
        }

        let dir = direction.as_sql();
        builder.push(format!(" ORDER BY {sort_key} {dir}, id {dir}"));
    } else {
        builder.push(" ORDER BY id ASC");
    }

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit as i64);
    }

    builder
}

fn parse_fields(raw: &str) -> Result<Fields, AppError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(AppError::Internal(anyhow::anyhow!(
            "stored document is not a JSON object"
        ))),
    }
}

async fn apply_op(conn: &mut SqliteConnection, op: &WriteOp) -> Result<(), AppError> {
    match op {
        WriteOp::Create {
            collection,
            id,
            fields,
        } => {
            let result = sqlx::query(
                "INSERT INTO documents (collection, id, data) VALUES (?, ?, ?) \
                 ON CONFLICT(collection, id) DO NOTHING",
            )
            .bind(collection)
            .bind(id)
            .bind(Value::Object(fields.clone()).to_string())
            .execute(&mut *conn)
            .await?;
            if result.rows_affected() == 0 {
                return Err(already_exists(collection, id));
            }
        }
        WriteOp::Set {
            collection,
            id,
            fields,
        } => {
            sqlx::query(
                "INSERT INTO documents (collection, id, data) VALUES (?, ?, ?) \
                 ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data",
            )
            .bind(collection)
            .bind(id)
            .bind(Value::Object(fields.clone()).to_string())
            .execute(&mut *conn)
            .await?;
        }
        WriteOp::Update {
            collection,
            id,
            patch,
        } => {
            let raw: Option<String> =
                sqlx::query_scalar("SELECT data FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?;
            let raw = raw.ok_or_else(|| missing_document(collection, id))?;

            let mut fields = parse_fields(&raw)?;
            patch.apply(&mut fields);

            sqlx::query("UPDATE documents SET data = ? WHERE collection = ? AND id = ?")
                .bind(Value::Object(fields).to_string())
                .bind(collection)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        WriteOp::Delete { collection, id } => {
            sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let started = Instant::now();
        let row: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await;
        observe_store_op(self.backend(), "get", row.is_ok(), started.elapsed());

        row?.map(|raw| -> Result<Document, AppError> {
            Ok(Document {
                id: id.to_string(),
                fields: parse_fields(&raw)?,
            })
        })
        .transpose()
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, AppError> {
        query.validate()?;
        let started = Instant::now();

        let mut builder = build_select("id, data", query, true);
        let rows = builder.build().fetch_all(&self.pool).await;
        observe_store_op(self.backend(), "query", rows.is_ok(), started.elapsed());

        rows?
            .into_iter()
            .map(|row| -> Result<Document, AppError> {
                let id: String = row.try_get("id")?;
                let raw: String = row.try_get("data")?;
                Ok(Document {
                    id,
                    fields: parse_fields(&raw)?,
                })
            })
            .collect()
    }

    async fn count(&self, query: &Query) -> Result<usize, AppError> {
        query.validate()?;
        let mut builder = build_select("COUNT(*)", query, false);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as usize)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        if batch.is_empty() {
            return Ok(());
        }
        let started = Instant::now();

        // Dropping `tx` on any early return rolls the batch back.
        let outcome: Result<(), AppError> = async {
            let mut tx = self.pool.begin().await?;
            // Take the write lock up front so a read-then-write `Update`
            // cannot fail to upgrade under a concurrent writer.
            sqlx::query("UPDATE documents SET id = id WHERE 0")
                .execute(&mut *tx)
                .await?;
            for op in batch.ops() {
                apply_op(&mut *tx, op).await?;
            }
            tx.commit().await?;
            Ok(())
        }
        .await;

        observe_store_op(self.backend(), "commit", outcome.is_ok(), started.elapsed());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::Patch;
    use serde_json::json;
    use tempfile::TempDir;

    /// Helper to create a test store
    async fn create_test_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let (store, _temp_dir) = create_test_store().await;

        store
            .set("users", "alice", fields(json!({ "username": "alice" })))
            .await
            .unwrap();
        let document = store.get("users", "alice").await.unwrap().unwrap();
        assert_eq!(document.str_field("username"), Some("alice"));

        store.delete("users", "alice").await.unwrap();
        assert!(store.get("users", "alice").await.unwrap().is_none());
        // Deleting again is fine
        store.delete("users", "alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_query_order_cursor_and_limit() {
        let (store, _temp_dir) = create_test_store().await;
        for (id, user, created) in [
            ("p1", "alice", "2026-01-01T00:00:01.000000Z"),
            ("p2", "alice", "2026-01-01T00:00:03.000000Z"),
            ("p3", "bob", "2026-01-01T00:00:02.000000Z"),
            ("p4", "alice", "2026-01-01T00:00:03.000000Z"),
        ] {
            store
                .set(
                    "posts",
                    id,
                    fields(json!({ "userId": user, "createdAt": created })),
                )
                .await
                .unwrap();
        }
        store
            .set("posts", "p5", fields(json!({ "userId": "alice" })))
            .await
            .unwrap();

        let base = Query::collection("posts")
            .where_eq("userId", "alice")
            .order_by("createdAt", Direction::Descending);

        let ids: Vec<_> = store
            .query(&base)
            .await
            .unwrap()
            .into_iter()
            .map(|document| document.id)
            .collect();
        assert_eq!(ids, vec!["p4", "p2", "p1"]);

        let page = store
            .query(
                &base
                    .clone()
                    .start_after("2026-01-01T00:00:03.000000Z", "p4")
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "p2");

        assert_eq!(
            store
                .count(&Query::collection("posts").where_eq("userId", "alice"))
                .await
                .unwrap(),
            4
        );
    }

    #[tokio::test]
    async fn test_array_contains_and_boolean_filters() {
        let (store, _temp_dir) = create_test_store().await;
        store
            .set(
                "chats",
                "alice_bob",
                fields(json!({ "members": ["alice", "bob"], "archived": false })),
            )
            .await
            .unwrap();
        store
            .set(
                "chats",
                "bob_carol",
                fields(json!({ "members": ["bob", "carol"], "archived": true })),
            )
            .await
            .unwrap();

        let alice = store
            .query(&Query::collection("chats").array_contains("members", "alice"))
            .await
            .unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, "alice_bob");

        let active = store
            .query(
                &Query::collection("chats")
                    .array_contains("members", "bob")
                    .where_eq("archived", false),
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "alice_bob");
    }

    #[tokio::test]
    async fn test_batch_rolls_back_on_conflict() {
        let (store, _temp_dir) = create_test_store().await;
        store
            .set("likes", "alice_p1", fields(json!({ "userId": "alice" })))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set("notifications", "n1", fields(json!({ "type": "like" })))
            .create("likes", "alice_p1", fields(json!({ "userId": "alice" })));
        let err = store.commit(batch).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.get("notifications", "n1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let (store, _temp_dir) = create_test_store().await;
        let id = store
            .add("stories", fields(json!({ "userId": "alice", "viewers": ["bob"] })))
            .await
            .unwrap();

        store
            .update(
                "stories",
                &id,
                Patch::new()
                    .array_union("viewers", "bob")
                    .array_union("viewers", "carol"),
            )
            .await
            .unwrap();

        let story = store.get("stories", &id).await.unwrap().unwrap();
        assert_eq!(story.fields["viewers"], json!(["bob", "carol"]));
        assert_eq!(story.fields["userId"], "alice");

        let missing = store
            .update("stories", "nope", Patch::new().set("x", 1))
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_batch_releases_the_write_lock() {
        let (store, _temp_dir) = create_test_store().await;

        let mut batch = WriteBatch::new();
        batch
            .set("chats", "c1", fields(json!({ "lastMessage": "hi" })))
            .update("chats", "missing", Patch::new().set("x", 1));
        assert!(matches!(
            store.commit(batch).await,
            Err(AppError::NotFound(_))
        ));

        let next = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            store.set("chats", "c2", fields(json!({ "lastMessage": "yo" }))),
        )
        .await
        .expect("write lock still held after a failed batch");
        next.unwrap();
        assert!(store.get("chats", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let (store, _temp_dir) = create_test_store().await;
        store
            .set("stories", "s1", fields(json!({ "viewers": [] })))
            .await
            .unwrap();

        let writers = (0..8).map(|viewer| {
            let store = store.clone();
            async move {
                store
                    .update(
                        "stories",
                        "s1",
                        Patch::new().array_union("viewers", format!("v{viewer}")),
                    )
                    .await
            }
        });
        for result in futures::future::join_all(writers).await {
            result.unwrap();
        }

        let story = store.get("stories", "s1").await.unwrap().unwrap();
        assert_eq!(story.fields["viewers"].as_array().unwrap().len(), 8);
    }
}
