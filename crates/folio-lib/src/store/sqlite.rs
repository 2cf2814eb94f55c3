//! SQLite-backed [`Store`].
//!
//! A single connection sits behind an async mutex; every operation takes
//! the lock, runs one or two statements and releases it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use num_bigint::BigInt;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tokio::sync::Mutex;

use super::schema::{ColumnKind, Entity, SCHEMA_SQL};
use super::{Changes, Filter, Lookup, Store};
use crate::errors::{FolioError, Result};
use crate::forms::is_truthy;
use crate::normalize::Value;

pub struct SqliteStore {
    db_path: Option<PathBuf>,
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and ensure the schema exists.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %db_path.display(), "opened sqlite store");
        Ok(Self {
            db_path: Some(db_path),
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            db_path: None,
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// The backing file, or `None` for an in-memory store.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn list(&self, entity: Entity, filter: Option<Filter>) -> Result<Vec<Value>> {
        let db = self.db.lock().await;
        let mut sql = select_sql(entity);
        let mut args = Vec::new();
        if let Some(filter) = filter {
            check_column(entity, filter.column)?;
            sql.push_str(&format!(" WHERE {} = ?1", filter.column));
            args.push(SqlValue::Integer(filter.id));
        }
        sql.push_str(&format!(" ORDER BY {}", entity.order_by()));

        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| decode_row(entity, row))?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn find(&self, entity: Entity, lookup: &Lookup) -> Result<Option<Value>> {
        let db = self.db.lock().await;
        match lookup {
            Lookup::Id(id) => find_by_id(&db, entity, *id),
            Lookup::Slug(slug) => {
                check_column(entity, "slug")?;
                let sql = format!("{} WHERE slug = ?1", select_sql(entity));
                let record = db
                    .query_row(&sql, params![slug], |row| decode_row(entity, row))
                    .optional()?;
                Ok(record)
            }
        }
    }

    async fn update(&self, entity: Entity, id: i64, changes: &Changes) -> Result<Option<Value>> {
        let db = self.db.lock().await;
        let mut assignments = Vec::with_capacity(changes.len() + 1);
        let mut args = Vec::with_capacity(changes.len() + 1);
        for (name, json) in changes {
            let kind = check_column(entity, name)?;
            args.push(bind_value(kind, json));
            assignments.push(format!("{name} = ?{}", args.len()));
        }
        assignments.push("updated_at = CURRENT_TIMESTAMP".to_string());
        args.push(SqlValue::Integer(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            entity.table(),
            assignments.join(", "),
            args.len()
        );
        let affected = db.execute(&sql, params_from_iter(args))?;
        if affected == 0 {
            return Ok(None);
        }
        tracing::debug!(table = entity.table(), id, "record updated");
        find_by_id(&db, entity, id)
    }

    async fn delete(&self, entity: Entity, id: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let sql = format!("DELETE FROM {} WHERE id = ?1", entity.table());
        let affected = db.execute(&sql, params![id])?;
        Ok(affected > 0)
    }

    async fn insert(&self, entity: Entity, changes: &Changes) -> Result<Value> {
        let db = self.db.lock().await;
        let sql = if changes.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", entity.table())
        } else {
            let names: Vec<&str> = changes.iter().map(|(name, _)| *name).collect();
            let slots: Vec<String> = (1..=changes.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                entity.table(),
                names.join(", "),
                slots.join(", ")
            )
        };
        let mut args = Vec::with_capacity(changes.len());
        for (name, json) in changes {
            let kind = check_column(entity, name)?;
            args.push(bind_value(kind, json));
        }
        db.execute(&sql, params_from_iter(args))?;
        let id = db.last_insert_rowid();
        find_by_id(&db, entity, id)?.ok_or(FolioError::Database(rusqlite::Error::QueryReturnedNoRows))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn select_sql(entity: Entity) -> String {
    let names: Vec<&str> = entity.columns().iter().map(|c| c.name).collect();
    format!("SELECT {} FROM {}", names.join(", "), entity.table())
}

fn check_column(entity: Entity, name: &str) -> Result<ColumnKind> {
    entity
        .column(name)
        .map(|c| c.kind)
        .ok_or_else(|| FolioError::UnknownColumn {
            table: entity.table(),
            column: name.to_string(),
        })
}

fn find_by_id(conn: &Connection, entity: Entity, id: i64) -> Result<Option<Value>> {
    let sql = format!("{} WHERE id = ?1", select_sql(entity));
    let record = conn
        .query_row(&sql, params![id], |row| decode_row(entity, row))
        .optional()?;
    Ok(record)
}

fn decode_row(entity: Entity, row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    let columns = entity.columns();
    let mut fields = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let raw = row.get_ref(i)?;
        fields.push((column.name.to_string(), decode_value(column.kind, raw)));
    }
    Ok(Value::Record(fields))
}

fn decode_value(kind: ColumnKind, raw: ValueRef<'_>) -> Value {
    match (kind, raw) {
        (_, ValueRef::Null) => Value::Null,
        (ColumnKind::Id | ColumnKind::ForeignKey, ValueRef::Integer(n)) => {
            Value::BigInt(BigInt::from(n))
        }
        (ColumnKind::Bool, ValueRef::Integer(n)) => Value::Bool(n != 0),
        (ColumnKind::Real, ValueRef::Integer(n)) => Value::Float(n as f64),
        (ColumnKind::Timestamp, ValueRef::Text(bytes)) => {
            let text = String::from_utf8_lossy(bytes);
            match parse_timestamp(&text) {
                Some(ts) => Value::Timestamp(ts),
                None => Value::String(text.into_owned()),
            }
        }
        (ColumnKind::Json, ValueRef::Text(bytes)) => {
            match serde_json::from_slice::<serde_json::Value>(bytes) {
                Ok(json) => Value::from(json),
                Err(e) => {
                    tracing::warn!("stored JSON column is not valid JSON: {}", e);
                    Value::String(String::from_utf8_lossy(bytes).into_owned())
                }
            }
        }
        (_, ValueRef::Integer(n)) => Value::Int(n),
        (_, ValueRef::Real(f)) => Value::Float(f),
        (_, ValueRef::Text(bytes)) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        (_, ValueRef::Blob(bytes)) => {
            Value::Array(bytes.iter().map(|b| Value::Int(i64::from(*b))).collect())
        }
    }
}

/// Parse the timestamp layouts SQLite and clients commonly write.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (SQLite's
/// `CURRENT_TIMESTAMP`, taken as UTC) and bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn bind_value(kind: ColumnKind, json: &serde_json::Value) -> SqlValue {
    use serde_json::Value as Json;

    match (kind, json) {
        (_, Json::Null) => SqlValue::Null,
        (ColumnKind::Json, other) => SqlValue::Text(other.to_string()),
        (ColumnKind::Bool, other) => SqlValue::Integer(i64::from(is_truthy(other))),
        (ColumnKind::Id | ColumnKind::ForeignKey | ColumnKind::Integer, Json::Number(n)) => {
            match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or_default()),
            }
        }
        (ColumnKind::Id | ColumnKind::ForeignKey | ColumnKind::Integer, Json::String(s)) => {
            match s.trim().parse::<i64>() {
                Ok(i) => SqlValue::Integer(i),
                Err(_) => SqlValue::Text(s.clone()),
            }
        }
        (ColumnKind::Real, Json::Number(n)) => SqlValue::Real(n.as_f64().unwrap_or_default()),
        (ColumnKind::Real, Json::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) => SqlValue::Real(f),
            Err(_) => SqlValue::Text(s.clone()),
        },
        (ColumnKind::Text | ColumnKind::Timestamp, Json::Bool(b)) => {
            SqlValue::Text(b.to_string())
        }
        (_, Json::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        (_, Json::String(s)) => SqlValue::Text(s.clone()),
        (_, other) => SqlValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn skill(name: &str, sort_order: i64) -> Changes {
        vec![("name", json!(name)), ("sort_order", json!(sort_order))]
    }

    fn category(slug: &str) -> Changes {
        vec![
            ("slug", json!(slug)),
            ("name_en", json!(slug)),
            ("name_ja", json!("カテゴリ")),
        ]
    }

    fn article(slug: &str, category_id: i64) -> Changes {
        vec![
            ("category_id", json!(category_id)),
            ("slug", json!(slug)),
            ("title_en", json!(slug)),
            ("title_ja", json!("記事")),
            ("published_date", json!("2025-06-19T08:00:00Z")),
            ("published", json!(true)),
        ]
    }

    fn id_of(record: &Value) -> i64 {
        match record.get("id") {
            Some(Value::BigInt(n)) => i64::try_from(n.clone()).unwrap(),
            other => panic!("expected big integer id, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn insert_and_find_by_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let inserted = store.insert(Entity::Skill, &skill("Rust", 1)).await.unwrap();
        let id = id_of(&inserted);

        let found = store.find(Entity::Skill, &Lookup::Id(id)).await.unwrap().unwrap();
        assert_eq!(found.get("name"), Some(&Value::String("Rust".into())));
        assert_eq!(found.get("sort_order"), Some(&Value::Int(1)));
        assert_eq!(found.get("icon"), Some(&Value::Null));
        assert!(matches!(found.get("created_at"), Some(Value::Timestamp(_))));
    }

    #[tokio::test]
    async fn find_missing_returns_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        let found = store.find(Entity::Project, &Lookup::Id(42)).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn list_orders_by_sort_order_then_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(Entity::Skill, &skill("Go", 2)).await.unwrap();
        store.insert(Entity::Skill, &skill("Rust", 1)).await.unwrap();
        store.insert(Entity::Skill, &skill("SQL", 2)).await.unwrap();

        let names: Vec<Value> = store
            .list(Entity::Skill, None)
            .await
            .unwrap()
            .iter()
            .map(|r| r.get("name").cloned().unwrap())
            .collect();
        assert_eq!(names, vec![Value::from("Rust"), "Go".into(), "SQL".into()]);
    }

    #[tokio::test]
    async fn list_filters_by_foreign_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rust = id_of(&store.insert(Entity::ArticleCategory, &category("rust")).await.unwrap());
        let ml = id_of(&store.insert(Entity::ArticleCategory, &category("ml")).await.unwrap());
        store.insert(Entity::Article, &article("ownership", rust)).await.unwrap();
        store.insert(Entity::Article, &article("borrowing", rust)).await.unwrap();
        store.insert(Entity::Article, &article("transformers", ml)).await.unwrap();

        let all = store.list(Entity::Article, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let filtered = store
            .list(Entity::Article, Some(Filter::new("category_id", rust)))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);
        for record in &filtered {
            assert_eq!(record.get("category_id"), Some(&Value::BigInt(BigInt::from(rust))));
        }
    }

    #[tokio::test]
    async fn list_rejects_unknown_filter_column() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .list(Entity::Skill, Some(Filter::new("category_id", 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::UnknownColumn { .. }));
    }

    #[tokio::test]
    async fn find_by_slug_decodes_typed_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cat = id_of(&store.insert(Entity::ArticleCategory, &category("rust")).await.unwrap());
        store.insert(Entity::Article, &article("ownership", cat)).await.unwrap();

        let found = store
            .find(Entity::Article, &Lookup::Slug("ownership".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("published"), Some(&Value::Bool(true)));
        assert_eq!(
            found.get("published_date"),
            Some(&Value::Timestamp(Utc.with_ymd_and_hms(2025, 6, 19, 8, 0, 0).unwrap()))
        );

        let missing = store
            .find(Entity::Article, &Lookup::Slug("nope".into()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn slug_lookup_on_unslugged_entity_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.find(Entity::Skill, &Lookup::Slug("rust".into())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_changes_columns_and_returns_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = id_of(&store.insert(Entity::Skill, &skill("Rust", 1)).await.unwrap());

        let changes: Changes = vec![
            ("name", json!("Rust 2024")),
            ("icon", json!(null)),
            ("color", json!("orange")),
            ("sort_order", json!(5)),
        ];
        let updated = store.update(Entity::Skill, id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.get("name"), Some(&Value::from("Rust 2024")));
        assert_eq!(updated.get("color"), Some(&Value::from("orange")));
        assert_eq!(updated.get("sort_order"), Some(&Value::Int(5)));
    }

    #[tokio::test]
    async fn update_missing_row_returns_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store
            .update(Entity::Skill, 99, &skill("Ghost", 0))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn json_columns_round_trip_as_arrays() {
        let store = SqliteStore::open_in_memory().unwrap();
        let changes: Changes = vec![
            ("company", json!("Acme")),
            ("position_en", json!("Engineer")),
            ("position_ja", json!("エンジニア")),
            ("period", json!("2020 - 2024")),
            ("type_en", json!("Full-time")),
            ("type_ja", json!("正社員")),
            ("key_achievements_en", json!(["Shipped v1", "Cut latency"])),
        ];
        let record = store.insert(Entity::WorkExperience, &changes).await.unwrap();
        assert_eq!(
            record.get("key_achievements_en"),
            Some(&Value::Array(vec!["Shipped v1".into(), "Cut latency".into()]))
        );
        assert_eq!(record.get("key_achievements_ja"), Some(&Value::Array(vec![])));
    }

    #[tokio::test]
    async fn large_numbers_in_json_columns_stay_numbers() {
        let store = SqliteStore::open_in_memory().unwrap();
        let changes: Changes = vec![
            ("company", json!("Acme")),
            ("position_en", json!("Engineer")),
            ("position_ja", json!("エンジニア")),
            ("period", json!("2020 - 2024")),
            ("type_en", json!("Full-time")),
            ("type_ja", json!("正社員")),
            ("detailed_achievements_en", json!([u64::MAX])),
        ];
        let record = store.insert(Entity::WorkExperience, &changes).await.unwrap();
        assert_eq!(
            record.get("detailed_achievements_en"),
            Some(&Value::Array(vec![Value::UInt(u64::MAX)]))
        );
        let out = crate::normalize::Normalizer::default().normalize(&record);
        assert_eq!(out["detailed_achievements_en"], json!([u64::MAX]));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = id_of(&store.insert(Entity::Skill, &skill("Rust", 1)).await.unwrap());

        assert!(store.delete(Entity::Skill, id).await.unwrap());
        assert!(!store.delete(Entity::Skill, id).await.unwrap());
        assert!(store.find(Entity::Skill, &Lookup::Id(id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_backed_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.db_path(), Some(path.as_path()));
            store.insert(Entity::Skill, &skill("Rust", 1)).await.unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.list(Entity::Skill, None).await.unwrap().len(), 1);
    }

    #[test]
    fn parse_timestamp_accepts_common_layouts() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 19, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-06-19 08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-19T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-19T15:30:00+07:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-06-19"),
            Some(Utc.with_ymd_and_hms(2025, 6, 19, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("June 19th"), None);
    }

    #[test]
    fn unparseable_timestamp_text_stays_a_string() {
        let value = decode_value(ColumnKind::Timestamp, ValueRef::Text(b"soon"));
        assert_eq!(value, Value::from("soon"));
    }

    #[test]
    fn bind_value_coerces_by_column_kind() {
        assert_eq!(bind_value(ColumnKind::Text, &json!(5)), SqlValue::Text("5".into()));
        assert_eq!(bind_value(ColumnKind::Integer, &json!("7")), SqlValue::Integer(7));
        assert_eq!(bind_value(ColumnKind::Bool, &json!("yes")), SqlValue::Integer(1));
        assert_eq!(bind_value(ColumnKind::Bool, &json!(false)), SqlValue::Integer(0));
        assert_eq!(bind_value(ColumnKind::Json, &json!([1, 2])), SqlValue::Text("[1,2]".into()));
        assert_eq!(bind_value(ColumnKind::Text, &json!(null)), SqlValue::Null);
    }
}
