//! Seed command.
//!
//! Loads a JSON document keyed by table name into the database:
//!
//! ```json
//! { "article_categories": [{ "id": 1, "slug": "engineering", ... }],
//!   "articles": [{ "category_id": 1, "slug": "hello", ... }] }
//! ```
//!
//! Tables are inserted parents first, so articles may reference
//! categories from the same document.

use std::path::{Path, PathBuf};

use clap::{value_parser, Arg, ArgMatches, Command};
use serde_json::{Map, Value as Json};

use crate::config::FolioConfig;
use crate::errors::{FolioError, Result};
use crate::logger;
use crate::store::{Changes, Entity, SqliteStore, Store};

/// Build the `seed` clap command.
pub fn seed_command() -> Command {
    Command::new("seed")
        .about("Load portfolio content from a JSON file")
        .arg(
            Arg::new("file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON document keyed by table name"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .value_parser(value_parser!(PathBuf))
                .help("SQLite database file (overrides FOLIO_DATABASE)"),
        )
}

/// Handle the `seed` command.
pub async fn handle_seed(matches: &ArgMatches, config: &FolioConfig) -> Result<()> {
    let file = matches
        .get_one::<PathBuf>("file")
        .ok_or_else(|| FolioError::Command("seed requires a file".into()))?;
    let database = matches
        .get_one::<PathBuf>("database")
        .unwrap_or(&config.database);

    let store = SqliteStore::open(database)?;
    let counts = seed_file(&store, file).await?;
    if logger::is_verbose() {
        for (entity, count) in &counts {
            println!("{:<20} {}", entity.table(), count);
        }
    }
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    println!("Seeded {} rows into {}", total, database.display());
    tracing::info!(total, "seed complete");
    Ok(())
}

/// Read `path` and insert its rows. Returns rows inserted per table.
pub async fn seed_file(store: &dyn Store, path: &Path) -> Result<Vec<(Entity, usize)>> {
    let text = tokio::fs::read_to_string(path).await?;
    let document: Json = serde_json::from_str(&text)?;
    seed_document(store, &document).await
}

/// Insert every row of `document` in dependency order.
pub async fn seed_document(store: &dyn Store, document: &Json) -> Result<Vec<(Entity, usize)>> {
    let tables = document
        .as_object()
        .ok_or_else(|| FolioError::Command("seed document must be a JSON object".into()))?;
    if let Some(unknown) = tables.keys().find(|k| Entity::from_table(k).is_none()) {
        return Err(FolioError::Command(format!("unknown table {unknown:?} in seed document")));
    }

    let mut counts = Vec::new();
    for entity in Entity::ALL {
        let Some(rows) = tables.get(entity.table()) else { continue };
        let rows = rows.as_array().ok_or_else(|| {
            FolioError::Command(format!("{} must be an array of objects", entity.table()))
        })?;
        for (i, row) in rows.iter().enumerate() {
            let fields = row.as_object().ok_or_else(|| {
                FolioError::Command(format!("{}[{}] is not an object", entity.table(), i))
            })?;
            store.insert(entity, &row_changes(entity, fields)?).await?;
        }
        tracing::debug!(table = entity.table(), rows = rows.len(), "seeded");
        counts.push((entity, rows.len()));
    }
    Ok(counts)
}

fn row_changes(entity: Entity, fields: &Map<String, Json>) -> Result<Changes> {
    fields
        .iter()
        .map(|(name, value)| {
            let column = entity.column(name).ok_or_else(|| FolioError::UnknownColumn {
                table: entity.table(),
                column: name.clone(),
            })?;
            Ok((column.name, value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Value;
    use crate::store::{Filter, Lookup};
    use serde_json::json;
    use std::io::Write;

    fn document() -> Json {
        json!({
            "articles": [
                { "category_id": 1, "slug": "hello-rust", "title_en": "Hello", "title_ja": "こんにちは" }
            ],
            "article_categories": [
                { "id": 1, "slug": "engineering", "name_en": "Engineering", "name_ja": "技術" }
            ],
            "skills": [
                { "name": "Rust", "sort_order": 1 },
                { "name": "SQL", "sort_order": 2 }
            ],
            "work_experiences": [{
                "company": "Acme",
                "position_en": "Engineer",
                "position_ja": "エンジニア",
                "period": "2020 - 2024",
                "type_en": "Full-time",
                "type_ja": "正社員",
                "key_achievements_en": ["Shipped v1"]
            }]
        })
    }

    #[tokio::test]
    async fn seeds_parents_before_children() {
        let store = SqliteStore::open_in_memory().unwrap();
        let counts = seed_document(&store, &document()).await.unwrap();
        assert_eq!(
            counts,
            vec![
                (Entity::Skill, 2),
                (Entity::WorkExperience, 1),
                (Entity::ArticleCategory, 1),
                (Entity::Article, 1),
            ]
        );

        let articles = store
            .list(Entity::Article, Some(Filter::new("category_id", 1)))
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);

        let work = store.find(Entity::WorkExperience, &Lookup::Id(1)).await.unwrap().unwrap();
        assert_eq!(
            work.get("key_achievements_en"),
            Some(&Value::Array(vec![Value::String("Shipped v1".into())]))
        );
    }

    #[tokio::test]
    async fn unknown_table_is_rejected_before_inserting() {
        let store = SqliteStore::open_in_memory().unwrap();
        let doc = json!({ "skills": [{ "name": "Rust" }], "hobbies": [] });
        let err = seed_document(&store, &doc).await.unwrap_err();
        assert!(matches!(err, FolioError::Command(ref msg) if msg.contains("hobbies")));
        assert!(store.list(Entity::Skill, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_column_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let doc = json!({ "skills": [{ "name": "Rust", "level": 9 }] });
        let err = seed_document(&store, &doc).await.unwrap_err();
        assert!(matches!(
            err,
            FolioError::UnknownColumn { table: "skills", ref column } if column == "level"
        ));
    }

    #[tokio::test]
    async fn non_array_table_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = seed_document(&store, &json!({ "skills": { "name": "Rust" } }))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Command(_)));
    }

    #[tokio::test]
    async fn seeds_from_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(document().to_string().as_bytes()).unwrap();

        let store = SqliteStore::open(dir.path().join("folio.db")).unwrap();
        let counts = seed_file(&store, &path).await.unwrap();
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn malformed_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let err = seed_file(&store, &path).await.unwrap_err();
        assert!(matches!(err, FolioError::Json(_)));
    }

    #[test]
    fn test_seed_command_requires_file() {
        assert!(seed_command().try_get_matches_from(["seed"]).is_err());
        let matches = seed_command()
            .try_get_matches_from(["seed", "data.json", "--database", "x.db"])
            .unwrap();
        assert_eq!(matches.get_one::<PathBuf>("file"), Some(&PathBuf::from("data.json")));
    }
}
