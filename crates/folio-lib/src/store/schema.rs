//! Portfolio entities and their table layouts.

use std::fmt;

/// How a column is decoded into a [`Value`](crate::normalize::Value) and
/// how an incoming JSON value is bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 64-bit primary key, surfaced as a big integer.
    Id,
    /// 64-bit reference to another table's id.
    ForeignKey,
    Integer,
    Real,
    Text,
    Bool,
    Timestamp,
    /// Array or object stored as JSON text.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

use ColumnKind::*;

const SKILL_COLUMNS: &[Column] = &[
    col("id", Id),
    col("name", Text),
    col("icon", Text),
    col("color", Text),
    col("sort_order", Integer),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const PROJECT_COLUMNS: &[Column] = &[
    col("id", Id),
    col("title", Text),
    col("role_en", Text),
    col("role_ja", Text),
    col("description_en", Text),
    col("description_ja", Text),
    col("project_url", Text),
    col("is_public", Bool),
    col("sort_order", Integer),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const EDUCATION_COLUMNS: &[Column] = &[
    col("id", Id),
    col("institution_name", Text),
    col("degree_en", Text),
    col("degree_ja", Text),
    col("period", Text),
    col("gpa", Text),
    col("description_en", Text),
    col("description_ja", Text),
    col("certificate_url", Text),
    col("transcript_url", Text),
    col("icon", Text),
    col("sort_order", Integer),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const WORK_EXPERIENCE_COLUMNS: &[Column] = &[
    col("id", Id),
    col("company", Text),
    col("position_en", Text),
    col("position_ja", Text),
    col("period", Text),
    col("type_en", Text),
    col("type_ja", Text),
    col("logo_url", Text),
    col("description_en", Text),
    col("description_ja", Text),
    col("key_achievements_en", Json),
    col("key_achievements_ja", Json),
    col("full_description_en", Text),
    col("full_description_ja", Text),
    col("detailed_achievements_en", Json),
    col("detailed_achievements_ja", Json),
    col("sort_order", Integer),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const ARTICLE_COLUMNS: &[Column] = &[
    col("id", Id),
    col("category_id", ForeignKey),
    col("slug", Text),
    col("title_en", Text),
    col("title_ja", Text),
    col("description_en", Text),
    col("description_ja", Text),
    col("content_en", Text),
    col("content_ja", Text),
    col("thumbnail", Text),
    col("author", Text),
    col("published_date", Timestamp),
    col("read_time", Integer),
    col("published", Bool),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const ARTICLE_CATEGORY_COLUMNS: &[Column] = &[
    col("id", Id),
    col("slug", Text),
    col("name_en", Text),
    col("name_ja", Text),
    col("description_en", Text),
    col("description_ja", Text),
    col("icon", Text),
    col("color", Text),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

/// DDL for every table. Column order matches the `*_COLUMNS` tables above.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS skills (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    icon        TEXT,
    color       TEXT,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS projects (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT    NOT NULL,
    role_en         TEXT    NOT NULL,
    role_ja         TEXT    NOT NULL,
    description_en  TEXT    NOT NULL,
    description_ja  TEXT    NOT NULL,
    project_url     TEXT,
    is_public       INTEGER DEFAULT 1,
    sort_order      INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS education (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    institution_name TEXT    NOT NULL,
    degree_en        TEXT    NOT NULL,
    degree_ja        TEXT    NOT NULL,
    period           TEXT    NOT NULL,
    gpa              TEXT,
    description_en   TEXT,
    description_ja   TEXT,
    certificate_url  TEXT,
    transcript_url   TEXT,
    icon             TEXT,
    sort_order       INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at       TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS work_experiences (
    id                        INTEGER PRIMARY KEY AUTOINCREMENT,
    company                   TEXT    NOT NULL,
    position_en               TEXT    NOT NULL,
    position_ja               TEXT    NOT NULL,
    period                    TEXT    NOT NULL,
    type_en                   TEXT    NOT NULL,
    type_ja                   TEXT    NOT NULL,
    logo_url                  TEXT,
    description_en            TEXT,
    description_ja            TEXT,
    key_achievements_en       TEXT    NOT NULL DEFAULT '[]',
    key_achievements_ja       TEXT    NOT NULL DEFAULT '[]',
    full_description_en       TEXT,
    full_description_ja       TEXT,
    detailed_achievements_en  TEXT    NOT NULL DEFAULT '[]',
    detailed_achievements_ja  TEXT    NOT NULL DEFAULT '[]',
    sort_order                INTEGER NOT NULL DEFAULT 0,
    created_at                TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at                TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS article_categories (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    slug            TEXT    NOT NULL UNIQUE,
    name_en         TEXT    NOT NULL,
    name_ja         TEXT    NOT NULL,
    description_en  TEXT,
    description_ja  TEXT,
    icon            TEXT,
    color           TEXT,
    created_at      TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS articles (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id     INTEGER REFERENCES article_categories(id),
    slug            TEXT    NOT NULL UNIQUE,
    title_en        TEXT    NOT NULL,
    title_ja        TEXT    NOT NULL,
    description_en  TEXT,
    description_ja  TEXT,
    content_en      TEXT,
    content_ja      TEXT,
    thumbnail       TEXT,
    author          TEXT,
    published_date  TEXT,
    read_time       INTEGER,
    published       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_articles_category_id ON articles(category_id);
";

/// A kind of portfolio content, one table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Skill,
    Project,
    Education,
    WorkExperience,
    Article,
    ArticleCategory,
}

impl Entity {
    pub const ALL: [Entity; 6] = [
        Entity::Skill,
        Entity::Project,
        Entity::Education,
        Entity::WorkExperience,
        Entity::ArticleCategory,
        Entity::Article,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Self::Skill => "skills",
            Self::Project => "projects",
            Self::Education => "education",
            Self::WorkExperience => "work_experiences",
            Self::Article => "articles",
            Self::ArticleCategory => "article_categories",
        }
    }

    /// Capitalized name used in "<label> not found" messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Skill => "Skill",
            Self::Project => "Project",
            Self::Education => "Education",
            Self::WorkExperience => "Work experience",
            Self::Article => "Article",
            Self::ArticleCategory => "Category",
        }
    }

    /// Lowercase noun for "Failed to fetch <noun>" messages.
    pub fn noun(self, plural: bool) -> &'static str {
        match (self, plural) {
            (Self::Skill, false) => "skill",
            (Self::Skill, true) => "skills",
            (Self::Project, false) => "project",
            (Self::Project, true) => "projects",
            (Self::Education, _) => "education",
            (Self::WorkExperience, false) => "work experience",
            (Self::WorkExperience, true) => "work experiences",
            (Self::Article, false) => "article",
            (Self::Article, true) => "articles",
            (Self::ArticleCategory, false) => "category",
            (Self::ArticleCategory, true) => "categories",
        }
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Self::Skill => SKILL_COLUMNS,
            Self::Project => PROJECT_COLUMNS,
            Self::Education => EDUCATION_COLUMNS,
            Self::WorkExperience => WORK_EXPERIENCE_COLUMNS,
            Self::Article => ARTICLE_COLUMNS,
            Self::ArticleCategory => ARTICLE_CATEGORY_COLUMNS,
        }
    }

    pub fn column(self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }

    pub fn has_slug(self) -> bool {
        self.column("slug").is_some()
    }

    /// `ORDER BY` clause used for listings.
    pub fn order_by(self) -> &'static str {
        if self.column("sort_order").is_some() {
            "sort_order, id"
        } else {
            "id"
        }
    }

    /// Resolve a table name (as used in seed documents) to an entity.
    pub fn from_table(table: &str) -> Option<Entity> {
        Self::ALL.into_iter().find(|e| e.table() == table)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entity_starts_with_an_id_column() {
        for entity in Entity::ALL {
            let first = entity.columns()[0];
            assert_eq!(first, col("id", ColumnKind::Id), "{entity}");
        }
    }

    #[test]
    fn slugs_only_on_articles_and_categories() {
        let slugged: Vec<Entity> = Entity::ALL.into_iter().filter(|e| e.has_slug()).collect();
        assert_eq!(slugged, [Entity::ArticleCategory, Entity::Article]);
    }

    #[test]
    fn listing_order_uses_sort_order_when_present() {
        assert_eq!(Entity::Skill.order_by(), "sort_order, id");
        assert_eq!(Entity::Article.order_by(), "id");
    }

    #[test]
    fn from_table_round_trips() {
        for entity in Entity::ALL {
            assert_eq!(Entity::from_table(entity.table()), Some(entity));
        }
        assert_eq!(Entity::from_table("users"), None);
    }

    #[test]
    fn ddl_declares_every_column() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        for entity in Entity::ALL {
            let mut stmt = conn
                .prepare(&format!("PRAGMA table_info({})", entity.table()))
                .unwrap();
            let names: Vec<String> = stmt
                .query_map([], |row| row.get::<_, String>(1))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            let expected: Vec<&str> = entity.columns().iter().map(|c| c.name).collect();
            assert_eq!(names, expected, "{entity}");
        }
    }
}
