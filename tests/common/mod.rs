//! Shared fixtures for the integration tests
//!
//! An in-memory catalog with three tables:
//! - `media`: `count` rows with ids `1..=count`
//! - `users`: alice (1) and bob (2)
//! - `user_media_catalog`: which user tracks which media, and whether it was watched

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use async_graphql::SimpleObject;
use librarian_query::graphql::orm::{
    DatabaseEntity, EntityCatalog, EntityDef, FieldDescriptor, FieldKind, FieldRegistry,
    FromSqlRow, MetadataProvider, QueryService, Relation, SqliteStore,
};
use librarian_query::graphql::pagination::Connection;
use librarian_query::{Database, QueryConfig};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct Media {
    pub id: i64,
    pub tmdb_id: i64,
    pub media_type: String,
    pub title: String,
    pub release_date: Option<String>,
    pub genres: Option<String>,
    pub number_of_episodes: Option<i64>,
    pub in_production: Option<bool>,
}

impl DatabaseEntity for Media {
    const TYPE_NAME: &'static str = "Media";
    const TABLE_NAME: &'static str = "media";
    const PRIMARY_KEY: &'static str = "id";
}

impl FromSqlRow for Media {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            tmdb_id: row.try_get("tmdb_id")?,
            media_type: row.try_get("media_type")?,
            title: row.try_get("title")?,
            release_date: row.try_get("release_date")?,
            genres: row.try_get("genres")?,
            number_of_episodes: row.try_get("number_of_episodes")?,
            in_production: row.try_get("in_production")?,
        })
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE media (
        id INTEGER PRIMARY KEY,
        tmdb_id INTEGER NOT NULL,
        media_type TEXT NOT NULL,
        title TEXT NOT NULL,
        release_date TEXT,
        genres TEXT,
        number_of_episodes INTEGER,
        in_production INTEGER
    )",
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL
    )",
    "CREATE TABLE user_media_catalog (
        id INTEGER PRIMARY KEY,
        media_id INTEGER NOT NULL REFERENCES media(id),
        user_id INTEGER NOT NULL REFERENCES users(id),
        watched INTEGER NOT NULL DEFAULT 0
    )",
];

pub fn registry() -> FieldRegistry {
    let mut registry = FieldRegistry::new();
    registry
        .register("Media", "id", FieldKind::Number, None)
        .register_field("Media", FieldDescriptor::new("tmdbId", FieldKind::Number).column("tmdb_id"))
        .register_field(
            "Media",
            FieldDescriptor::new("type", FieldKind::Enum)
                .column("media_type")
                .values(["movie", "tv"]),
        )
        .register("Media", "title", FieldKind::String, None)
        .register_field(
            "Media",
            FieldDescriptor::new("releaseDate", FieldKind::Date).column("release_date"),
        )
        .register_field("Media", FieldDescriptor::new("genres", FieldKind::String).unsortable())
        .register_field(
            "Media",
            FieldDescriptor::new("numberOfEpisodes", FieldKind::Number).column("number_of_episodes"),
        )
        .register_field(
            "Media",
            FieldDescriptor::new("inProduction", FieldKind::Boolean).column("in_production"),
        )
        .register("UserMediaCatalog", "id", FieldKind::Number, None)
        .register("UserMediaCatalog", "watched", FieldKind::Boolean, None)
        .register_field(
            "UserMediaCatalog",
            FieldDescriptor::new("mediaId", FieldKind::Number).column("media_id"),
        )
        .register_field(
            "UserMediaCatalog",
            FieldDescriptor::new("userId", FieldKind::Number).column("user_id"),
        )
        .register("User", "id", FieldKind::Number, None)
        .register("User", "username", FieldKind::String, None);
    registry
}

pub fn catalog() -> EntityCatalog {
    EntityCatalog::new()
        .entity(
            EntityDef::new("Media", "media")
                .relation(Relation::new("users", "UserMediaCatalog", "id", "media_id")),
        )
        .entity(
            EntityDef::new("UserMediaCatalog", "user_media_catalog")
                .relation(Relation::new("user", "User", "user_id", "id"))
                .relation(Relation::new("media", "Media", "media_id", "id")),
        )
        .entity(EntityDef::new("User", "users"))
}

/// Empty database with the catalog schema
pub async fn setup() -> Database {
    let db = Database::from_config(&QueryConfig::default())
        .await
        .expect("connect to in-memory database");
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(db.pool())
            .await
            .expect("create schema");
    }
    db
}

/// Insert media `1..=count`.
///
/// Odd ids are movies, even ids are TV shows with `id` episodes. Release
/// year is `2000 + id`. Every third item is a drama, every fourth is in
/// production. Titles are `Media NN`.
pub async fn seed_media(db: &Database, count: i64) {
    // insert in reverse so storage order differs from id order
    for id in (1..=count).rev() {
        let is_tv = id % 2 == 0;
        sqlx::query(
            "INSERT INTO media (id, tmdb_id, media_type, title, release_date, genres, number_of_episodes, in_production)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(id)
        .bind(1000 + id)
        .bind(if is_tv { "tv" } else { "movie" })
        .bind(format!("Media {:02}", id))
        .bind(format!("{}-01-01T00:00:00Z", 2000 + id))
        .bind(if id % 3 == 0 { "Drama" } else { "Comedy" })
        .bind(if is_tv { Some(id) } else { None })
        .bind(id % 4 == 0)
        .execute(db.pool())
        .await
        .expect("insert media");
    }
}

/// alice tracks media 1..=5 and watched the odd ones; bob tracks 3..=8 and
/// watched 3..=6.
pub async fn seed_watchers(db: &Database) {
    for (id, name) in [(1, "alice"), (2, "bob")] {
        sqlx::query("INSERT INTO users (id, username) VALUES (?1, ?2)")
            .bind(id as i64)
            .bind(name)
            .execute(db.pool())
            .await
            .expect("insert user");
    }

    let mut rows = Vec::new();
    for media_id in 1..=5i64 {
        rows.push((media_id, 1i64, media_id % 2 == 1));
    }
    for media_id in 3..=8i64 {
        rows.push((media_id, 2i64, media_id <= 6));
    }
    for (media_id, user_id, watched) in rows {
        sqlx::query("INSERT INTO user_media_catalog (media_id, user_id, watched) VALUES (?1, ?2, ?3)")
            .bind(media_id)
            .bind(user_id)
            .bind(watched)
            .execute(db.pool())
            .await
            .expect("insert catalog row");
    }
}

pub fn service(db: &Database) -> QueryService<Media, SqliteStore> {
    let metadata: Arc<dyn MetadataProvider> = Arc::new(catalog());
    QueryService::sqlite(db, Arc::new(registry()), metadata, &QueryConfig::default())
}

pub fn ids(connection: &Connection<Media>) -> Vec<i64> {
    connection.edges.iter().map(|e| e.node.id).collect()
}

pub fn id_set(media: &[Media]) -> BTreeSet<i64> {
    media.iter().map(|m| m.id).collect()
}
