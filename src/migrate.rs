use anyhow::Result;
use sqlx::SqlitePool;

use grant_tagger_core::vocabulary;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and seed the vocabulary. Safe to run repeatedly.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Vocabulary
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Synonym groups; members reference the group by stable id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tag_synonyms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tag_synonym_members (
            group_id INTEGER NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY (group_id, tag),
            FOREIGN KEY (group_id) REFERENCES tag_synonyms(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Grants keep their tags as a JSON document; grant_tags indexes membership
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            website_urls_json TEXT NOT NULL DEFAULT '[]',
            document_urls_json TEXT NOT NULL DEFAULT '[]',
            tags_json TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grant_tags (
            grant_id TEXT NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY (grant_id, tag),
            FOREIGN KEY (grant_id) REFERENCES grants(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_grant_tags_tag ON grant_tags(tag)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_synonym_members_tag ON tag_synonym_members(tag)")
        .execute(pool)
        .await?;

    seed(pool).await
}

async fn seed(pool: &SqlitePool) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for tag in vocabulary::SEED_TAGS {
        sqlx::query("INSERT OR IGNORE INTO tags (name, created_at) VALUES (?, ?)")
            .bind(*tag)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    // Default groups only go into an empty synonym table
    let groups_exist: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM tag_synonyms")
        .fetch_one(&mut *tx)
        .await?;

    if !groups_exist {
        for group in vocabulary::seed_synonym_groups() {
            let id: i64 =
                sqlx::query_scalar("INSERT INTO tag_synonyms (created_at) VALUES (?) RETURNING id")
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?;
            for tag in &group {
                sqlx::query("INSERT INTO tag_synonym_members (group_id, tag) VALUES (?, ?)")
                    .bind(id)
                    .bind(tag)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await?;
    Ok(())
}
