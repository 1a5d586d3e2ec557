//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`migrate`](crate::migrate): `tags`, `tag_synonyms`,
//! `tag_synonym_members`, `grants`, and `grant_tags`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use grant_tagger_core::models::{Grant, GrantFilter, SynonymGroup, TagSet};
use grant_tagger_core::store::{InsertError, Store};

const GRANT_COLUMNS: &str =
    "g.name, g.description, g.website_urls_json, g.document_urls_json, g.tags_json";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn grant_from_row(row: &SqliteRow) -> Result<Grant> {
    let name: String = row.get("name");
    let website_urls: String = row.get("website_urls_json");
    let document_urls: String = row.get("document_urls_json");
    let tags: String = row.get("tags_json");

    Ok(Grant {
        website_urls: serde_json::from_str(&website_urls)
            .with_context(|| format!("corrupt website_urls for grant '{}'", name))?,
        document_urls: serde_json::from_str(&document_urls)
            .with_context(|| format!("corrupt document_urls for grant '{}'", name))?,
        tags: serde_json::from_str(&tags)
            .with_context(|| format!("corrupt tags for grant '{}'", name))?,
        description: row.get("description"),
        name,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_tags(&self) -> Result<TagSet> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().collect())
    }

    async fn insert_tags(&self, tags: &TagSet) -> Result<TagSet> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut added = TagSet::new();

        for tag in tags {
            let result = sqlx::query("INSERT OR IGNORE INTO tags (name, created_at) VALUES (?, ?)")
                .bind(tag)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                added.insert(tag.clone());
            }
        }

        tx.commit().await?;
        Ok(added)
    }

    async fn list_synonym_groups(&self) -> Result<Vec<SynonymGroup>> {
        let rows = sqlx::query(
            r#"
            SELECT g.id AS id, m.tag AS tag
            FROM tag_synonyms g
            JOIN tag_synonym_members m ON m.group_id = g.id
            ORDER BY g.id, m.tag
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut groups: Vec<SynonymGroup> = Vec::new();
        for row in &rows {
            let id: i64 = row.get("id");
            let tag: String = row.get("tag");
            match groups.last_mut() {
                Some(group) if group.id == id => {
                    group.tags.insert(tag);
                }
                _ => groups.push(SynonymGroup {
                    id,
                    tags: TagSet::from([tag]),
                }),
            }
        }
        Ok(groups)
    }

    async fn create_synonym_group(&self, tags: &TagSet) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id: i64 =
            sqlx::query_scalar("INSERT INTO tag_synonyms (created_at) VALUES (?) RETURNING id")
                .bind(chrono::Utc::now().timestamp())
                .fetch_one(&mut *tx)
                .await?;

        for tag in tags {
            sqlx::query("INSERT INTO tag_synonym_members (group_id, tag) VALUES (?, ?)")
                .bind(id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn add_to_synonym_group(&self, group_id: i64, tag: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO tag_synonym_members (group_id, tag)
            SELECT id, ? FROM tag_synonyms WHERE id = ?
            "#,
        )
        .bind(tag)
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn existing_grant_names(&self, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT name FROM grants WHERE name IN (");
        let mut list = qb.separated(", ");
        for name in names {
            list.push_bind(name.as_str());
        }
        list.push_unseparated(") ORDER BY name");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    async fn insert_grants(&self, grants: &[Grant]) -> Result<(), InsertError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;

        for grant in grants {
            let id = Uuid::new_v4().to_string();
            let website_urls = serde_json::to_string(&grant.website_urls).map_err(anyhow::Error::from)?;
            let document_urls =
                serde_json::to_string(&grant.document_urls).map_err(anyhow::Error::from)?;
            let tags = serde_json::to_string(&grant.tags).map_err(anyhow::Error::from)?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO grants (id, name, description, website_urls_json,
                                    document_urls_json, tags_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&grant.name)
            .bind(&grant.description)
            .bind(&website_urls)
            .bind(&document_urls)
            .bind(&tags)
            .bind(now)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(InsertError::DuplicateName(grant.name.clone()));
                }
                Err(e) => return Err(anyhow::Error::from(e).into()),
            }

            for tag in &grant.tags {
                sqlx::query("INSERT INTO grant_tags (grant_id, tag) VALUES (?, ?)")
                    .bind(&id)
                    .bind(tag)
                    .execute(&mut *tx)
                    .await
                    .map_err(anyhow::Error::from)?;
            }
        }

        tx.commit().await.map_err(anyhow::Error::from)?;
        Ok(())
    }

    async fn list_grants(&self, filter: &GrantFilter) -> Result<Vec<Grant>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM grants g", GRANT_COLUMNS));

        if let GrantFilter::AnyOf(tags) = filter {
            qb.push(
                " WHERE EXISTS (SELECT 1 FROM grant_tags gt WHERE gt.grant_id = g.id AND gt.tag IN (",
            );
            let mut list = qb.separated(", ");
            for tag in tags {
                list.push_bind(tag.as_str());
            }
            list.push_unseparated("))");
        }
        qb.push(" ORDER BY g.rowid");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(grant_from_row).collect()
    }
}
