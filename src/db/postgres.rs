use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{library::LIBRARY_FORMAT_VERSION, LibraryDocument, PersistedLibrary},
    error::AppResult,
    models::TrackedShow,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Tracked libraries stored as one JSONB document per user
#[derive(Clone)]
pub struct PgLibrary {
    pool: PgPool,
}

impl PgLibrary {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PersistedLibrary for PgLibrary {
    async fn load(&self, user_id: &str) -> AppResult<Option<Vec<TrackedShow>>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT document::text
            FROM tracked_libraries
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((document,)) => Ok(Some(LibraryDocument::decode(&document)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user_id: &str, shows: &[TrackedShow]) -> AppResult<()> {
        let document = LibraryDocument::encode(shows)?;

        sqlx::query(
            r#"
            INSERT INTO tracked_libraries (user_id, format_version, document, updated_at)
            VALUES ($1, $2, $3::jsonb, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET format_version = EXCLUDED.format_version,
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(LIBRARY_FORMAT_VERSION as i32)
        .bind(document)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, shows = shows.len(), "Saved tracked library");

        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
