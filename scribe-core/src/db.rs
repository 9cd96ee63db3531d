use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

const CREATE_SESSION_NOTES: &str = r#"
CREATE TABLE IF NOT EXISTS session_notes (
    id               BIGSERIAL PRIMARY KEY,
    session_duration INTEGER     NOT NULL,
    session_type     TEXT        NOT NULL,
    draft_note       TEXT        NOT NULL,
    generated_note   TEXT,
    final_note       TEXT,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at       TIMESTAMPTZ
)
"#;

const CREATE_SESSION_TYPE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_session_notes_session_type ON session_notes (session_type)";

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

/// Create the `session_notes` table and its index if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_SESSION_NOTES).execute(pool).await?;
    sqlx::query(CREATE_SESSION_TYPE_INDEX).execute(pool).await?;
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}
