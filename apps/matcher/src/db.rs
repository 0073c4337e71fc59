use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        email         TEXT PRIMARY KEY,
        skills        TEXT[] NOT NULL DEFAULT '{}',
        desired_title TEXT NOT NULL,
        location      TEXT NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id           BIGSERIAL PRIMARY KEY,
        email        TEXT NOT NULL REFERENCES profiles(email) ON DELETE CASCADE,
        posting_key  TEXT NOT NULL,
        title        TEXT NOT NULL,
        score        DOUBLE PRECISION NOT NULL CHECK (score >= 0 AND score <= 1),
        redirect_url TEXT NOT NULL,
        description  TEXT NOT NULL,
        company      TEXT NOT NULL,
        location     TEXT NOT NULL,
        salary_max   DOUBLE PRECISION,
        matched_at   TIMESTAMPTZ NOT NULL,
        UNIQUE (email, posting_key)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS matches_email_score_idx ON matches (email, score DESC)",
];

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the `profiles` and `matches` tables if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready");
    Ok(())
}
