//! Database initialization
//!
//! Pool construction and idempotent schema creation for the SQLite store.
//! The unique constraints declared here back every insert-if-absent write
//! in the engine; no code path checks for existence before inserting.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::Result;

/// Connect to the database at the given path-style URL, creating the file
/// if it does not exist.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Enforce FK integrity for course/chapter references
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    Ok(pool)
}

/// Connect to a private in-memory database.
///
/// A single connection keeps every query on the same in-memory instance.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes if they do not exist. Safe to call on
/// every startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            published INTEGER NOT NULL DEFAULT 0,
            series_name TEXT,
            series_part INTEGER,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            CHECK (price_cents >= 0),
            CHECK (series_name IS NULL OR series_part IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chapters (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            default_unlocked INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // System of record for entitlement. The (customer_email, course_id)
    // unique pair is the sole serialization point for grant creation.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_entries (
            id TEXT PRIMARY KEY,
            customer_email TEXT NOT NULL,
            course_id TEXT NOT NULL REFERENCES courses(id),
            customer_name TEXT,
            customer_phone TEXT,
            price_cents INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('PENDING', 'PAID', 'FAILED', 'REFUNDED', 'CANCELLED')),
            payment_method TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE (customer_email, course_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Created only by the chapter access cascade; rows are never deleted
    // and never flipped back to locked.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chapter_access (
            account_id TEXT NOT NULL,
            chapter_id TEXT NOT NULL REFERENCES chapters(id),
            unlocked INTEGER NOT NULL DEFAULT 0,
            unlocked_at TIMESTAMP,
            PRIMARY KEY (account_id, chapter_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_customer ON ledger_entries(customer_email)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_course_status ON ledger_entries(course_id, status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_series ON courses(series_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chapters_course ON chapters(course_id, position)")
        .execute(pool)
        .await?;

    Ok(())
}
