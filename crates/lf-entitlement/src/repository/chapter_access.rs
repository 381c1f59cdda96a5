//! Chapter Access Repository
//!
//! Upsert-if-absent unlock writes. The conflict clause only fires for a
//! still-locked row, so an unlock is a no-op once performed and nothing
//! here can re-lock a chapter.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::ChapterAccess;
use crate::error::Result;

pub struct ChapterAccessRepository {
    pool: SqlitePool,
}

impl ChapterAccessRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Unlock one chapter for one account. Returns true when this call
    /// changed state (row created or flipped to unlocked), false when the
    /// chapter was already unlocked.
    pub async fn unlock(
        &self,
        account_id: &str,
        chapter_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO chapter_access (account_id, chapter_id, unlocked, unlocked_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT (account_id, chapter_id) DO UPDATE SET
                unlocked = 1,
                unlocked_at = excluded.unlocked_at
            WHERE chapter_access.unlocked = 0
            "#,
        )
        .bind(account_id)
        .bind(chapter_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, account_id: &str, chapter_id: &str) -> Result<Option<ChapterAccess>> {
        let row = sqlx::query(
            "SELECT * FROM chapter_access WHERE account_id = ? AND chapter_id = ?",
        )
        .bind(account_id)
        .bind(chapter_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_access))
    }

    pub async fn list_for_account(&self, account_id: &str) -> Result<Vec<ChapterAccess>> {
        let rows = sqlx::query("SELECT * FROM chapter_access WHERE account_id = ?")
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_access).collect())
    }
}

fn row_to_access(row: SqliteRow) -> ChapterAccess {
    ChapterAccess {
        account_id: row.get("account_id"),
        chapter_id: row.get("chapter_id"),
        unlocked: row.get("unlocked"),
        unlocked_at: row.get("unlocked_at"),
    }
}
