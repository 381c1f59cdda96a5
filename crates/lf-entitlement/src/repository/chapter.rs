//! Chapter Repository

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::Chapter;
use crate::error::Result;

pub struct ChapterRepository {
    pool: SqlitePool,
}

impl ChapterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, chapter: &Chapter) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chapters (id, course_id, title, position, default_unlocked, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chapter.id)
        .bind(&chapter.course_id)
        .bind(&chapter.title)
        .bind(chapter.position)
        .bind(chapter.default_unlocked)
        .bind(chapter.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_course(&self, course_id: &str) -> Result<Vec<Chapter>> {
        let rows = sqlx::query("SELECT * FROM chapters WHERE course_id = ? ORDER BY position, id")
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_chapter).collect())
    }
}

fn row_to_chapter(row: SqliteRow) -> Chapter {
    Chapter {
        id: row.get("id"),
        course_id: row.get("course_id"),
        title: row.get("title"),
        position: row.get("position"),
        default_unlocked: row.get("default_unlocked"),
        created_at: row.get("created_at"),
    }
}
