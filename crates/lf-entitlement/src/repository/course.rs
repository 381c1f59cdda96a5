//! Course Repository

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::Course;
use crate::error::{EntitlementError, Result};

pub struct CourseRepository {
    pool: SqlitePool,
}

impl CourseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, course: &Course) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, title, price_cents, published, series_name, series_part, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&course.id)
        .bind(&course.title)
        .bind(course.price_cents)
        .bind(course.published)
        .bind(&course.series_name)
        .bind(course.series_part)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_course))
    }

    /// Flip the published flag on. Idempotent; returns the course.
    pub async fn publish(&self, id: &str) -> Result<Course> {
        let result = sqlx::query("UPDATE courses SET published = 1, updated_at = ? WHERE id = ?")
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EntitlementError::course_not_found(id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| EntitlementError::course_not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query("SELECT * FROM courses ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_course).collect())
    }

    /// All published courses of a series, ascending part order. This query
    /// *is* the series; membership is never cached.
    pub async fn published_series(&self, series_name: &str) -> Result<Vec<Course>> {
        let rows = sqlx::query(
            "SELECT * FROM courses WHERE series_name = ? AND published = 1 ORDER BY series_part, id",
        )
        .bind(series_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_course).collect())
    }
}

fn row_to_course(row: SqliteRow) -> Course {
    Course {
        id: row.get("id"),
        title: row.get("title"),
        price_cents: row.get("price_cents"),
        published: row.get("published"),
        series_name: row.get("series_name"),
        series_part: row.get("series_part"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
