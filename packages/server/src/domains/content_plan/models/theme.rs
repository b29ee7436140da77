use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domains::content_plan::themes::ParsedTheme;

/// Theme - one candidate content direction generated for a job.
///
/// `position` is the 1-based number shown to (and submitted by) the user.
/// At most one theme per job is ever selected; a partial unique index backs
/// that up at the store.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Theme {
    pub id: Uuid,
    pub job_id: Uuid,
    pub position: i32,
    pub title: String,
    pub description: String,
    pub keywords: Option<Value>,
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
}

impl Theme {
    // ===== SQL Queries

    /// Replace the job's themes with a freshly parsed set, all or nothing.
    /// Positions are assigned from list order, starting at 1.
    pub async fn replace_for_job(
        job_id: Uuid,
        parsed: &[ParsedTheme],
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM themes WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        let mut themes = Vec::with_capacity(parsed.len());
        for (i, theme) in parsed.iter().enumerate() {
            let row = sqlx::query_as::<_, Theme>(
                r#"
                INSERT INTO themes (id, job_id, position, title, description)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(i as i32 + 1)
            .bind(&theme.title)
            .bind(&theme.description)
            .fetch_one(&mut *tx)
            .await?;
            themes.push(row);
        }

        tx.commit().await?;
        Ok(themes)
    }

    /// The job's themes in display order.
    pub async fn find_for_job(job_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        let themes = sqlx::query_as::<_, Theme>(
            "SELECT * FROM themes WHERE job_id = $1 ORDER BY position",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await?;
        Ok(themes)
    }

    pub async fn find_selected(job_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let theme = sqlx::query_as::<_, Theme>(
            "SELECT * FROM themes WHERE job_id = $1 AND is_selected",
        )
        .bind(job_id)
        .fetch_optional(pool)
        .await?;
        Ok(theme)
    }

    /// Display-order read inside the selection transaction (the caller holds
    /// the job row lock).
    pub async fn find_for_job_in_tx(job_id: Uuid, conn: &mut PgConnection) -> Result<Vec<Self>> {
        let themes = sqlx::query_as::<_, Theme>(
            "SELECT * FROM themes WHERE job_id = $1 ORDER BY position",
        )
        .bind(job_id)
        .fetch_all(conn)
        .await?;
        Ok(themes)
    }

    pub async fn has_selected_in_tx(job_id: Uuid, conn: &mut PgConnection) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM themes WHERE job_id = $1 AND is_selected)",
        )
        .bind(job_id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// Mark the theme at `position` selected. Returns the row, or `None`
    /// when the position does not exist for this job.
    pub async fn select_in_tx(
        job_id: Uuid,
        position: i32,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        let theme = sqlx::query_as::<_, Theme>(
            r#"
            UPDATE themes
            SET is_selected = TRUE
            WHERE job_id = $1 AND position = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(position)
        .fetch_optional(conn)
        .await?;
        Ok(theme)
    }
}
