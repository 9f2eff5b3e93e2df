//! Memory record access

use relluna_common::db::MemoryRecord;
use relluna_common::{Error, Result};
use sqlx::SqlitePool;

use crate::utils::db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

/// Load a memory owned by `user_id`
///
/// A memory owned by someone else is reported as absent.
pub async fn load_memory_for_user(
    pool: &SqlitePool,
    memory_id: &str,
    user_id: &str,
) -> Result<Option<MemoryRecord>> {
    let record = sqlx::query_as::<_, MemoryRecord>(
        r#"
        SELECT guid, user_id, main_caption, media_url, alt_text,
               short_description, long_description,
               relumination_url, relumination_style
        FROM memories
        WHERE guid = ? AND user_id = ?
        "#,
    )
    .bind(memory_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Store the generated relumination on a memory (overwrites any previous one)
pub async fn set_relumination(
    pool: &SqlitePool,
    memory_id: &str,
    relumination_url: &str,
    style: i64,
) -> Result<()> {
    let updated = retry_on_lock("set relumination", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        let result = sqlx::query(
            "UPDATE memories SET relumination_url = ?, relumination_style = ? WHERE guid = ?",
        )
        .bind(relumination_url)
        .bind(style)
        .bind(memory_id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    })
    .await?;

    if updated == 0 {
        return Err(Error::NotFound(format!("memory {}", memory_id)));
    }

    Ok(())
}

/// Insert a memory record
pub async fn insert_memory(pool: &SqlitePool, memory: &MemoryRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO memories (
            guid, user_id, main_caption, media_url, alt_text,
            short_description, long_description,
            relumination_url, relumination_style
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&memory.guid)
    .bind(&memory.user_id)
    .bind(&memory.main_caption)
    .bind(&memory.media_url)
    .bind(&memory.alt_text)
    .bind(&memory.short_description)
    .bind(&memory.long_description)
    .bind(&memory.relumination_url)
    .bind(memory.relumination_style)
    .execute(pool)
    .await?;

    Ok(())
}
