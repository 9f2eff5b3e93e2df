//! User quota persistence
//!
//! Quota fields are only ever written through [`compare_and_swap_quota`], a
//! conditional UPDATE that succeeds only if the row still holds the state the
//! caller decided on.

use relluna_common::db::{QuotaState, UserRow};
use relluna_common::{Error, Result};
use sqlx::SqlitePool;

use crate::utils::db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

/// Load a user row
pub async fn load_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT guid, name, email, plan_tier, relumination_credits,
               relumination_used_this_month, relumination_month_ref
        FROM users
        WHERE guid = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replace quota fields if, and only if, they still equal `expected`
///
/// Returns `false` when another writer changed the row first.
pub async fn compare_and_swap_quota(
    pool: &SqlitePool,
    user_id: &str,
    expected: &QuotaState,
    next: &QuotaState,
) -> Result<bool> {
    retry_on_lock("quota compare-and-swap", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET plan_tier = ?,
                relumination_credits = ?,
                relumination_used_this_month = ?,
                relumination_month_ref = ?
            WHERE guid = ?
              AND plan_tier = ?
              AND relumination_credits = ?
              AND relumination_used_this_month = ?
              AND relumination_month_ref IS ?
            "#,
        )
        .bind(next.plan_tier.as_str())
        .bind(next.relumination_credits)
        .bind(next.relumination_used_this_month)
        .bind(next.relumination_month_ref.as_deref())
        .bind(user_id)
        .bind(expected.plan_tier.as_str())
        .bind(expected.relumination_credits)
        .bind(expected.relumination_used_this_month)
        .bind(expected.relumination_month_ref.as_deref())
        .execute(pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    })
    .await
}

/// Insert a user with the given quota state
pub async fn insert_user(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    email: &str,
    quota: &QuotaState,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (
            guid, name, email, plan_tier, relumination_credits,
            relumination_used_this_month, relumination_month_ref
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(email)
    .bind(quota.plan_tier.as_str())
    .bind(quota.relumination_credits)
    .bind(quota.relumination_used_this_month)
    .bind(quota.relumination_month_ref.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}
