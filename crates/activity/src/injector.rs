use crate::{ActivityError, NOTIFY_CHANNEL};

/// ActivityEntry is a single row read back from the activity log.
#[derive(Clone, Debug)]
pub struct ActivityEntry {
    pub id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub event: Vec<u8>,
}

/// Injects `event` into the activity log. Insertion and the NOTIFY happen
/// inside a single transaction: both must succeed or both roll back, so a
/// reader never observes a notification for a row it can't yet see.
pub async fn inject(pool: &sqlx::PgPool, event: &[u8]) -> Result<i64, ActivityError> {
    let mut txn = pool.begin().await?;

    let row = sqlx::query!(
        "insert into activity_logs (event) values ($1) returning id",
        event,
    )
    .fetch_one(&mut *txn)
    .await?;

    sqlx::query(&format!("select pg_notify('{NOTIFY_CHANNEL}', $1)"))
        .bind(row.id.to_string())
        .execute(&mut *txn)
        .await?;

    txn.commit().await?;

    Ok(row.id)
}

/// Returns the current max activity-log id, or `0` if the log is empty.
/// Used to seed a fresh `ActivityReader` so it doesn't redeliver the entire
/// retained history on every process restart.
pub async fn max_id(pool: &sqlx::PgPool) -> Result<i64, ActivityError> {
    let row = sqlx::query!("select max(id) as max_id from activity_logs")
        .fetch_one(pool)
        .await?;
    Ok(row.max_id.unwrap_or(0))
}
