use crate::ActivityError;

/// Deletes all activity-log rows older than `retention`. `retention` is a
/// first-class argument rather than a hard-coded constant (§9: tests must
/// be able to pass `Duration::ZERO`); the default used by the long-running
/// pruner task is ~5 hours, wired in `control`'s process entrypoint.
pub async fn prune_older_than(
    pool: &sqlx::PgPool,
    retention: std::time::Duration,
) -> Result<u64, ActivityError> {
    let cutoff = chrono::Utc::now()
        - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());

    let result = sqlx::query!("delete from activity_logs where created_at < $1", cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Runs `prune_older_than` on a fixed interval until `cancel` fires, in the
/// idiom of the teacher's connection-pool-stats interval task in
/// `agent::main` (a plain `tokio::time::interval` loop, not the heavier
/// `automations::Executor` task-state-machine -- pruning has no per-task
/// state to persist between ticks).
pub async fn run_periodic_pruner(
    pool: sqlx::PgPool,
    retention: std::time::Duration,
    period: std::time::Duration,
    cancel: tokio_util::sync::CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                match prune_older_than(&pool, retention).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "pruned old activity log rows");
                        }
                    }
                    Err(err) => tracing::warn!(?err, "activity log pruner failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_database_url() -> Option<String> {
        std::env::var("DATABASE_URL").ok()
    }

    #[tokio::test]
    async fn prunes_rows_older_than_retention_and_keeps_newer_ones() {
        let Some(url) = env_database_url() else {
            tracing::warn!("DATABASE_URL not set, skipping integration test");
            return;
        };
        let pool = sqlx::PgPool::connect(&url).await.unwrap();

        let old_cutoff = chrono::Utc::now() - chrono::Duration::hours(6);
        sqlx::query!(
            "insert into activity_logs (created_at, event) values ($1, $2)",
            old_cutoff,
            b"1".as_slice(),
        )
        .execute(&pool)
        .await
        .unwrap();

        let fresh_id = sqlx::query!(
            "insert into activity_logs (event) values ($1) returning id",
            b"2".as_slice(),
        )
        .fetch_one(&pool)
        .await
        .unwrap()
        .id;

        prune_older_than(&pool, std::time::Duration::from_secs(5 * 3600))
            .await
            .unwrap();

        let remaining: Vec<i64> = sqlx::query_scalar!("select id from activity_logs")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, vec![fresh_id]);
    }
}
