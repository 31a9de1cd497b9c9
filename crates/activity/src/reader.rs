use crate::injector::ActivityEntry;
use crate::{ActivityError, NOTIFY_CHANNEL};
use sqlx::postgres::PgListener;
use std::time::Duration;
use tokio::sync::mpsc;

/// ActivityReader tails the activity log from a dedicated listener
/// connection and delivers batches of new rows on `C`. State machine:
/// `Starting -> Listening <-> Delivering -> Closed`, matching §4.2.
///
/// Modeled closely on `agent::handlers::listen_for_tasks`: a long-lived
/// `PgListener`, a keepalive poke on an idle timeout so a dead TCP
/// connection surfaces instead of hanging forever, and re-querying the
/// backing table after every notification (here: rows, there: task
/// tables).
pub struct ActivityReader {
    pub rx: mpsc::UnboundedReceiver<Vec<ActivityEntry>>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl ActivityReader {
    pub async fn connect(pool: sqlx::PgPool, last_seen_id: i64) -> Result<Self, ActivityError> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(NOTIFY_CHANNEL).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        let task = tokio::spawn(async move {
            let mut last_seen_id = last_seen_id;
            let mut should_poke = false;

            loop {
                if should_poke {
                    should_poke = false;
                    if listener.listen("activity_log_keepalive").await.is_err() {
                        return;
                    }
                    let _ = listener.unlisten("activity_log_keepalive").await;
                }

                let idle_timeout = tokio::time::sleep(Duration::from_secs(30));

                tokio::select! {
                    _ = &mut shutdown_rx => return,
                    _ = idle_timeout => {
                        should_poke = true;
                        continue;
                    }
                    notification = listener.try_recv() => {
                        match notification {
                            Ok(Some(_)) | Ok(None) => {}
                            Err(err) => {
                                tracing::warn!(?err, "activity log listener error, stopping reader");
                                return;
                            }
                        }
                    }
                }

                match fetch_new_rows(&pool, last_seen_id).await {
                    Ok(rows) if rows.is_empty() => continue,
                    Ok(rows) => {
                        last_seen_id = rows.iter().map(|r| r.id).max().unwrap_or(last_seen_id);
                        if tx.send(rows).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(?err, "failed to read activity log rows after notification");
                    }
                }
            }
        });

        Ok(Self {
            rx,
            shutdown: shutdown_tx,
            task,
        })
    }

    /// Closes the reader: stops the background task and drops the listener
    /// connection. Any notification already in flight is allowed to finish
    /// delivering before the task observes shutdown.
    pub async fn close(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

async fn fetch_new_rows(
    pool: &sqlx::PgPool,
    last_seen_id: i64,
) -> Result<Vec<ActivityEntry>, ActivityError> {
    let rows = sqlx::query!(
        "select id, created_at, event from activity_logs where id > $1 order by id asc",
        last_seen_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ActivityEntry {
            id: r.id,
            created_at: r.created_at,
            event: r.event,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject;

    fn env_database_url() -> Option<String> {
        std::env::var("DATABASE_URL").ok()
    }

    #[tokio::test]
    async fn reader_delivers_injected_events_in_order() {
        let Some(url) = env_database_url() else {
            tracing::warn!("DATABASE_URL not set, skipping integration test");
            return;
        };
        let pool = sqlx::PgPool::connect(&url).await.unwrap();

        let mut reader = ActivityReader::connect(pool.clone(), 0).await.unwrap();
        // give the listener a moment to subscribe before we inject, as the
        // original test does with its own `time.Sleep`.
        tokio::time::sleep(Duration::from_millis(200)).await;

        inject(&pool, br#""this is an event""#).await.unwrap();
        let batch = tokio::time::timeout(Duration::from_secs(5), reader.rx.recv())
            .await
            .expect("timed out waiting for first batch")
            .expect("channel closed unexpectedly");
        assert_eq!(batch[0].event, br#""this is an event""#);

        inject(&pool, br#""this is a second event""#).await.unwrap();
        let batch = tokio::time::timeout(Duration::from_secs(5), reader.rx.recv())
            .await
            .expect("timed out waiting for second batch")
            .expect("channel closed unexpectedly");
        assert_eq!(batch[0].event, br#""this is a second event""#);

        reader.close().await;
    }

    #[tokio::test]
    async fn restarted_reader_redelivers_events_past_last_seen_id() {
        let Some(url) = env_database_url() else {
            tracing::warn!("DATABASE_URL not set, skipping integration test");
            return;
        };
        let pool = sqlx::PgPool::connect(&url).await.unwrap();

        let id = inject(&pool, b"\"redelivery-probe\"").await.unwrap();

        let mut reader = ActivityReader::connect(pool.clone(), id - 1).await.unwrap();
        inject(&pool, b"\"nudge\"").await.unwrap();

        let batch = tokio::time::timeout(Duration::from_secs(5), reader.rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert!(batch.iter().any(|e| e.id == id));
        reader.close().await;
    }
}
