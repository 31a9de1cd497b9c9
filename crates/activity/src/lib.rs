//! The activity log (C2): an append-and-notify event queue on top of
//! Postgres LISTEN/NOTIFY, plus its background pruner. Grounded on the
//! teacher's `agent::handlers::listen_for_tasks`, which owns a dedicated
//! `PgListener` and re-polls on notification, and on the retention-sweep
//! behavior implied by `original_source/pkg/control/activity_test.go`.

mod error;
mod injector;
mod pruner;
mod reader;

pub use error::ActivityError;
pub use injector::{inject, max_id, ActivityEntry};
pub use pruner::{prune_older_than, run_periodic_pruner};
pub use reader::ActivityReader;

const NOTIFY_CHANNEL: &str = "activity_log_notifications";
