//! The hub registry and fan-out plane (C5): tracks hubs connected over the
//! bidirectional activity stream, broadcasts activity log events to them,
//! and ingests their flow telemetry. Grounded on the connected-hub map and
//! receiver-task split in `original_source/pkg/control/server.go`, expressed
//! with the teacher's `tokio::sync::RwLock`-guarded shared-map idiom.

mod connected_hub;
mod flow_ingest;
mod flow_top;
mod registry;

pub use connected_hub::ConnectedHub;
pub use flow_ingest::ingest_flow_batch;
pub use flow_top::{FlowTop, DEFAULT_CAPACITY};
pub use registry::HubRegistry;
