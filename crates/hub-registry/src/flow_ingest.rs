use tokio::sync::Mutex;

use crate::connected_hub::ConnectedHub;
use crate::flow_top::FlowTop;
use models::Id;

/// Applies one inbound `FlowBatch` to a connected hub's counters and the
/// shared `FlowTop` tracker (§4.5 step 4). Kept as a pure function over the
/// registry's own types so the tonic-facing receiver task in the RPC layer
/// stays a thin loop: read a message, hand it here, repeat.
pub async fn ingest_flow_batch(hub: &ConnectedHub, flow_top: &Mutex<FlowTop>, batch: &proto::FlowBatch) {
    for record in &batch.flow {
        match &record.body {
            Some(proto::flow_record::Body::Stream(stream)) => {
                hub.record_flow(stream.num_messages as u64, stream.num_bytes as u64);

                if let Ok(flow_id) = Id::from_hex(hex::encode(&stream.flow_id)) {
                    flow_top
                        .lock()
                        .await
                        .submit(flow_id, stream.num_messages.max(0) as u64);
                }

                let flow = hex::encode(&stream.flow_id);
                let hub_label = hex::encode(&stream.hub_id);
                let agent = hex::encode(&stream.agent_id);
                let service = hex::encode(&stream.service_id);
                let account = hex::encode(&stream.account_id);

                metrics::counter!(
                    "stream_messages",
                    "flow" => flow.clone(),
                    "hub" => hub_label.clone(),
                    "agent" => agent.clone(),
                    "service" => service.clone(),
                    "account" => account.clone()
                )
                .increment(stream.num_messages.max(0) as u64);
                metrics::counter!(
                    "stream_bytes",
                    "flow" => flow,
                    "hub" => hub_label,
                    "agent" => agent,
                    "service" => service,
                    "account" => account
                )
                .increment(stream.num_bytes.max(0) as u64);

                tracing::debug!(
                    hub_id = %hub.id,
                    num_messages = stream.num_messages,
                    num_bytes = stream.num_bytes,
                    "ingested stream flow record",
                );
            }
            Some(proto::flow_record::Body::Agent(agent)) => {
                metrics::gauge!(
                    "hub_streams",
                    "hub" => hex::encode(&agent.hub_id),
                    "agent" => hex::encode(&agent.agent_id),
                    "account" => hex::encode(&agent.account_id)
                )
                .set(agent.active_streams as f64);

                tracing::debug!(
                    hub_id = %hub.id,
                    agent_id = hex::encode(&agent.agent_id),
                    active_streams = agent.active_streams,
                    "ingested agent flow record",
                );
            }
            None => {
                tracing::warn!(hub_id = %hub.id, "flow record carried neither a stream nor an agent body");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connected_hub::ConnectedHub;

    #[tokio::test]
    async fn stream_records_update_hub_counters() {
        let (hub, _rx) = ConnectedHub::new(Id::generate());
        let flow_top = Mutex::new(FlowTop::default());

        let batch = proto::FlowBatch {
            flow: vec![proto::FlowRecord {
                body: Some(proto::flow_record::Body::Stream(proto::StreamRecord {
                    flow_id: Id::generate().as_bytes().to_vec(),
                    hub_id: hub.id.as_bytes().to_vec(),
                    agent_id: Id::generate().as_bytes().to_vec(),
                    service_id: Id::generate().as_bytes().to_vec(),
                    account_id: Id::generate().as_bytes().to_vec(),
                    num_messages: 3,
                    num_bytes: 1024,
                })),
            }],
        };

        ingest_flow_batch(&hub, &flow_top, &batch).await;

        assert_eq!(hub.messages(), 3);
        assert_eq!(hub.bytes(), 1024);
        assert_eq!(flow_top.lock().await.len(), 1);
    }
}
