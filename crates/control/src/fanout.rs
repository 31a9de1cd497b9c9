use tokio_util::sync::CancellationToken;

use crate::activity_event::ActivityEvent;
use crate::context::ServerContext;
use crate::Error;
use tokens::KeySource;

/// A single `{name, value}` pair as persisted in a `services.labels` array
/// element (e.g. `"env=prod"`), converted back to its wire shape. Mirrors
/// `materializer::account`'s private helper of the same shape; duplicated
/// rather than shared because the two crates have no common dependency to
/// hang it from and the conversion is a one-liner.
fn label_pair_from_flattened(pair: &str) -> proto::LabelPair {
    match pair.split_once('=') {
        Some((name, value)) => proto::LabelPair {
            name: name.to_string(),
            value: value.to_string(),
        },
        None => proto::LabelPair {
            name: pair.to_string(),
            value: String::new(),
        },
    }
}

fn label_set_from_flattened(flattened: &str) -> proto::LabelSet {
    proto::LabelSet {
        labels: models::explode_labels(flattened)
            .into_iter()
            .map(|label| proto::LabelPair {
                name: label.name,
                value: label.value,
            })
            .collect(),
    }
}

/// Rebuilds `account_id`'s current `AccountServices` from the catalog and
/// broadcasts it to every connected hub. Used both by the RPC handlers
/// immediately after a mutation, and by the activity-log replay task for
/// events originated by other control-plane replicas (§4.2, control flow of
/// §2).
pub async fn broadcast_account_change<K: KeySource>(
    ctx: &ServerContext<K>,
    account_id: models::Id,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let mut services = Vec::new();
    catalog::for_each_service_in_account(&ctx.pool, account_id, cancel, |row| {
        services.push(proto::ServiceRoute {
            hub_id: row.hub_id.as_bytes().to_vec(),
            service_id: row.service_id.as_bytes().to_vec(),
            r#type: row.r#type.clone(),
            labels: Some(proto::LabelSet {
                labels: row.labels.iter().map(|p| label_pair_from_flattened(p)).collect(),
            }),
        });
    })
    .await?;

    let activity = proto::CentralActivity {
        account_services: vec![proto::AccountServices {
            account_id: account_id.as_bytes().to_vec(),
            services,
        }],
        new_label_links: Vec::new(),
    };

    ctx.hubs.broadcast_activity(&activity, cancel).await;
    Ok(())
}

/// Rebuilds every label link from the catalog and broadcasts them as one
/// `CentralActivity`. Label links materialize to a single global blob, so
/// unlike account changes there is no per-account scoping here.
pub async fn broadcast_label_links<K: KeySource>(
    ctx: &ServerContext<K>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let mut links = Vec::new();
    catalog::for_each_label_link(&ctx.pool, cancel, |row| {
        links.push(proto::LabelLink {
            account_id: row.account_id.as_bytes().to_vec(),
            labels: Some(label_set_from_flattened(&row.labels)),
            target: Some(label_set_from_flattened(&row.target)),
        });
    })
    .await?;

    let activity = proto::CentralActivity {
        account_services: Vec::new(),
        new_label_links: links,
    };

    ctx.hubs.broadcast_activity(&activity, cancel).await;
    Ok(())
}

/// Records `event` in the activity log and pushes it to the currently
/// connected hub fan-out (the RPC-handler half of the control flow in §2;
/// the activity-reader half lives in [`crate::replay`]).
pub async fn inject_and_broadcast<K: KeySource>(
    ctx: &ServerContext<K>,
    event: ActivityEvent,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let encoded = serde_json::to_vec(&event)
        .map_err(|e| Error::Backend(anyhow::anyhow!("failed to encode activity event: {e}")))?;
    activity::inject(&ctx.pool, &encoded).await?;
    apply_event(ctx, &event, cancel).await
}

/// Applies an [`ActivityEvent`] by rebroadcasting the current catalog state
/// it names. Shared by the direct post-mutation path and the replay reader
/// so both paths stay byte-for-byte consistent.
pub async fn apply_event<K: KeySource>(
    ctx: &ServerContext<K>,
    event: &ActivityEvent,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    match event {
        ActivityEvent::AccountChanged { account_id } => {
            broadcast_account_change(ctx, *account_id, cancel).await
        }
        ActivityEvent::LabelLinksChanged => broadcast_label_links(ctx, cancel).await,
    }
}
