use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};

use models::{Id, Role};
use tokens::{KeySource, TokenBody};

use crate::activity_event::ActivityEvent;
use crate::context::ServerContext;
use crate::fanout::{broadcast_account_change, broadcast_label_links, inject_and_broadcast};
use crate::{auth, hub_locations, Error};

use proto::control_services_server::ControlServices;
use proto::{
    AddLabelLinkRequest, AddServiceRequest, ConfigRequest, ConfigResponse, ControlToken,
    CreateTokenRequest, CreateTokenResponse, HubFrame, HubInfo, ListOfHubs, Noop, RegisterRequest,
    RemoveLabelLinkRequest, RemoveServiceRequest, ServiceResponse,
};

/// The RPC surface (C6): every entry point authenticates first (§4.6), then
/// drives the catalog, activity log, materializer, and hub fan-out in the
/// sequence §2 describes. `ControlServer` itself holds nothing but a handle
/// to the shared [`ServerContext`] -- one task per invocation is spawned by
/// tonic, so there is no per-request state to carry beyond that.
pub struct ControlServer<K: KeySource> {
    ctx: Arc<ServerContext<K>>,
}

impl<K: KeySource> ControlServer<K> {
    pub fn new(ctx: Arc<ServerContext<K>>) -> Self {
        Self { ctx }
    }
}

fn parse_id(bytes: &[u8]) -> Result<Id, Error> {
    let exact: [u8; 16] = bytes
        .try_into()
        .map_err(|_| Error::InvalidRequest("expected a 16-byte id".into()))?;
    Ok(Id::new(exact))
}

fn labels_from_proto(set: Option<proto::LabelSet>) -> Vec<models::Label> {
    set.map(|s| {
        s.labels
            .into_iter()
            .map(|p| models::Label::new(p.name, p.value))
            .collect()
    })
    .unwrap_or_default()
}

/// Flattens a request's labels into the ordered array form `services.labels`
/// is stored as: one flattened pair per array element, in request order
/// (§3: "ordered list of label strings" -- unlike a label link's canonical
/// joined form, this list is not sorted as a whole).
fn service_label_array(set: Option<proto::LabelSet>) -> Vec<String> {
    labels_from_proto(set)
        .iter()
        .map(|l| models::flatten_labels(std::slice::from_ref(l)))
        .collect()
}

#[tonic::async_trait]
impl<K: KeySource + Send + Sync + 'static> ControlServices for ControlServer<K> {
    type StreamActivityStream = ActivityOutboundStream;

    async fn add_service(
        &self,
        request: Request<AddServiceRequest>,
    ) -> Result<Response<ServiceResponse>, Status> {
        auth::check_from_hub(&request, self.ctx.public_key())?;
        let req = request.into_inner();

        let account_id = parse_id(&req.account_id)?;
        let hub_id = parse_id(&req.hub_id)?;
        let service_id = parse_id(&req.service_id)?;
        let labels = service_label_array(req.labels);

        catalog::insert_service(&self.ctx.pool, account_id, hub_id, service_id, &req.r#type, &labels)
            .await
            .map_err(Error::from)?;

        let cancel = CancellationToken::new();
        inject_and_broadcast(&self.ctx, ActivityEvent::AccountChanged { account_id }, &cancel).await?;
        self.ctx
            .account_materializer
            .materialize(account_id, &cancel)
            .await
            .map_err(Error::from)?;

        Ok(Response::new(ServiceResponse {}))
    }

    async fn remove_service(
        &self,
        request: Request<RemoveServiceRequest>,
    ) -> Result<Response<ServiceResponse>, Status> {
        auth::check_from_hub(&request, self.ctx.public_key())?;
        let req = request.into_inner();

        let account_id = parse_id(&req.account_id)?;
        let service_id = parse_id(&req.service_id)?;

        catalog::delete_service_by_service_id(&self.ctx.pool, service_id)
            .await
            .map_err(Error::from)?;

        let cancel = CancellationToken::new();
        inject_and_broadcast(&self.ctx, ActivityEvent::AccountChanged { account_id }, &cancel).await?;
        self.ctx
            .account_materializer
            .materialize(account_id, &cancel)
            .await
            .map_err(Error::from)?;

        Ok(Response::new(ServiceResponse {}))
    }

    async fn add_label_link(&self, request: Request<AddLabelLinkRequest>) -> Result<Response<Noop>, Status> {
        let valid = auth::check_mgmt_allowed(&request, self.ctx.public_key())?;
        let req = request.into_inner();

        if !valid.allows_namespace(&req.account_namespace) {
            return Err(Error::InvalidRequest(format!(
                "namespace {} is outside the caller's scope",
                req.account_namespace
            ))
            .into());
        }

        let account_id = parse_id(&req.account_id)?;
        let labels = models::flatten_labels(&labels_from_proto(req.labels));
        let target = models::flatten_labels(&labels_from_proto(req.target));

        catalog::upsert_account(&self.ctx.pool, account_id, &req.account_namespace)
            .await
            .map_err(Error::from)?;
        catalog::insert_label_link(&self.ctx.pool, account_id, &labels, &target)
            .await
            .map_err(Error::from)?;

        let cancel = CancellationToken::new();
        inject_and_broadcast(&self.ctx, ActivityEvent::LabelLinksChanged, &cancel).await?;
        self.ctx
            .label_link_materializer
            .materialize(&cancel)
            .await
            .map_err(Error::from)?;

        Ok(Response::new(Noop {}))
    }

    async fn remove_label_link(
        &self,
        request: Request<RemoveLabelLinkRequest>,
    ) -> Result<Response<Noop>, Status> {
        let valid = auth::check_mgmt_allowed(&request, self.ctx.public_key())?;
        let req = request.into_inner();
        let account_id = parse_id(&req.account_id)?;

        let namespace = catalog::account_namespace(&self.ctx.pool, account_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::InvalidRequest("unknown account".into()))?;
        if !valid.allows_namespace(&namespace) {
            return Err(Error::InvalidRequest(format!(
                "namespace {namespace} is outside the caller's scope"
            ))
            .into());
        }

        let labels = models::flatten_labels(&labels_from_proto(req.labels));
        catalog::delete_label_link(&self.ctx.pool, account_id, &labels)
            .await
            .map_err(Error::from)?;

        let cancel = CancellationToken::new();
        inject_and_broadcast(&self.ctx, ActivityEvent::LabelLinksChanged, &cancel).await?;
        self.ctx
            .label_link_materializer
            .materialize(&cancel)
            .await
            .map_err(Error::from)?;

        Ok(Response::new(Noop {}))
    }

    async fn create_token(
        &self,
        request: Request<CreateTokenRequest>,
    ) -> Result<Response<CreateTokenResponse>, Status> {
        let valid = auth::check_mgmt_allowed(&request, self.ctx.public_key())?;
        let req = request.into_inner();

        if !valid.allows_namespace(&req.account_namespace) {
            return Err(Error::InvalidRequest(format!(
                "namespace {} is outside the caller's scope",
                req.account_namespace
            ))
            .into());
        }

        let account_id = parse_id(&req.account_id)?;

        let mut capabilities = std::collections::HashMap::new();
        for grant in &req.capabilities {
            if grant.capability == models::Capability::Access.as_str() && !valid.allows_namespace(&grant.value) {
                return Err(Error::InvalidRequest(format!(
                    "access capability {} is outside the caller's namespace",
                    grant.value
                ))
                .into());
            }
            capabilities.insert(grant.capability.clone(), grant.value.clone());
        }

        catalog::upsert_account(&self.ctx.pool, account_id, &req.account_namespace)
            .await
            .map_err(Error::from)?;

        let mut body = TokenBody::new(Role::Access);
        body.account_id = Some(account_id);
        body.account_namespace = Some(req.account_namespace);
        body.capabilities = capabilities;
        if req.valid_duration_secs > 0 {
            body = body.with_expiry(chrono::Duration::seconds(req.valid_duration_secs as i64));
        }

        let token = self
            .ctx
            .token_authority
            .issue(&body, &self.ctx.token_key_id)
            .map_err(Error::from)?;

        Ok(Response::new(CreateTokenResponse { token }))
    }

    async fn register(&self, request: Request<RegisterRequest>) -> Result<Response<ControlToken>, Status> {
        auth::check_static_token(&request, &self.ctx.register_token)?;
        let req = request.into_inner();

        if catalog::find_management_client_prefix_collision(&self.ctx.pool, &req.namespace)
            .await
            .map_err(Error::from)?
            .is_some()
        {
            return Err(Error::InvalidRequest(format!(
                "namespace {} collides with an existing registration",
                req.namespace
            ))
            .into());
        }

        catalog::insert_management_client(&self.ctx.pool, Id::generate(), &req.namespace)
            .await
            .map_err(Error::from)?;

        let mut body = TokenBody::new(Role::Manage);
        body.account_namespace = Some(req.namespace);
        let token = self
            .ctx
            .token_authority
            .issue(&body, &self.ctx.token_key_id)
            .map_err(Error::from)?;

        Ok(Response::new(ControlToken { token }))
    }

    async fn issue_hub_token(&self, request: Request<Noop>) -> Result<Response<CreateTokenResponse>, Status> {
        auth::check_static_token(&request, &self.ctx.register_token)?;

        let body = TokenBody::new(Role::Hub);
        let token = self
            .ctx
            .token_authority
            .issue(&body, &self.ctx.token_key_id)
            .map_err(Error::from)?;

        Ok(Response::new(CreateTokenResponse { token }))
    }

    async fn fetch_config(&self, _request: Request<ConfigRequest>) -> Result<Response<ConfigResponse>, Status> {
        Ok(Response::new(ConfigResponse {
            tls_cert: self.ctx.tls_cert.clone(),
            tls_key: self.ctx.tls_key.clone(),
            token_public_key: self.ctx.token_public_key.to_vec(),
        }))
    }

    async fn all_hubs(&self, request: Request<Noop>) -> Result<Response<ListOfHubs>, Status> {
        auth::check_mgmt_allowed(&request, self.ctx.public_key())?;

        let rows = catalog::list_all_hubs(&self.ctx.pool).await.map_err(Error::from)?;
        let hubs = rows
            .into_iter()
            .map(|row| HubInfo {
                id: row.id.as_bytes().to_vec(),
                locations: hub_locations::decode(&row.connection_info),
            })
            .collect();

        Ok(Response::new(ListOfHubs { hubs }))
    }

    async fn stream_activity(
        &self,
        request: Request<Streaming<HubFrame>>,
    ) -> Result<Response<Self::StreamActivityStream>, Status> {
        auth::check_from_hub(&request, self.ctx.public_key())?;
        let mut inbound = request.into_inner();

        let first = inbound.message().await?;
        let Some(HubFrame {
            body: Some(proto::hub_frame::Body::HubReg(reg)),
        }) = first
        else {
            // Absence of a HubReg as the first message terminates the
            // stream cleanly rather than erroring (§4.5 step 1).
            return Ok(Response::new(ActivityOutboundStream {
                rx: None,
                hub_id: Id::generate(),
                registry: self.ctx.hubs.clone(),
                inbound_cancel: CancellationToken::new(),
            }));
        };

        let hub_id = parse_id(&reg.hub_id)?;
        let connection_info = hub_locations::encode(&reg.locations);
        catalog::upsert_hub(&self.ctx.pool, hub_id, &connection_info)
            .await
            .map_err(Error::from)?;

        let (hub, outbound_rx) = self.ctx.hubs.register(hub_id).await;
        tracing::info!(%hub_id, "hub connected");

        let inbound_cancel = CancellationToken::new();
        let receiver_cancel = inbound_cancel.clone();
        let flow_top = self.ctx.flow_top.clone();
        let receiver_hub_id = hub_id;
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = receiver_cancel.cancelled() => break,
                    message = inbound.message() => message,
                };

                match message {
                    Ok(Some(HubFrame {
                        body: Some(proto::hub_frame::Body::FlowBatch(batch)),
                    })) => {
                        hub_registry::ingest_flow_batch(&hub, &flow_top, &batch).await;
                    }
                    Ok(Some(_)) => {
                        tracing::warn!(hub_id = %receiver_hub_id, "ignoring unexpected HubReg after stream start");
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(hub_id = %receiver_hub_id, ?err, "hub inbound stream error");
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ActivityOutboundStream {
            rx: Some(outbound_rx),
            hub_id,
            registry: self.ctx.hubs.clone(),
            inbound_cancel,
        }))
    }
}

/// The server's half of `StreamActivity`: a thin wrapper over the
/// per-hub outbound channel that guarantees deregistration and channel
/// drain (§4.5 step 6) on every exit path, including client disconnect or
/// parent cancellation, by doing that cleanup from `Drop` rather than only
/// on an explicit close -- mirroring `materializer::LockGuard`'s
/// spawn-on-drop release for a resource `Drop` itself cannot `.await`.
struct ActivityOutboundStream {
    rx: Option<mpsc::Receiver<proto::CentralActivity>>,
    hub_id: Id,
    registry: Arc<hub_registry::HubRegistry>,
    inbound_cancel: CancellationToken,
}

impl Stream for ActivityOutboundStream {
    type Item = Result<proto::CentralActivity, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.as_mut() {
            Some(rx) => rx.poll_recv(cx).map(|item| item.map(Ok)),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for ActivityOutboundStream {
    fn drop(&mut self) {
        self.inbound_cancel.cancel();
        if let Some(mut rx) = self.rx.take() {
            let registry = self.registry.clone();
            let hub_id = self.hub_id;
            tokio::spawn(async move {
                registry.deregister(hub_id, &mut rx).await;
            });
        }
    }
}
