use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix;
use tokio_util::sync::CancellationToken;

use control::config::Args;
use control::{ControlServer, ServerContext};
use tokens::{InMemoryKeySource, TokenAuthority};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();
    let pool = sqlx::PgPool::connect(&args.database_url).await?;
    sqlx::migrate!("../catalog/migrations").run(&pool).await?;

    // The token signing KMS backend is an external collaborator out of this
    // binary's scope (§1, §6); `InMemoryKeySource` is the local stand-in,
    // the same one the crate's own tests use.
    let key_source = InMemoryKeySource::new();
    let token_authority = TokenAuthority::new(key_source, args.token_key_path.clone());
    let token_public_key = token_authority.public_key()?;

    let aws_cfg = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_cfg);
    let dynamo_client = aws_sdk_dynamodb::Client::new(&aws_cfg);

    let blobs: Arc<dyn materializer::BlobStore> = Arc::new(materializer::S3BlobStore::new(
        s3_client,
        args.bucket.clone(),
        args.kms_key_id.clone(),
    ));
    let locks: Arc<dyn materializer::LockStore> =
        Arc::new(materializer::DynamoDbLockStore::new(dynamo_client, args.lock_table.clone()));
    let events: Arc<dyn materializer::EventBus> = Arc::new(materializer::BroadcastEventBus::new(256));

    let tls_cert = std::fs::read(&args.tls_cert_path)?;
    let tls_key = std::fs::read(&args.tls_key_path)?;

    let ctx = Arc::new(ServerContext {
        pool: pool.clone(),
        hubs: Arc::new(hub_registry::HubRegistry::new()),
        flow_top: Arc::new(tokio::sync::Mutex::new(hub_registry::FlowTop::default())),
        token_authority,
        token_public_key,
        token_key_id: args.token_key_path.clone(),
        account_materializer: materializer::AccountMaterializer::new(
            pool.clone(),
            blobs.clone(),
            locks,
            events.clone(),
        ),
        label_link_materializer: materializer::LabelLinkMaterializer::new(pool.clone(), blobs, events),
        register_token: args.register_token.clone(),
        tls_cert,
        tls_key,
    });

    let cancel = CancellationToken::new();

    let pruner = tokio::spawn(activity::run_periodic_pruner(
        pool.clone(),
        args.activity_retention,
        args.pruner_period,
        cancel.clone(),
    ));

    let last_seen_id = activity::max_id(&pool).await?;
    let reader = activity::ActivityReader::connect(pool.clone(), last_seen_id).await?;
    let replay = tokio::spawn(control::replay::run(ctx.clone(), reader, cancel.clone()));

    let mut sigint = unix::signal(unix::SignalKind::interrupt())?;
    let mut sigterm = unix::signal(unix::SignalKind::terminate())?;
    let shutdown = {
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = sigint.recv() => (),
                _ = sigterm.recv() => (),
            }
            tracing::info!("caught signal to exit");
            cancel.cancel();
        }
    };

    tracing::info!(addr = %args.bind_addr, "control plane listening");
    tonic::transport::Server::builder()
        .add_service(proto::control_services_server::ControlServicesServer::new(
            ControlServer::new(ctx),
        ))
        .serve_with_shutdown(args.bind_addr, shutdown)
        .await?;

    cancel.cancel();
    let _ = pruner.await;
    let _ = replay.await;

    Ok(())
}
