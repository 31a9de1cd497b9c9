use std::sync::Arc;

use tokens::{KeySource, TokenAuthority};
use tokio::sync::Mutex;

/// Process-wide server context (§9 "Global state"): the database handle,
/// the hub registry, the materializers, and the token authority, built once
/// at startup and handed to every RPC handler as a shared `Arc`. Grounded on
/// the teacher's own preference for an explicit context struct threaded
/// through handlers (`connector-init`'s `Proxy` structs) over module-level
/// statics.
pub struct ServerContext<K: KeySource> {
    pub pool: sqlx::PgPool,
    pub hubs: Arc<hub_registry::HubRegistry>,
    pub flow_top: Arc<Mutex<hub_registry::FlowTop>>,
    pub token_authority: TokenAuthority<K>,
    pub token_public_key: [u8; 32],
    pub token_key_id: String,
    pub account_materializer: materializer::AccountMaterializer,
    pub label_link_materializer: materializer::LabelLinkMaterializer,
    pub register_token: String,
    pub tls_cert: Vec<u8>,
    pub tls_key: Vec<u8>,
}

impl<K: KeySource> ServerContext<K> {
    pub fn public_key(&self) -> &[u8; 32] {
        &self.token_public_key
    }
}
