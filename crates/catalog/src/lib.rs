//! The catalog store (C1): accounts, services, hubs, and label links, with
//! the keyset-paginated scans used by the routing materializer. Grounded on
//! the teacher's `agent-sql` crate: plain `sqlx::query!`/`query_as!`
//! functions taking an executor, no ORM layer, `Id` bound directly in
//! queries via its custom `sqlx::Type` impl.

mod error;
mod hubs;
mod label_links;
mod management_clients;
mod pagination;
mod services;

pub use error::CatalogError;
pub use hubs::{list_all_hubs, upsert_hub, HubRow};
pub use label_links::{delete_label_link, for_each_label_link, insert_label_link, LabelLinkRow};
pub use management_clients::{
    find_management_client_prefix_collision, insert_management_client, ManagementClientRow,
};
pub use pagination::PAGE_SIZE;
pub use services::{
    delete_service_by_service_id, for_each_service_in_account, insert_service, ServiceRow,
};

use models::Id;

/// Upserts an account row, creating it if absent or updating its namespace
/// if present. Conflict target is the primary key, matching the teacher's
/// `ON CONFLICT (id) DO UPDATE SET ... = EXCLUDED. ...` idiom.
pub async fn upsert_account(
    pool: &sqlx::PgPool,
    id: Id,
    namespace: &str,
) -> Result<(), CatalogError> {
    sqlx::query!(
        r#"
        insert into accounts (id, namespace)
        values ($1, $2)
        on conflict (id) do update set namespace = excluded.namespace, updated_at = now()
        "#,
        id as Id,
        namespace,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Looks up an account's namespace by id, used by mutations whose request
/// shape carries no namespace of its own (e.g. `RemoveLabelLink`) so the
/// caller's token can still be namespace-checked against it.
pub async fn account_namespace(pool: &sqlx::PgPool, id: Id) -> Result<Option<String>, CatalogError> {
    let row = sqlx::query!("select namespace from accounts where id = $1", id as Id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.namespace))
}
