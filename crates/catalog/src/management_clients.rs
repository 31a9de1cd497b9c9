use crate::CatalogError;
use models::Id;

#[derive(Clone, Debug)]
pub struct ManagementClientRow {
    pub id: Id,
    pub namespace: String,
}

/// Returns the first existing management client whose namespace shares a
/// prefix with `namespace`, if any (a prefix-LIKE query per §3), checked in
/// both directions: an existing client registered under `/acme` collides
/// with a new registration of `/acme/team`, and vice versa. `Register`
/// rejects the new registration when this returns `Some`.
pub async fn find_management_client_prefix_collision(
    pool: &sqlx::PgPool,
    namespace: &str,
) -> Result<Option<ManagementClientRow>, CatalogError> {
    let row = sqlx::query!(
        r#"
        select id as "id: Id", namespace from management_clients
        where namespace like $1 || '%' or $1 like namespace || '%'
        limit 1
        "#,
        namespace,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| ManagementClientRow {
        id: r.id,
        namespace: r.namespace,
    }))
}

pub async fn insert_management_client(
    pool: &sqlx::PgPool,
    id: Id,
    namespace: &str,
) -> Result<(), CatalogError> {
    sqlx::query!(
        "insert into management_clients (id, namespace) values ($1, $2)",
        id as Id,
        namespace,
    )
    .execute(pool)
    .await?;
    Ok(())
}
