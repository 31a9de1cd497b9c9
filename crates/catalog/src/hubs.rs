use crate::CatalogError;
use models::Id;

#[derive(Clone, Debug)]
pub struct HubRow {
    pub id: Id,
    pub connection_info: Vec<u8>,
    pub last_checkin: chrono::DateTime<chrono::Utc>,
}

/// Upserts a hub row, bumping `last_checkin` on every reconnection (§3:
/// "last_checkin monotonically updated on each reconnection").
pub async fn upsert_hub(
    pool: &sqlx::PgPool,
    id: Id,
    connection_info: &[u8],
) -> Result<(), CatalogError> {
    sqlx::query!(
        r#"
        insert into hubs (id, connection_info, last_checkin)
        values ($1, $2, now())
        on conflict (id) do update set
            connection_info = excluded.connection_info,
            last_checkin = excluded.last_checkin
        "#,
        id as Id,
        connection_info,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Hubs are not paginated at the API surface (§4.6 `AllHubs`): the set of
/// hubs is small and bounded by fleet size, unlike services or label links.
pub async fn list_all_hubs(pool: &sqlx::PgPool) -> Result<Vec<HubRow>, CatalogError> {
    let rows = sqlx::query!(r#"select id as "id: Id", connection_info, last_checkin from hubs"#)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| HubRow {
            id: r.id,
            connection_info: r.connection_info,
            last_checkin: r.last_checkin,
        })
        .collect())
}
