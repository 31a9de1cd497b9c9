use crate::pagination::{is_last_page, PAGE_SIZE};
use crate::CatalogError;
use models::Id;
use tokio_util::sync::CancellationToken;

/// ServiceRow is a single row of the `services` table.
#[derive(Clone, Debug)]
pub struct ServiceRow {
    pub id: i64,
    pub service_id: Id,
    pub hub_id: Id,
    pub account_id: Id,
    pub r#type: String,
    pub labels: Vec<String>,
}

pub async fn insert_service(
    pool: &sqlx::PgPool,
    account_id: Id,
    hub_id: Id,
    service_id: Id,
    r#type: &str,
    labels: &[String],
) -> Result<(), CatalogError> {
    sqlx::query!(
        r#"
        insert into services (service_id, hub_id, account_id, type, labels)
        values ($1, $2, $3, $4, $5)
        "#,
        service_id as Id,
        hub_id as Id,
        account_id as Id,
        r#type,
        labels,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_service_by_service_id(
    pool: &sqlx::PgPool,
    service_id: Id,
) -> Result<(), CatalogError> {
    sqlx::query!(
        "delete from services where service_id = $1",
        service_id as Id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn fetch_page(
    pool: &sqlx::PgPool,
    account_id: Id,
    after_id: i64,
) -> Result<Vec<ServiceRow>, CatalogError> {
    let rows = sqlx::query!(
        r#"
        select id, service_id as "service_id: Id", hub_id as "hub_id: Id",
               account_id as "account_id: Id", type, labels
        from services
        where account_id = $1 and id > $2
        order by id asc
        limit $3
        "#,
        account_id as Id,
        after_id,
        PAGE_SIZE,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ServiceRow {
            id: r.id,
            service_id: r.service_id,
            hub_id: r.hub_id,
            account_id: r.account_id,
            r#type: r.r#type,
            labels: r.labels,
        })
        .collect())
}

/// Walks every service row for `account_id` in ascending internal-id order,
/// invoking `visit` once per row. Polls `cancel` between pages because the
/// database driver does not propagate cancellation into blocking I/O (per
/// §4.1). A "no rows" page is the normal termination signal, not an error.
pub async fn for_each_service_in_account(
    pool: &sqlx::PgPool,
    account_id: Id,
    cancel: &CancellationToken,
    mut visit: impl FnMut(ServiceRow),
) -> Result<(), CatalogError> {
    let mut after_id = 0i64;
    loop {
        if cancel.is_cancelled() {
            return Err(CatalogError::Canceled);
        }

        let page = fetch_page(pool, account_id, after_id).await?;
        let done = is_last_page(page.len());

        for row in &page {
            after_id = row.id;
            visit(row.clone());
        }

        if done {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_database_url() -> Option<String> {
        std::env::var("DATABASE_URL").ok()
    }

    #[tokio::test]
    async fn pagination_walks_one_accounts_services_in_order() {
        let Some(url) = env_database_url() else {
            tracing::warn!("DATABASE_URL not set, skipping integration test");
            return;
        };
        let pool = sqlx::PgPool::connect(&url).await.unwrap();

        let account_a = Id::generate();
        let account_b = Id::generate();
        crate::upsert_account(&pool, account_a, "/a").await.unwrap();
        crate::upsert_account(&pool, account_b, "/b").await.unwrap();

        for _ in 0..5 {
            insert_service(
                &pool,
                account_a,
                Id::generate(),
                Id::generate(),
                "http",
                &["env=prod".to_string()],
            )
            .await
            .unwrap();
        }
        insert_service(
            &pool,
            account_b,
            Id::generate(),
            Id::generate(),
            "http",
            &[],
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        let mut seen = Vec::new();
        for_each_service_in_account(&pool, account_a, &cancel, |row| seen.push(row.id))
            .await
            .unwrap();

        assert_eq!(seen.len(), 5);
        let mut sorted = seen.clone();
        sorted.sort();
        assert_eq!(seen, sorted, "rows must arrive in ascending id order");
    }
}
