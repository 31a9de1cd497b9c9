use crate::pagination::{is_last_page, PAGE_SIZE};
use crate::CatalogError;
use models::Id;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct LabelLinkRow {
    pub id: i64,
    pub account_id: Id,
    pub labels: String,
    pub target: String,
}

pub async fn insert_label_link(
    pool: &sqlx::PgPool,
    account_id: Id,
    labels: &str,
    target: &str,
) -> Result<(), CatalogError> {
    sqlx::query!(
        "insert into label_links (account_id, labels, target) values ($1, $2, $3)",
        account_id as Id,
        labels,
        target,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_label_link(
    pool: &sqlx::PgPool,
    account_id: Id,
    labels: &str,
) -> Result<(), CatalogError> {
    sqlx::query!(
        "delete from label_links where account_id = $1 and labels = $2",
        account_id as Id,
        labels,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn fetch_page(pool: &sqlx::PgPool, after_id: i64) -> Result<Vec<LabelLinkRow>, CatalogError> {
    let rows = sqlx::query!(
        r#"
        select id, account_id as "account_id: Id", labels, target
        from label_links
        where id > $1
        order by id asc
        limit $2
        "#,
        after_id,
        PAGE_SIZE,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| LabelLinkRow {
            id: r.id,
            account_id: r.account_id,
            labels: r.labels,
            target: r.target,
        })
        .collect())
}

/// Walks every label-link row in ascending internal-id order across *all*
/// accounts: label links materialize to a single global blob (§4.4), so
/// this scan is unscoped, unlike the per-account services scan.
pub async fn for_each_label_link(
    pool: &sqlx::PgPool,
    cancel: &CancellationToken,
    mut visit: impl FnMut(LabelLinkRow),
) -> Result<(), CatalogError> {
    let mut after_id = 0i64;
    loop {
        if cancel.is_cancelled() {
            return Err(CatalogError::Canceled);
        }

        let page = fetch_page(pool, after_id).await?;
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
