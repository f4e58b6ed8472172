use sqlx::SqliteConnection;

use crate::db_types::{TransactionId, TransactionMetaEntry, TransactionStatus};

/// Appends a new payment attempt entry to an order's transaction history.
pub async fn append_entry(
    order_id: i64,
    meta_key: &str,
    transaction_id: &TransactionId,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<TransactionMetaEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO order_transaction_meta (order_id, meta_key, transaction_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(meta_key)
    .bind(transaction_id.as_str())
    .bind(status)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

/// Sets the status of the most recent history entry for the order, or appends a fresh entry if the order has no
/// history yet. Processor status updates always land on the latest attempt; earlier attempts keep the status
/// they ended with.
pub async fn upsert_last_status(
    order_id: i64,
    meta_key: &str,
    transaction_id: &TransactionId,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<TransactionMetaEntry, sqlx::Error> {
    let updated: Option<TransactionMetaEntry> = sqlx::query_as(
        r#"
            UPDATE order_transaction_meta
            SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = (SELECT MAX(id) FROM order_transaction_meta WHERE order_id = $2)
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(entry) => Ok(entry),
        None => append_entry(order_id, meta_key, transaction_id, status, conn).await,
    }
}

/// Fetches the full transaction history for an order, oldest first.
pub async fn fetch_history(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<TransactionMetaEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM order_transaction_meta WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
