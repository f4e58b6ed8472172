use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::traits::{InsertDraftResult, PaymentGatewayError},
    db_types::{DraftOrder, NewDraftOrder, OrderLinkage, TransactionId, TransactionStatus},
};

/// Inserts the draft order into the database, returning the existing row instead if a draft already exists for
/// the transaction id.
pub async fn idempotent_insert(
    draft: NewDraftOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertDraftResult, PaymentGatewayError> {
    let result = match fetch_draft_by_transaction_id(&draft.transaction_id, conn).await? {
        Some(existing) => InsertDraftResult::AlreadyExists(existing),
        None => {
            let draft = insert_draft(draft, conn).await?;
            debug!("🗃️ Draft order for transaction [{}] inserted with id {}", draft.transaction_id, draft.id);
            InsertDraftResult::Inserted(draft)
        },
    };
    Ok(result)
}

/// Inserts a new draft order using the given connection. This is not atomic. You can embed this call inside a
/// transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_draft(draft: NewDraftOrder, conn: &mut SqliteConnection) -> Result<DraftOrder, PaymentGatewayError> {
    let cart_items = serde_json::to_string(&draft.cart_items)?;
    let shipping = draft.shipping.as_ref().map(serde_json::to_string).transpose()?;
    let applied_coupons = match draft.applied_coupons.is_empty() {
        true => None,
        false => Some(serde_json::to_string(&draft.applied_coupons)?),
    };
    let draft = sqlx::query_as(
        r#"
            INSERT INTO draft_orders (
                transaction_id,
                transaction_status,
                currency,
                total,
                customer_email,
                cart_items,
                cart_identifier,
                shipping,
                applied_coupons,
                redirect_url
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(draft.transaction_id)
    .bind(TransactionStatus::NotStarted)
    .bind(draft.currency)
    .bind(draft.total)
    .bind(draft.customer_email)
    .bind(cart_items)
    .bind(draft.cart_identifier)
    .bind(shipping)
    .bind(applied_coupons)
    .bind(draft.redirect_url)
    .fetch_one(conn)
    .await?;
    Ok(draft)
}

pub async fn fetch_draft_by_transaction_id(
    transaction_id: &TransactionId,
    conn: &mut SqliteConnection,
) -> Result<Option<DraftOrder>, sqlx::Error> {
    let draft = sqlx::query_as("SELECT * FROM draft_orders WHERE transaction_id = $1")
        .bind(transaction_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(draft)
}

/// Returns the most recent draft for the cart identifier that has not started processing yet. Such a draft can
/// be resumed: its hosted payment page is still waiting for the customer.
pub async fn fetch_resumable_draft(
    cart_identifier: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<DraftOrder>, sqlx::Error> {
    let draft = sqlx::query_as(
        r#"
            SELECT * FROM draft_orders
            WHERE cart_identifier = $1 AND transaction_status = $2
            ORDER BY id DESC LIMIT 1
        "#,
    )
    .bind(cart_identifier)
    .bind(TransactionStatus::NotStarted)
    .fetch_optional(conn)
    .await?;
    Ok(draft)
}

/// Sets the transaction status of a draft, optionally writing the order linkage in the same statement. This is
/// the unconditional form used by the checkout flows; the reconciler uses [`transition_draft`] instead.
pub async fn update_draft_status(
    transaction_id: &TransactionId,
    status: TransactionStatus,
    linkage: Option<&OrderLinkage>,
    conn: &mut SqliteConnection,
) -> Result<Option<DraftOrder>, sqlx::Error> {
    let draft = match linkage {
        Some(linkage) => {
            sqlx::query_as(
                r#"
                    UPDATE draft_orders
                    SET transaction_status = $1, order_id = $2, order_key = $3, updated_at = CURRENT_TIMESTAMP
                    WHERE transaction_id = $4
                    RETURNING *;
                "#,
            )
            .bind(status)
            .bind(linkage.order_id)
            .bind(linkage.order_key.as_str())
            .bind(transaction_id.as_str())
            .fetch_optional(conn)
            .await?
        },
        None => {
            sqlx::query_as(
                r#"
                    UPDATE draft_orders
                    SET transaction_status = $1, updated_at = CURRENT_TIMESTAMP
                    WHERE transaction_id = $2
                    RETURNING *;
                "#,
            )
            .bind(status)
            .bind(transaction_id.as_str())
            .fetch_optional(conn)
            .await?
        },
    };
    Ok(draft)
}

/// Conditionally moves a draft from one of `from` to `to`, optionally writing the order linkage. Returns `None`
/// if the draft is not currently in any of the `from` states, which is how a losing writer in a webhook race
/// finds out it lost.
pub async fn transition_draft(
    transaction_id: &TransactionId,
    from: &[TransactionStatus],
    to: TransactionStatus,
    linkage: Option<&OrderLinkage>,
    conn: &mut SqliteConnection,
) -> Result<Option<DraftOrder>, sqlx::Error> {
    // Status sets are tiny (at most three entries), so the IN list is built with fixed placeholders.
    let mut from_states = [None, None, None];
    for (slot, status) in from_states.iter_mut().zip(from.iter()) {
        *slot = Some(*status);
    }
    let draft = match linkage {
        Some(linkage) => {
            sqlx::query_as(
                r#"
                    UPDATE draft_orders
                    SET transaction_status = $1, order_id = $2, order_key = $3, updated_at = CURRENT_TIMESTAMP
                    WHERE transaction_id = $4 AND transaction_status IN ($5, $6, $7)
                    RETURNING *;
                "#,
            )
            .bind(to)
            .bind(linkage.order_id)
            .bind(linkage.order_key.as_str())
            .bind(transaction_id.as_str())
            .bind(from_states[0])
            .bind(from_states[1])
            .bind(from_states[2])
            .fetch_optional(conn)
            .await?
        },
        None => {
            sqlx::query_as(
                r#"
                    UPDATE draft_orders
                    SET transaction_status = $1, updated_at = CURRENT_TIMESTAMP
                    WHERE transaction_id = $2 AND transaction_status IN ($3, $4, $5)
                    RETURNING *;
                "#,
            )
            .bind(to)
            .bind(transaction_id.as_str())
            .bind(from_states[0])
            .bind(from_states[1])
            .bind(from_states[2])
            .fetch_optional(conn)
            .await?
        },
    };
    Ok(draft)
}
