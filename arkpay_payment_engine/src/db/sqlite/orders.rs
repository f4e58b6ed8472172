use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::traits::PaymentGatewayError,
    db_types::{NewStoreOrder, OrderCoupon, OrderItem, OrderKey, OrderStatus, StoreOrder},
};

/// Inserts a new store order, including its line items and coupons, using the given connection. This is not
/// atomic. You can embed this call inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as
/// the connection argument.
pub async fn insert_order(order: NewStoreOrder, conn: &mut SqliteConnection) -> Result<StoreOrder, PaymentGatewayError> {
    let (method_id, method_title, method_cost) = match &order.shipping {
        Some(s) => (Some(s.shipping_method_id.clone()), Some(s.shipping_method_title.clone()), Some(s.shipping_method_cost)),
        None => (None, None, None),
    };
    let inserted: StoreOrder = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_key,
                status,
                currency,
                total,
                customer_email,
                shipping_method_id,
                shipping_method_title,
                shipping_method_cost
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order.order_key)
    .bind(order.status)
    .bind(order.currency)
    .bind(order.total)
    .bind(order.customer_email)
    .bind(method_id)
    .bind(method_title)
    .bind(method_cost)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, variation_id, quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(inserted.id)
        .bind(item.product_id)
        .bind(item.variation_id)
        .bind(i64::from(item.quantity))
        .execute(&mut *conn)
        .await?;
    }
    for coupon in &order.coupons {
        sqlx::query("INSERT INTO order_coupons (order_id, code, amount) VALUES ($1, $2, $3)")
            .bind(inserted.id)
            .bind(coupon.code.as_str())
            .bind(coupon.amount)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🗃️ Order [{}] inserted with id {}", inserted.order_key, inserted.id);
    Ok(inserted)
}

pub async fn fetch_order_by_key(
    order_key: &OrderKey,
    conn: &mut SqliteConnection,
) -> Result<Option<StoreOrder>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_key = $1")
        .bind(order_key.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<StoreOrder>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_order_coupons(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderCoupon>, sqlx::Error> {
    let coupons = sqlx::query_as("SELECT * FROM order_coupons WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(coupons)
}

/// Conditionally moves an order to `to`. An order that is already `paid`, or already in the target status, is
/// left untouched and `None` is returned. `paid` is sticky: a settled payment is never demoted by a late
/// failure or cancellation event.
pub async fn transition_order(
    order_id: i64,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<StoreOrder>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status <> $1 AND status <> $3
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(order_id)
    .bind(OrderStatus::Paid)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
