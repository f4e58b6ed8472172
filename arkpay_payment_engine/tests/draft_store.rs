use apg_common::MinorUnits;
use arkpay_payment_engine::{
    db_types::{
        CartLine,
        CouponSnapshot,
        NewDraftOrder,
        OrderLinkage,
        ShippingSnapshot,
        TransactionId,
        TransactionStatus,
    },
    DraftOrderManagement,
    PaymentGatewayError,
    SqliteDatabase,
};
use support::prepare_env::{prepare_test_env, random_db_path};

mod support;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn sample_draft(txid: &str) -> NewDraftOrder {
    let items = vec![
        CartLine { product_id: 11, variation_id: 0, quantity: 2 },
        CartLine { product_id: 42, variation_id: 7, quantity: 1 },
    ];
    let mut draft =
        NewDraftOrder::new(TransactionId::from(txid), "USD".to_string(), MinorUnits::from(12_500), items);
    draft.cart_identifier = Some(format!("cart-{txid}"));
    draft.customer_email = Some("customer@example.com".to_string());
    draft.shipping = Some(ShippingSnapshot {
        shipping_method_id: "flat_rate:1".to_string(),
        shipping_method_title: "Flat rate".to_string(),
        shipping_method_cost: MinorUnits::from(500),
    });
    draft.applied_coupons = vec![CouponSnapshot { code: "SAVE10".to_string(), amount: MinorUnits::from(1_000) }];
    draft.redirect_url = Some(format!("https://pay.arkpay.test/{txid}"));
    draft
}

#[tokio::test]
async fn draft_round_trips_with_snapshots() {
    let db = new_db().await;
    let draft = db.insert_draft_order(sample_draft("tx-round-trip")).await.expect("Error inserting draft");
    assert_eq!(draft.transaction_status, TransactionStatus::NotStarted);
    assert!(draft.linkage().is_none());

    let fetched = db
        .fetch_draft_order_by_transaction_id(&TransactionId::from("tx-round-trip"))
        .await
        .expect("Error fetching draft")
        .expect("Draft not found");
    assert_eq!(fetched.id, draft.id);
    assert_eq!(fetched.total, MinorUnits::from(12_500));
    let items = fetched.items().expect("Bad cart snapshot");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], CartLine { product_id: 11, variation_id: 0, quantity: 2 });
    let shipping = fetched.shipping_snapshot().expect("Bad shipping snapshot").expect("No shipping");
    assert_eq!(shipping.shipping_method_cost, MinorUnits::from(500));
    let coupons = fetched.coupons().expect("Bad coupon snapshot");
    assert_eq!(coupons[0].code, "SAVE10");
    db.close().await;
}

#[tokio::test]
async fn duplicate_transaction_id_is_reported() {
    let db = new_db().await;
    db.insert_draft_order(sample_draft("tx-dup")).await.expect("Error inserting draft");
    let err = db.insert_draft_order(sample_draft("tx-dup")).await.expect_err("Second insert must fail");
    assert!(matches!(err, PaymentGatewayError::DraftAlreadyExists(id) if id == TransactionId::from("tx-dup")));
    db.close().await;
}

#[tokio::test]
async fn resumable_redirect_only_while_not_started() {
    let db = new_db().await;
    let draft = db.insert_draft_order(sample_draft("tx-resume")).await.expect("Error inserting draft");
    let identifier = draft.cart_identifier.clone().expect("No cart identifier");

    let redirect = db.active_draft_redirect(&identifier).await.expect("Error querying redirect");
    assert_eq!(redirect.as_deref(), Some("https://pay.arkpay.test/tx-resume"));
    assert!(db.active_draft_redirect("some-other-cart").await.expect("Error querying redirect").is_none());

    db.update_draft_status(&draft.transaction_id, TransactionStatus::Cancelled, None)
        .await
        .expect("Error updating status");
    assert!(db.active_draft_redirect(&identifier).await.expect("Error querying redirect").is_none());
    db.close().await;
}

#[tokio::test]
async fn update_with_linkage_writes_both_fields() {
    let db = new_db().await;
    let draft = db.insert_draft_order(sample_draft("tx-linked")).await.expect("Error inserting draft");
    // The linkage target does not have to exist in the orders table for this low-level call.
    let linkage = OrderLinkage { order_id: 77, order_key: "apg_order_cafebabe".into() };
    let updated = db
        .update_draft_status(&draft.transaction_id, TransactionStatus::Processing, Some(linkage))
        .await
        .expect("Error updating status");
    assert_eq!(updated.transaction_status, TransactionStatus::Processing);
    let linkage = updated.linkage().expect("Linkage missing");
    assert_eq!(linkage.order_id, 77);
    assert_eq!(linkage.order_key.as_str(), "apg_order_cafebabe");
    db.close().await;
}

#[tokio::test]
async fn unknown_transaction_update_is_an_error() {
    let db = new_db().await;
    let err = db
        .update_draft_status(&TransactionId::from("tx-ghost"), TransactionStatus::Failed, None)
        .await
        .expect_err("Update of unknown draft must fail");
    assert!(matches!(err, PaymentGatewayError::DraftNotFound(_)));
    db.close().await;
}

#[tokio::test]
async fn schema_rejects_half_written_linkage() {
    let db = new_db().await;
    db.insert_draft_order(sample_draft("tx-check")).await.expect("Error inserting draft");
    let result = sqlx::query("UPDATE draft_orders SET order_id = 999 WHERE transaction_id = $1")
        .bind("tx-check")
        .execute(db.pool())
        .await;
    assert!(result.is_err(), "order_id must not be writable without order_key");
    let result = sqlx::query("UPDATE draft_orders SET order_key = 'apg_order_0' WHERE transaction_id = $1")
        .bind("tx-check")
        .execute(db.pool())
        .await;
    assert!(result.is_err(), "order_key must not be writable without order_id");
    db.close().await;
}
