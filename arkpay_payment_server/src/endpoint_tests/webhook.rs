use actix_web::{
    http::StatusCode,
    web::{self, ServiceConfig},
};
use apg_common::{signature::sign_request, MinorUnits, Secret};
use arkpay_payment_engine::{
    db_types::{CartLine, NewDraftOrder, OrderStatus, TransactionId, TransactionStatus},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    DraftOrderManagement,
    OrderManagement,
    ReconcileApi,
    SqliteDatabase,
};

use crate::{
    data_objects::JsonResponse,
    endpoint_tests::helpers::post_request,
    middleware::{SignatureMiddlewareFactory, SIGNATURE_HEADER},
    routes::ArkpayWebhookRoute,
};

// The full public URL ArkPay has on record for this merchant. Signatures are computed over this,
// not over the path the request arrives on.
const WEBHOOK_URL: &str = "https://shop.example.com/api/arkpay/webhook";
const SECRET_KEY: &str = "webhook-test-secret";

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

async fn seed_draft(db: &SqliteDatabase, transaction_id: &str) {
    let draft = NewDraftOrder::new(
        TransactionId::from(transaction_id),
        "USD".to_string(),
        MinorUnits::from(4_200),
        vec![CartLine { product_id: 31, variation_id: 0, quantity: 1 }],
    );
    db.insert_draft_order(draft).await.expect("Error saving draft order");
}

fn event_body(transaction_id: &str, status: &str) -> String {
    serde_json::json!({
        "id": transaction_id,
        "merchantTransactionId": "18a9c3f20d4e1",
        "status": status,
        "email": "customer@example.com",
    })
    .to_string()
}

fn webhook_app(db: &SqliteDatabase, signature_checks: bool) -> impl FnOnce(&mut ServiceConfig) {
    let api = ReconcileApi::new(db.clone(), EventProducers::default());
    move |cfg: &mut ServiceConfig| {
        let scope = web::scope("/api/arkpay")
            .wrap(SignatureMiddlewareFactory::new(
                SIGNATURE_HEADER,
                Secret::new(SECRET_KEY.to_string()),
                WEBHOOK_URL,
                signature_checks,
            ))
            .service(ArkpayWebhookRoute::<SqliteDatabase>::new());
        cfg.app_data(web::Data::new(api)).service(scope);
    }
}

#[actix_web::test]
async fn bad_signature_is_rejected_before_anything_happens() -> anyhow::Result<()> {
    let db = new_db().await;
    seed_draft(&db, "tx-sig-1").await;
    let body = event_body("tx-sig-1", "PROCESSING");
    let forged = sign_request("POST", WEBHOOK_URL, body.as_bytes(), "not-the-secret");
    let (status, res) =
        post_request("/api/arkpay/webhook", body, &[(SIGNATURE_HEADER, forged)], webhook_app(&db, true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(res, r#"{"code":401,"message":"Signature mismatch."}"#);
    // The event must not have reached the reconciler.
    let draft = db.fetch_draft_order_by_transaction_id(&TransactionId::from("tx-sig-1")).await?.unwrap();
    assert_eq!(draft.transaction_status, TransactionStatus::NotStarted);
    assert!(draft.linkage().is_none());
    Ok(())
}

#[actix_web::test]
async fn missing_signature_header_is_rejected() -> anyhow::Result<()> {
    let db = new_db().await;
    seed_draft(&db, "tx-sig-2").await;
    let body = event_body("tx-sig-2", "PROCESSING");
    let (status, res) = post_request("/api/arkpay/webhook", body, &[], webhook_app(&db, true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(res, r#"{"code":401,"message":"Signature mismatch."}"#);
    Ok(())
}

#[actix_web::test]
async fn authentic_events_drive_the_order_lifecycle() -> anyhow::Result<()> {
    let db = new_db().await;
    seed_draft(&db, "tx-sig-3").await;

    let body = event_body("tx-sig-3", "PROCESSING");
    let signature = sign_request("POST", WEBHOOK_URL, body.as_bytes(), SECRET_KEY);
    let (status, res) =
        post_request("/api/arkpay/webhook", body, &[(SIGNATURE_HEADER, signature)], webhook_app(&db, true)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&res)?;
    assert!(response.success);
    assert_eq!(response.message, "Order created.");

    let draft = db.fetch_draft_order_by_transaction_id(&TransactionId::from("tx-sig-3")).await?.unwrap();
    assert_eq!(draft.transaction_status, TransactionStatus::Processing);
    let linkage = draft.linkage().expect("draft should be linked to an order");
    let order = db.fetch_order_by_id(linkage.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, MinorUnits::from(4_200));
    assert_eq!(order.customer_email.as_deref(), Some("customer@example.com"));

    let body = event_body("tx-sig-3", "COMPLETED");
    let signature = sign_request("POST", WEBHOOK_URL, body.as_bytes(), SECRET_KEY);
    let (status, res) =
        post_request("/api/arkpay/webhook", body, &[(SIGNATURE_HEADER, signature)], webhook_app(&db, true)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&res)?;
    assert_eq!(response.message, "Order settled.");
    let order = db.fetch_order_by_id(linkage.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    Ok(())
}

#[actix_web::test]
async fn signature_checks_can_be_disabled() -> anyhow::Result<()> {
    let db = new_db().await;
    seed_draft(&db, "tx-sig-4").await;
    let body = event_body("tx-sig-4", "PROCESSING");
    let (status, _) = post_request("/api/arkpay/webhook", body, &[], webhook_app(&db, false)).await;
    assert_eq!(status, StatusCode::OK);
    let draft = db.fetch_draft_order_by_transaction_id(&TransactionId::from("tx-sig-4")).await?.unwrap();
    assert_eq!(draft.transaction_status, TransactionStatus::Processing);
    Ok(())
}

#[actix_web::test]
async fn correctly_signed_garbage_is_still_a_bad_request() -> anyhow::Result<()> {
    let db = new_db().await;
    seed_draft(&db, "tx-sig-5").await;
    // An authentic sender, but a payload with a field the event schema does not know.
    let body = r#"{"id":"tx-sig-5","merchantTransactionId":"18a9c3f20d4e1","status":"PROCESSING","amount":100}"#
        .to_string();
    let signature = sign_request("POST", WEBHOOK_URL, body.as_bytes(), SECRET_KEY);
    let (status, _) =
        post_request("/api/arkpay/webhook", body, &[(SIGNATURE_HEADER, signature)], webhook_app(&db, true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let draft = db.fetch_draft_order_by_transaction_id(&TransactionId::from("tx-sig-5")).await?.unwrap();
    assert_eq!(draft.transaction_status, TransactionStatus::NotStarted);
    Ok(())
}

#[actix_web::test]
async fn unknown_events_are_acknowledged() -> anyhow::Result<()> {
    let db = new_db().await;
    // No draft, no order. The webhook still answers 200 so the processor does not retry forever.
    let body = event_body("tx-nobody-knows", "PROCESSING");
    let signature = sign_request("POST", WEBHOOK_URL, body.as_bytes(), SECRET_KEY);
    let (status, res) =
        post_request("/api/arkpay/webhook", body, &[(SIGNATURE_HEADER, signature)], webhook_app(&db, true)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&res)?;
    assert!(response.success);
    assert_eq!(response.message, "Event acknowledged.");
    Ok(())
}
