use actix_web::{
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web::{self, ServiceConfig},
    App,
};
use apg_common::MinorUnits;
use arkpay_api::PayTransactionResponse;
use arkpay_payment_engine::{
    db_types::{
        CartLine,
        NewDraftOrder,
        NewStoreOrder,
        OrderKey,
        OrderLinkage,
        OrderStatus,
        TransactionId,
        TransactionStatus,
    },
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    DraftOrderManagement,
    OrderManagement,
    SqliteDatabase,
    StorefrontApi,
};

use crate::{
    checkout_routes::{InitiateCartPaymentRoute, PayOrderRoute},
    config::ServerOptions,
    data_objects::{CartPaymentResponse, OrderPaymentResponse},
    endpoint_tests::{
        helpers::{get_request, post_request},
        mocks::{created_transaction, MockProcessor},
    },
    routes::PaymentReturnRoute,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

/// Wires the checkout scope the way `create_server_instance` does, with the processor mocked out.
fn checkout_app(db: &SqliteDatabase, processor: web::Data<MockProcessor>) -> impl FnOnce(&mut ServiceConfig) {
    let api = StorefrontApi::new(db.clone());
    move |cfg: &mut ServiceConfig| {
        let scope = web::scope("/checkout")
            .service(InitiateCartPaymentRoute::<SqliteDatabase, MockProcessor>::new())
            .service(PayOrderRoute::<SqliteDatabase, MockProcessor>::new());
        cfg.app_data(web::Data::new(api)).app_data(processor).service(scope);
    }
}

fn return_app(db: &SqliteDatabase, order_received_url: &str) -> impl FnOnce(&mut ServiceConfig) {
    let api = StorefrontApi::new(db.clone());
    let options = ServerOptions { order_received_url: order_received_url.to_string() };
    move |cfg: &mut ServiceConfig| {
        let scope = web::scope("/checkout").service(PaymentReturnRoute::<SqliteDatabase>::new());
        cfg.app_data(web::Data::new(api)).app_data(web::Data::new(options)).service(scope);
    }
}

fn cart_request_body() -> String {
    serde_json::json!({
        "session_id": "sess-81f2",
        "cart_hash": "0b7e2f9915",
        "currency": "USD",
        "total": 12_500,
        "customer_email": "customer@example.com",
        "items": [
            {"product_id": 11, "variation_id": 0, "quantity": 2},
            {"product_id": 42, "variation_id": 7, "quantity": 1},
        ],
        "shipping": {
            "shipping_method_id": "flat_rate:1",
            "shipping_method_title": "Flat rate",
            "shipping_method_cost": 500,
        },
    })
    .to_string()
}

#[actix_web::test]
async fn unchanged_cart_resumes_instead_of_creating_a_second_transaction() -> anyhow::Result<()> {
    let db = new_db().await;
    let mut mock = MockProcessor::new();
    // times(1) is the point of this test. The second request must never reach the processor.
    mock.expect_create_transaction().times(1).returning(|req| {
        assert!(!req.handle_payment);
        Ok(created_transaction("tx-cart-1", &req.merchant_transaction_id, Some("https://pay.arkpay.test/tx-cart-1")))
    });
    let processor = web::Data::new(mock);

    let (status, res) =
        post_request("/checkout/cart/pay", cart_request_body(), &[], checkout_app(&db, processor.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let first: CartPaymentResponse = serde_json::from_str(&res)?;
    assert!(!first.resumed);
    assert_eq!(first.redirect_url, "https://pay.arkpay.test/tx-cart-1");

    let (status, res) =
        post_request("/checkout/cart/pay", cart_request_body(), &[], checkout_app(&db, processor.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let second: CartPaymentResponse = serde_json::from_str(&res)?;
    assert!(second.resumed);
    assert_eq!(second.redirect_url, first.redirect_url);

    // The draft carries the snapshots the webhook will later materialize the order from.
    let draft = db.fetch_draft_order_by_transaction_id(&TransactionId::from("tx-cart-1")).await?.unwrap();
    assert_eq!(draft.total, MinorUnits::from(12_500));
    assert_eq!(draft.customer_email.as_deref(), Some("customer@example.com"));
    assert_eq!(draft.items()?.len(), 2);
    assert_eq!(draft.shipping_snapshot()?.unwrap().shipping_method_cost, MinorUnits::from(500));
    Ok(())
}

#[actix_web::test]
async fn processor_without_a_payment_page_is_a_bad_gateway() -> anyhow::Result<()> {
    let db = new_db().await;
    let mut mock = MockProcessor::new();
    mock.expect_create_transaction()
        .times(1)
        .returning(|req| Ok(created_transaction("tx-cart-2", &req.merchant_transaction_id, None)));
    let processor = web::Data::new(mock);
    let (status, _) =
        post_request("/checkout/cart/pay", cart_request_body(), &[], checkout_app(&db, processor)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    // Nothing to resume either. The draft is only saved once a payment page exists.
    assert!(db.fetch_draft_order_by_transaction_id(&TransactionId::from("tx-cart-2")).await?.is_none());
    Ok(())
}

fn order_payment_body(order_key: &str) -> String {
    serde_json::json!({
        "order_key": order_key,
        "card": {
            "number": "4242 4242 4242 4242",
            "expiration_date": "12/30",
            "cvc": "123",
            "holder_name": "J Doe",
            "email": "jdoe@example.com",
        },
        "ip_address": "203.0.113.7",
        "return_url": "https://shop.example.com/checkout/return",
    })
    .to_string()
}

#[actix_web::test]
async fn direct_payment_records_the_merchant_id_the_processor_accepted() -> anyhow::Result<()> {
    let db = new_db().await;
    let order = db
        .insert_order(NewStoreOrder::pending(OrderKey::from("apg_order_direct77"), "USD".to_string(), MinorUnits::from(9_900)))
        .await?;

    let mut mock = MockProcessor::new();
    // The processor rejected the bare order key as a duplicate, so the client comes back with a
    // suffix-qualified id. The history entry must be keyed under that id, not the bare key.
    mock.expect_create_transaction()
        .withf(|req| req.merchant_transaction_id == "apg_order_direct77" && req.handle_payment)
        .times(1)
        .returning(|_| Ok(created_transaction("tx-pay-77", "apg_order_direct77__1a2b3c", None)));
    mock.expect_pay_transaction()
        .withf(|id, req| {
            id == "tx-pay-77" && req.card_number == "4242424242424242" && req.ip_address == "203.0.113.7"
        })
        .times(1)
        .returning(|_, _| {
            Ok(PayTransactionResponse {
                status: "PROCESSING".to_string(),
                message: None,
                redirect_url: Some("https://acs.bank.test/challenge".to_string()),
            })
        });
    let processor = web::Data::new(mock);

    let (status, res) = post_request(
        "/checkout/order/pay",
        order_payment_body("apg_order_direct77"),
        &[],
        checkout_app(&db, processor),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: OrderPaymentResponse = serde_json::from_str(&res)?;
    assert_eq!(response.status, "PROCESSING");
    assert_eq!(response.redirect_url.as_deref(), Some("https://acs.bank.test/challenge"));

    let history = db.transaction_history(order.id).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].meta_key, "apg_order_direct77__1a2b3c");
    assert_eq!(history[0].transaction_id, TransactionId::from("tx-pay-77"));
    assert_eq!(history[0].status, TransactionStatus::NotStarted);
    Ok(())
}

#[actix_web::test]
async fn a_paid_order_cannot_be_paid_again() -> anyhow::Result<()> {
    let db = new_db().await;
    let order = NewStoreOrder {
        order_key: OrderKey::from("apg_order_paid1"),
        status: OrderStatus::Paid,
        currency: "USD".to_string(),
        total: MinorUnits::from(5_000),
        customer_email: None,
        shipping: None,
        items: Vec::new(),
        coupons: Vec::new(),
    };
    db.insert_order(order).await?;

    let mut mock = MockProcessor::new();
    mock.expect_create_transaction().never();
    mock.expect_pay_transaction().never();
    let processor = web::Data::new(mock);

    let (status, res) =
        post_request("/checkout/order/pay", order_payment_body("apg_order_paid1"), &[], checkout_app(&db, processor))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("already been paid"));
    Ok(())
}

#[actix_web::test]
async fn paying_an_unknown_order_is_not_found() -> anyhow::Result<()> {
    let db = new_db().await;
    let mut mock = MockProcessor::new();
    mock.expect_create_transaction().never();
    let processor = web::Data::new(mock);
    let (status, _) =
        post_request("/checkout/order/pay", order_payment_body("apg_order_ghost"), &[], checkout_app(&db, processor))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[actix_web::test]
async fn payment_page_return_redirects_to_the_order_received_page() -> anyhow::Result<()> {
    let db = new_db().await;
    let draft = NewDraftOrder::new(
        TransactionId::from("tx-ret-1"),
        "USD".to_string(),
        MinorUnits::from(2_000),
        vec![CartLine { product_id: 5, variation_id: 0, quantity: 1 }],
    );
    db.insert_draft_order(draft).await?;
    let linkage = OrderLinkage { order_id: 41, order_key: OrderKey::from("apg_order_ret41") };
    db.update_draft_status(&TransactionId::from("tx-ret-1"), TransactionStatus::Processing, Some(linkage)).await?;

    // Built inline rather than through the helper so the Location header can be inspected.
    let app = test::init_service(
        App::new().configure(return_app(&db, "https://shop.example.com/checkout/order-received/")),
    )
    .await;
    let req = TestRequest::get().uri("/checkout/return?arkpayTransactionId=tx-ret-1&success=true").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let location = res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap();
    assert_eq!(location, "https://shop.example.com/checkout/order-received/41/?key=apg_order_ret41");
    Ok(())
}

#[actix_web::test]
async fn payment_page_return_without_an_order_is_not_found() -> anyhow::Result<()> {
    let db = new_db().await;
    // Unknown transaction.
    let (status, _) = get_request(
        "/checkout/return?arkpayTransactionId=tx-ret-ghost",
        return_app(&db, "https://shop.example.com/checkout/order-received"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Known transaction whose webhook has not landed yet, so no order is linked.
    let draft = NewDraftOrder::new(
        TransactionId::from("tx-ret-2"),
        "USD".to_string(),
        MinorUnits::from(2_000),
        vec![CartLine { product_id: 5, variation_id: 0, quantity: 1 }],
    );
    db.insert_draft_order(draft).await?;
    let (status, res) = get_request(
        "/checkout/return?arkpayTransactionId=tx-ret-2",
        return_app(&db, "https://shop.example.com/checkout/order-received"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(res.contains("has no order yet"));
    Ok(())
}
