use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use arkpay_api::ArkPayApi;
use arkpay_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    ReconcileApi,
    SqliteDatabase,
    StorefrontApi,
};
use log::*;

use crate::{
    checkout_routes::{InitiateCartPaymentRoute, PayOrderRoute},
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::{SignatureMiddlewareFactory, SIGNATURE_HEADER},
    routes::{health, ArkpayWebhookRoute, PaymentReturnRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(128, default_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default event hooks only log. Anything that should happen when an order settles (a confirmation email,
/// a fulfilment call) hangs off these.
pub fn default_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev: OrderPaidEvent| {
        Box::pin(async move {
            info!("📬️ Order [{}] has been paid ({} {}).", ev.order.order_key, ev.order.total, ev.order.currency);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_annulled(|ev: OrderAnnulledEvent| {
        Box::pin(async move {
            info!("📬️ Order [{}] was annulled ({}).", ev.order.order_key, ev.status);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<actix_web::dev::Server, ServerError> {
    let client = ArkPayApi::new(config.arkpay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let options = ServerOptions::from_config(&config);
    let webhook_secret = config.webhook_secret();
    let webhook_url = config.webhook_url.clone();
    let signature_checks = config.signature_checks;
    let shutdown_timeout = config.shutdown_timeout.num_seconds().max(0) as u64;
    let srv = HttpServer::new(move || {
        let reconcile_api = ReconcileApi::new(db.clone(), producers.clone());
        let storefront_api = StorefrontApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("apg::access_log"))
            .app_data(web::Data::new(reconcile_api))
            .app_data(web::Data::new(storefront_api))
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(options.clone()));
        let webhook_scope = web::scope("/api/arkpay")
            .wrap(SignatureMiddlewareFactory::new(
                SIGNATURE_HEADER,
                webhook_secret.clone(),
                &webhook_url,
                signature_checks,
            ))
            .service(ArkpayWebhookRoute::<SqliteDatabase>::new());
        let checkout_scope = web::scope("/checkout")
            .service(InitiateCartPaymentRoute::<SqliteDatabase, ArkPayApi>::new())
            .service(PayOrderRoute::<SqliteDatabase, ArkPayApi>::new())
            .service(PaymentReturnRoute::<SqliteDatabase>::new());
        app.service(health).service(webhook_scope).service(checkout_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .shutdown_timeout(shutdown_timeout)
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
