//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use arkpay_payment_engine::{
    db_types::{TransactionEvent, TransactionId},
    PaymentGatewayDatabase,
    ReconcileApi,
    ReconcileOutcome,
    StorefrontApi,
};
use log::*;

use crate::{config::ServerOptions, data_objects::{JsonResponse, ReturnParams}, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(arkpay_webhook => Post "/webhook" impl PaymentGatewayDatabase);
/// Route handler for ArkPay's transaction status webhook.
///
/// The signature middleware has already authenticated the request by the time this handler runs, and the JSON
/// extractor has rejected malformed or unrecognised payloads with a 400. Everything that reaches the reconciler
/// is therefore a well-formed event from the processor, and the response is always a 200 acknowledgement:
/// whatever the event did (or did not) change is the gateway's business, not the sender's.
pub async fn arkpay_webhook<B>(
    req: HttpRequest,
    body: web::Json<TransactionEvent>,
    api: web::Data<ReconcileApi<B>>,
) -> HttpResponse
where
    B: PaymentGatewayDatabase,
{
    trace!("💻️ Received webhook request: {}", req.uri());
    let event = body.into_inner();
    let transaction_id = event.transaction_id.clone();
    let result = match api.process_status_event(event).await {
        Ok(ReconcileOutcome::OrderCreated { order, .. }) => {
            info!("💻️ Transaction [{transaction_id}] materialized order [{}].", order.order_key);
            JsonResponse::success("Order created.")
        },
        Ok(ReconcileOutcome::OrderSettled { order }) => {
            info!("💻️ Transaction [{transaction_id}] settled order [{}].", order.order_key);
            JsonResponse::success("Order settled.")
        },
        Ok(ReconcileOutcome::OrderFailed { order }) => {
            info!("💻️ Transaction [{transaction_id}] failed order [{}].", order.order_key);
            JsonResponse::success("Order failed.")
        },
        Ok(ReconcileOutcome::OrderCancelled { order }) => {
            info!("💻️ Transaction [{transaction_id}] cancelled order [{}].", order.order_key);
            JsonResponse::success("Order cancelled.")
        },
        Ok(ReconcileOutcome::DraftUpdated { draft }) => {
            info!("💻️ Transaction [{transaction_id}] is now {}.", draft.transaction_status);
            JsonResponse::success("Draft updated.")
        },
        Ok(ReconcileOutcome::HistoryAnnotated { order_id }) => {
            debug!("💻️ Transaction [{transaction_id}] annotated the history of order #{order_id}.");
            JsonResponse::success("History annotated.")
        },
        Ok(ReconcileOutcome::Ignored(reason)) => {
            debug!("💻️ Event for transaction [{transaction_id}] was a no-op: {reason}.");
            JsonResponse::success("Event acknowledged.")
        },
        Err(e) => {
            warn!("💻️ Unexpected error while handling status event for [{transaction_id}]. {e}");
            JsonResponse::failure("Unexpected error handling status event.")
        },
    };
    HttpResponse::Ok().json(result)
}

//----------------------------------------------   Payment page return  ----------------------------------------
route!(payment_return => Get "/return" impl PaymentGatewayDatabase);
/// Sends a customer returning from the hosted payment page on to the storefront's order-received page.
///
/// The webhook, not this redirect, is the source of truth for payment state. If the status event has not landed
/// yet the draft may still be unlinked, in which case the customer gets a 404 and the storefront's polling page
/// takes over.
pub async fn payment_return<B>(
    query: web::Query<ReturnParams>,
    api: web::Data<StorefrontApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
{
    let params = query.into_inner();
    let transaction_id = TransactionId::from(params.transaction_id);
    debug!("💻️ Customer returned from payment page for transaction [{transaction_id}] (success={:?})", params.success);
    let draft = api
        .draft_by_transaction_id(&transaction_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No draft for transaction {transaction_id}")))?;
    let linkage = draft
        .linkage()
        .ok_or_else(|| ServerError::NoRecordFound(format!("Transaction {transaction_id} has no order yet")))?;
    let base = options.order_received_url.trim_end_matches('/');
    let location = format!("{base}/{}/?key={}", linkage.order_id, linkage.order_key);
    debug!("💻️ Redirecting customer to {location}");
    Ok(HttpResponse::SeeOther().insert_header((header::LOCATION, location)).finish())
}
