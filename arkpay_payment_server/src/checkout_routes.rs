//----------------------------------------------   Checkout  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use arkpay_api::{
    helpers::{digits_only, new_merchant_reference},
    NewTransactionRequest,
    PayTransactionRequest,
    PaymentProcessor,
};
use arkpay_payment_engine::{
    db_types::{NewDraftOrder, OrderStatus, TransactionId, TransactionStatus},
    helpers::cart_identifier,
    PaymentGatewayDatabase,
    StorefrontApi,
};
use log::{debug, info, warn};

use crate::{
    data_objects::{CartPaymentRequest, CartPaymentResponse, OrderPaymentRequest, OrderPaymentResponse},
    errors::ServerError,
    route,
};

route!(initiate_cart_payment => Post "/cart/pay" impl PaymentGatewayDatabase, PaymentProcessor);
/// Starts a hosted-payment-page checkout for the storefront's current cart.
///
/// The cart identifier ties the transaction to the exact cart contents. As long as the cart is unchanged,
/// repeating this call resumes the existing transaction and returns the same payment page URL without touching
/// the processor. Any cart change produces a new identifier, which leaves the old draft behind and creates a
/// fresh transaction.
pub async fn initiate_cart_payment<BPay, PProc>(
    body: web::Json<CartPaymentRequest>,
    api: web::Data<StorefrontApi<BPay>>,
    processor: web::Data<PProc>,
) -> Result<HttpResponse, ServerError>
where
    BPay: PaymentGatewayDatabase,
    PProc: PaymentProcessor,
{
    let request = body.into_inner();
    let serialized_cart =
        serde_json::to_string(&request.items).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let identifier = cart_identifier(&request.session_id, &request.cart_hash, &serialized_cart);
    if let Some(redirect_url) = api.active_redirect(&identifier).await? {
        info!("🛒️ Resuming existing transaction for an unchanged cart.");
        return Ok(HttpResponse::Ok().json(CartPaymentResponse { redirect_url, resumed: true }));
    }
    let merchant_transaction_id = new_merchant_reference();
    let description = request.description.unwrap_or_else(|| "Storefront cart payment".to_string());
    debug!("🛒️ Creating transaction {merchant_transaction_id} for {} {}", request.total, request.currency);
    let created = processor
        .create_transaction(NewTransactionRequest {
            merchant_transaction_id,
            amount: request.total.to_major_units(),
            currency: request.currency.clone(),
            description,
            handle_payment: false,
        })
        .await?;
    let redirect_url = created.redirect_url.clone().ok_or_else(|| {
        warn!("🛒️ The processor created transaction {} but returned no payment page URL", created.transaction.id);
        ServerError::PaymentProcessorError("No payment page URL in the processor's response".to_string())
    })?;
    let transaction_id = TransactionId::from(created.transaction.id);
    let mut draft = NewDraftOrder::new(transaction_id.clone(), request.currency, request.total, request.items);
    draft.cart_identifier = Some(identifier);
    draft.customer_email = request.customer_email;
    draft.shipping = request.shipping;
    draft.applied_coupons = request.coupons;
    draft.redirect_url = Some(redirect_url.clone());
    let (_, resumed) = api.save_new_draft(draft).await?;
    info!("🛒️ Cart checkout ready: transaction [{transaction_id}] awaits payment.");
    Ok(HttpResponse::Ok().json(CartPaymentResponse { redirect_url, resumed }))
}

route!(pay_order => Post "/order/pay" impl PaymentGatewayDatabase, PaymentProcessor);
/// Pays an existing store order with card details (direct-card flow).
///
/// The order key doubles as the merchant transaction id, which is how the webhook later finds its way back to
/// the order. When the processor reports a merchant-id collision the client retries once under a suffixed id,
/// and the payment attempt is recorded against the order under whichever id was actually accepted.
pub async fn pay_order<BPay, PProc>(
    req: HttpRequest,
    body: web::Json<OrderPaymentRequest>,
    api: web::Data<StorefrontApi<BPay>>,
    processor: web::Data<PProc>,
) -> Result<HttpResponse, ServerError>
where
    BPay: PaymentGatewayDatabase,
    PProc: PaymentProcessor,
{
    let request = body.into_inner();
    let order = api
        .order_by_key(&request.order_key)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No order with key {}", request.order_key)))?;
    if order.status == OrderStatus::Paid {
        debug!("🛒️ Order [{}] is already paid. Refusing a second payment.", order.order_key);
        return Err(ServerError::InvalidRequestBody(format!("Order {} has already been paid", order.order_key)));
    }
    debug!("🛒️ Direct card payment for order [{}] ({} {})", order.order_key, order.total, order.currency);
    let created = processor
        .create_transaction(NewTransactionRequest {
            merchant_transaction_id: order.order_key.to_string(),
            amount: order.total.to_major_units(),
            currency: order.currency.clone(),
            description: format!("Payment for order {}", order.order_key),
            handle_payment: true,
        })
        .await?;
    let transaction_id = TransactionId::from(created.transaction.id.clone());
    let status = TransactionStatus::from(created.transaction.status);
    api.record_payment_attempt(order.id, &created.merchant_transaction_id, &transaction_id, status).await?;
    let ip_address = request
        .ip_address
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_default();
    let card = request.card;
    let response = processor
        .pay_transaction(&created.transaction.id, PayTransactionRequest {
            card_number: digits_only(&card.number),
            expiration_date: card.expiration_date,
            cvc: card.cvc,
            holder_name: card.holder_name,
            email: card.email,
            phone: card.phone,
            address: card.address,
            ip_address,
            return_url: request.return_url,
        })
        .await?;
    info!("🛒️ Card payment for order [{}] answered with status {}", order.order_key, response.status);
    Ok(HttpResponse::Ok()
        .json(OrderPaymentResponse { status: response.status, message: response.message, redirect_url: response.redirect_url }))
}
