use std::{fmt, fmt::Display};

use apg_common::MinorUnits;
use arkpay_payment_engine::db_types::{CartLine, CouponSnapshot, OrderKey, ShippingSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------   Cart payment   ----------------------------------------------------------

/// What the storefront sends to start a hosted-payment-page checkout for the current cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartPaymentRequest {
    /// The customer's session id. Part of the cart identity, so two browsers with identical carts do not share a
    /// transaction.
    pub session_id: String,
    /// The storefront's hash of the cart contents. Any cart change produces a new identifier and thus a new
    /// transaction.
    pub cart_hash: String,
    pub currency: String,
    /// Grand total in minor units.
    pub total: MinorUnits,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub shipping: Option<ShippingSnapshot>,
    #[serde(default)]
    pub coupons: Vec<CouponSnapshot>,
    /// Free-text description shown on the processor's payment page. Defaults to a generic one.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartPaymentResponse {
    pub redirect_url: String,
    /// True when an existing transaction for the same cart was resumed instead of a new one being created.
    pub resumed: bool,
}

//----------------------------------------   Direct order payment   --------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
pub struct CardDetails {
    /// May contain spaces or dashes as typed; it is reduced to digits before leaving the server.
    pub number: String,
    /// `MM/YY`.
    pub expiration_date: String,
    pub cvc: String,
    pub holder_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// Card number and CVC must never reach the logs, so Debug is written by hand.
impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail = if self.number.len() >= 4 { &self.number[self.number.len() - 4..] } else { "" };
        f.debug_struct("CardDetails")
            .field("number", &format_args!("**** {tail}"))
            .field("expiration_date", &self.expiration_date)
            .field("cvc", &"***")
            .field("holder_name", &self.holder_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaymentRequest {
    pub order_key: OrderKey,
    pub card: CardDetails,
    /// The customer's IP as seen by the storefront. Falls back to the connection's peer address.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Where the 3-D Secure flow returns the customer to.
    pub return_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaymentResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Present when the processor requires a 3-D Secure challenge.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

//----------------------------------------   Payment page return   ---------------------------------------------------

/// Query parameters ArkPay appends when sending the customer back from the hosted payment page.
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnParams {
    #[serde(rename = "arkpayTransactionId")]
    pub transaction_id: String,
    #[serde(default)]
    pub success: Option<String>,
}
