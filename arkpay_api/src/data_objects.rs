use std::fmt;

use serde::{Deserialize, Serialize};

//--------------------------------        Create transaction        --------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionRequest {
    pub merchant_transaction_id: String,
    /// Decimal major units, e.g. 10.5. See [`apg_common::MinorUnits::to_major_units`].
    pub amount: f64,
    pub currency: String,
    pub description: String,
    /// `false` for the hosted-payment-page flow, `true` when the gateway will submit card
    /// details itself via the pay endpoint.
    pub handle_payment: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResource {
    pub id: String,
    pub merchant_transaction_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionResponse {
    pub transaction: TransactionResource,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// What the caller gets back from [`crate::PaymentProcessor::create_transaction`], including the
/// merchant id the processor finally accepted (suffix-qualified when the first attempt collided).
#[derive(Debug, Clone)]
pub struct CreatedTransaction {
    pub transaction: TransactionResource,
    pub redirect_url: Option<String>,
    pub merchant_transaction_id: String,
}

/// Error body the processor sends with non-2xx answers, `{"statusCode": 400, "message": "..."}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub status_code: u16,
    pub message: String,
}

//--------------------------------        Direct-card payment        -------------------------------------------------

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayTransactionRequest {
    /// Digits only. Use [`crate::helpers::digits_only`] before constructing the request.
    pub card_number: String,
    /// `MM/YY`, as collected by the card form.
    pub expiration_date: String,
    pub cvc: String,
    pub holder_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub ip_address: String,
    /// Where the ACS (3-D Secure) flow returns the customer to.
    pub return_url: String,
}

// Card number and CVC must never reach the logs, so Debug is written by hand.
impl fmt::Debug for PayTransactionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail = if self.card_number.len() >= 4 { &self.card_number[self.card_number.len() - 4..] } else { "" };
        f.debug_struct("PayTransactionRequest")
            .field("card_number", &format_args!("**** {tail}"))
            .field("expiration_date", &self.expiration_date)
            .field("cvc", &"***")
            .field("holder_name", &self.holder_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("ip_address", &self.ip_address)
            .field("return_url", &self.return_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayTransactionResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Set when the processor requires a 3-D Secure challenge.
    #[serde(default)]
    pub redirect_url: Option<String>,
}
