//! Outbound client for the ArkPay merchant API.
//!
//! The gateway makes exactly two kinds of calls upstream: creating a transaction (which yields
//! the hosted-payment-page redirect URL) and submitting card details for a direct payment. Both
//! are POSTs authenticated with an `X-Api-Key` header and an HMAC-SHA256 `Signature` computed
//! over the versioned API URI and the exact body bytes sent.
//!
//! Create/pay calls are never retried automatically (a retry could double-charge). The single
//! exception is the merchant-id collision protocol: when the processor answers 400 because the
//! merchant transaction id is already taken, [`ArkPayApi`] retries exactly once under a
//! `__<suffix>`-disambiguated id and reports the id it ended up using.

mod api;
mod config;
mod data_objects;
mod error;
pub mod helpers;

pub use api::{ArkPayApi, PaymentProcessor, TRANSACTIONS_PATH};
pub use config::ArkPayConfig;
pub use data_objects::{
    ApiErrorBody,
    CreateTransactionResponse,
    CreatedTransaction,
    NewTransactionRequest,
    PayTransactionRequest,
    PayTransactionResponse,
    TransactionResource,
};
pub use error::ArkPayApiError;
