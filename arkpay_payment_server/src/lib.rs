//! # ArkPay payment gateway server
//! This module hosts the HTTP surface of the payment gateway. It is responsible for:
//! Listening for incoming status webhooks from the ArkPay processor and authenticating their signatures.
//! Parsing the webhook body into a typed transaction event and handing it to the reconciler.
//! Serving the storefront checkout endpoints that create and resume payment transactions.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/arkpay/webhook`: The signature-guarded webhook route for receiving transaction status events.
//! * `/checkout/cart/pay`: Creates (or resumes) a hosted-payment-page transaction for the current cart.
//! * `/checkout/order/pay`: Pays an existing store order with card details (direct-card flow).
//! * `/checkout/return`: Redirects a customer returning from the hosted payment page to the order-received page.

pub mod checkout_routes;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
