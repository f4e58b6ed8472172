//! # ArkPay payment engine public API
//!
//! The `api` module exposes the programmatic API for the payment engine. The API is modular, so that clients
//! can pick and choose the functionality they want.
//!
//! * [`reconcile_api`] is the primary API for applying processor status events to draft orders and store
//!   orders. It is what the webhook endpoint drives.
//! * [`storefront_api`] backs the checkout flows: saving draft orders, resuming a checkout with an unchanged
//!   cart, and recording payment attempts against store orders.
//!
//! # API usage
//!
//! The pattern for using the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! For example, to apply a status event to the database:
//!
//! ```rust,ignore
//! use arkpay_payment_engine::{events::EventProducers, ReconcileApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements PaymentGatewayDatabase
//! let api = ReconcileApi::new(db, EventProducers::default());
//! let outcome = api.process_status_event(event).await?;
//! ```

pub mod reconcile_api;
pub mod storefront_api;

pub use reconcile_api::{ReconcileApi, ReconcileOutcome};
pub use storefront_api::StorefrontApi;
