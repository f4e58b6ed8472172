//! ArkPay Payment Engine
//!
//! The ArkPay payment engine tracks card payments made through the ArkPay processor on behalf of a storefront.
//! This library contains the core logic for the payment gateway. It knows nothing about HTTP; the server crate
//! drives it.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). Sqlite is the supported backend. You should never need to
//!    access the database directly. Instead, use the public API provided by the payment engine. The exception is
//!    the data types used in the database. These are defined in the `db_types` module and are public.
//! 2. The payment engine public API ([`mod@api`]). This provides the public-facing functionality of the engine:
//!    the [`api::ReconcileApi`] applies processor status events to draft orders and store orders, and the
//!    [`api::StorefrontApi`] backs the checkout flows. Backends implement the traits in [`mod@db`] in order to
//!    act as a store for these APIs.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when an order
//! actually changes state as a result of a processor event. For example, when an order is settled, an
//! [`events::OrderPaidEvent`] is emitted. A simple actor framework is used so that you can easily hook into
//! these events and perform custom actions.
mod db;

pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{
    DraftOrderManagement,
    DraftTransition,
    InsertDraftResult,
    MaterializedOrder,
    OrderAnnotation,
    OrderManagement,
    PaymentGatewayDatabase,
    PaymentGatewayError,
};
pub use api::{ReconcileApi, ReconcileOutcome, StorefrontApi};
