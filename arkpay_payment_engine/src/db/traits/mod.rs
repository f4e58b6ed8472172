//! # Database management and control.
//!
//! This module provides the interfaces that define the interface contracts of the payment engine database
//! *backends*.
//!
//! ## Draft orders
//! A draft order is the engine's record of a single ArkPay transaction: the cart snapshot it was created from,
//! the processor's status for it, and (once materialized) a link to the store order it became.
//!
//! The [`PaymentGatewayDatabase`] trait provides the composite, transactional operations the reconciler uses to
//! move a transaction through its lifecycle. Each of these runs in a single database transaction so that a
//! status event is applied exactly once, no matter how often or in what order the processor delivers it.
//!
//! ## Traits
//! * [`PaymentGatewayDatabase`] defines the highest level of behavior for backends supporting the payment
//!   engine.
//! * [`DraftOrderManagement`] defines the behaviour for creating and querying draft orders.
//! * [`OrderManagement`] defines the behaviour for the local store order projection, including the per-order
//!   payment attempt history.
mod draft_order_management;
mod order_management;
mod payment_gateway_database;

mod data_objects;

pub use data_objects::{DraftTransition, InsertDraftResult, MaterializedOrder, OrderAnnotation};
pub use draft_order_management::DraftOrderManagement;
pub use order_management::OrderManagement;
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
