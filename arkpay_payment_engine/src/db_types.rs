use std::{fmt::Display, str::FromStr};

use apg_common::MinorUnits;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------    TransactionId     --------------------------------------------------------
/// A lightweight wrapper around the transaction id assigned by the ArkPay processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TransactionId(pub String);

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for TransactionId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderKey        --------------------------------------------------------
/// The opaque key identifying a store order. Doubles as the merchant transaction id in the direct-card flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderKey(pub String);

impl Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for OrderKey {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl OrderKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  TransactionStatus   --------------------------------------------------------
/// The lifecycle of an ArkPay transaction as reported by the processor. Stored verbatim in the draft order table,
/// so the wire spelling (`NOT_STARTED` etc.) is also the storage spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// The transaction has been created with the processor, but the customer has not started paying.
    NotStarted,
    /// The customer has submitted payment and the processor is working on it.
    Processing,
    /// The payment has settled.
    Completed,
    /// The payment failed.
    Failed,
    /// The transaction was abandoned or explicitly cancelled.
    Cancelled,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::NotStarted => write!(f, "NOT_STARTED"),
            TransactionStatus::Processing => write!(f, "PROCESSING"),
            TransactionStatus::Completed => write!(f, "COMPLETED"),
            TransactionStatus::Failed => write!(f, "FAILED"),
            TransactionStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(Self::NotStarted),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid transaction status: {value}. But this conversion cannot fail. Defaulting to NotStarted");
            TransactionStatus::NotStarted
        })
    }
}

//--------------------------------------     OrderStatus      --------------------------------------------------------
/// The status of a store order in the local order projection. Stored lowercase, matching the storefront spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order exists, and we are waiting for the payment to settle.
    Pending,
    /// The payment has settled in full.
    Paid,
    /// The payment attempt failed.
    Failed,
    /// The order was cancelled before the payment settled.
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------      CartLine        --------------------------------------------------------
/// One line of the cart snapshot attached to a draft order. `variation_id` is zero for simple products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    #[serde(default)]
    pub variation_id: i64,
    pub quantity: u32,
}

//--------------------------------------  ShippingSnapshot    --------------------------------------------------------
/// The shipping method chosen at checkout, captured when the draft order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSnapshot {
    pub shipping_method_id: String,
    pub shipping_method_title: String,
    pub shipping_method_cost: MinorUnits,
}

//--------------------------------------   CouponSnapshot     --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponSnapshot {
    pub code: String,
    pub amount: MinorUnits,
}

//--------------------------------------    OrderLinkage      --------------------------------------------------------
/// The link between a draft order and the store order materialized from it. The two fields are only ever written
/// together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLinkage {
    pub order_id: i64,
    pub order_key: OrderKey,
}

//--------------------------------------     DraftOrder       --------------------------------------------------------
/// One row per processor transaction. The cart, shipping and coupon snapshots are stored as JSON text and
/// deserialized on demand via the typed accessors.
#[derive(Debug, Clone, FromRow)]
pub struct DraftOrder {
    pub id: i64,
    pub transaction_id: TransactionId,
    pub transaction_status: TransactionStatus,
    pub currency: String,
    pub total: MinorUnits,
    pub customer_email: Option<String>,
    pub cart_items: String,
    pub cart_identifier: Option<String>,
    pub order_id: Option<i64>,
    pub order_key: Option<OrderKey>,
    pub shipping: Option<String>,
    pub applied_coupons: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftOrder {
    /// The cart snapshot taken when this draft was created.
    pub fn items(&self) -> Result<Vec<CartLine>, serde_json::Error> {
        serde_json::from_str(&self.cart_items)
    }

    pub fn shipping_snapshot(&self) -> Result<Option<ShippingSnapshot>, serde_json::Error> {
        self.shipping.as_deref().map(serde_json::from_str).transpose()
    }

    pub fn coupons(&self) -> Result<Vec<CouponSnapshot>, serde_json::Error> {
        match self.applied_coupons.as_deref() {
            Some(json) => serde_json::from_str(json),
            None => Ok(Vec::new()),
        }
    }

    /// The store order linked to this draft, if it has been materialized.
    pub fn linkage(&self) -> Option<OrderLinkage> {
        match (self.order_id, self.order_key.clone()) {
            (Some(order_id), Some(order_key)) => Some(OrderLinkage { order_id, order_key }),
            _ => None,
        }
    }
}

//--------------------------------------    NewDraftOrder     --------------------------------------------------------
/// The payload for creating a draft order. Snapshots are typed here and serialized to JSON at the storage
/// boundary.
#[derive(Debug, Clone)]
pub struct NewDraftOrder {
    /// The transaction id assigned by the processor when the remote transaction was created.
    pub transaction_id: TransactionId,
    /// The currency the transaction was created in.
    pub currency: String,
    /// The amount the customer will be charged.
    pub total: MinorUnits,
    /// Billing email, when the storefront knows it at draft time.
    pub customer_email: Option<String>,
    /// The cart contents at the time of checkout.
    pub cart_items: Vec<CartLine>,
    /// Identifier used to resume a checkout with an unchanged cart. `None` for flows that cannot resume.
    pub cart_identifier: Option<String>,
    pub shipping: Option<ShippingSnapshot>,
    pub applied_coupons: Vec<CouponSnapshot>,
    /// The processor's hosted payment page for this transaction.
    pub redirect_url: Option<String>,
}

impl NewDraftOrder {
    pub fn new(transaction_id: TransactionId, currency: String, total: MinorUnits, cart_items: Vec<CartLine>) -> Self {
        Self {
            transaction_id,
            currency,
            total,
            customer_email: None,
            cart_items,
            cart_identifier: None,
            shipping: None,
            applied_coupons: Vec::new(),
            redirect_url: None,
        }
    }
}

//--------------------------------------     StoreOrder       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoreOrder {
    pub id: i64,
    pub order_key: OrderKey,
    pub status: OrderStatus,
    pub currency: String,
    pub total: MinorUnits,
    pub customer_email: Option<String>,
    pub shipping_method_id: Option<String>,
    pub shipping_method_title: Option<String>,
    pub shipping_method_cost: Option<MinorUnits>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    NewStoreOrder     --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewStoreOrder {
    pub order_key: OrderKey,
    pub status: OrderStatus,
    pub currency: String,
    pub total: MinorUnits,
    pub customer_email: Option<String>,
    pub shipping: Option<ShippingSnapshot>,
    pub items: Vec<CartLine>,
    pub coupons: Vec<CouponSnapshot>,
}

impl NewStoreOrder {
    pub fn pending(order_key: OrderKey, currency: String, total: MinorUnits) -> Self {
        Self {
            order_key,
            status: OrderStatus::Pending,
            currency,
            total,
            customer_email: None,
            shipping: None,
            items: Vec::new(),
            coupons: Vec::new(),
        }
    }
}

//--------------------------------------     OrderItem        --------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variation_id: i64,
    pub quantity: i64,
}

//--------------------------------------    OrderCoupon       --------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct OrderCoupon {
    pub id: i64,
    pub order_id: i64,
    pub code: String,
    pub amount: MinorUnits,
}

//-------------------------------------- TransactionMetaEntry -------------------------------------------------------
/// One entry in an order's payment attempt history. `meta_key` is the merchant transaction id exactly as it was
/// sent to the processor, suffix and all. Entries are appended once per attempt and never deleted; status
/// updates from the processor mutate the most recent entry.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionMetaEntry {
    pub id: i64,
    pub order_id: i64,
    pub meta_key: String,
    pub transaction_id: TransactionId,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  TransactionEvent    --------------------------------------------------------
/// A status event delivered by the ArkPay webhook. The `status` keyword is kept raw here; the reconciler parses
/// it and treats unknown keywords as a no-op rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransactionEvent {
    /// The processor's transaction id.
    #[serde(rename = "id")]
    pub transaction_id: TransactionId,
    /// The merchant transaction id we supplied at creation time, possibly carrying a `__` disambiguation suffix.
    pub merchant_transaction_id: String,
    pub status: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TransactionEvent {
    pub fn new<S1: Into<TransactionId>, S2: Into<String>, S3: Into<String>>(
        transaction_id: S1,
        merchant_transaction_id: S2,
        status: S3,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            merchant_transaction_id: merchant_transaction_id.into(),
            status: status.into(),
            email: None,
        }
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }
}
