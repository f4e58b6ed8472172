//! `SqliteDatabase` is a concrete implementation of an ArkPay payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//! The composite reconciler operations each run in a single SQLite transaction; see
//! [`PaymentGatewayDatabase`] for the semantics.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, drafts, new_pool, orders, transaction_meta};
use crate::{
    db::traits::{
        DraftOrderManagement,
        DraftTransition,
        InsertDraftResult,
        MaterializedOrder,
        OrderAnnotation,
        OrderManagement,
        PaymentGatewayDatabase,
        PaymentGatewayError,
    },
    db_types::{
        DraftOrder,
        NewDraftOrder,
        NewStoreOrder,
        OrderCoupon,
        OrderItem,
        OrderKey,
        OrderLinkage,
        OrderStatus,
        StoreOrder,
        TransactionEvent,
        TransactionId,
        TransactionMetaEntry,
        TransactionStatus,
    },
    helpers,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl DraftOrderManagement for SqliteDatabase {
    async fn insert_draft_order(&self, draft: NewDraftOrder) -> Result<DraftOrder, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        match drafts::idempotent_insert(draft, &mut conn).await? {
            InsertDraftResult::Inserted(draft) => Ok(draft),
            InsertDraftResult::AlreadyExists(draft) => {
                Err(PaymentGatewayError::DraftAlreadyExists(draft.transaction_id))
            },
        }
    }

    async fn fetch_draft_order_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<DraftOrder>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let draft = drafts::fetch_draft_by_transaction_id(transaction_id, &mut conn).await?;
        Ok(draft)
    }

    async fn active_draft_redirect(&self, cart_identifier: &str) -> Result<Option<String>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let draft = drafts::fetch_resumable_draft(cart_identifier, &mut conn).await?;
        Ok(draft.and_then(|d| d.redirect_url))
    }

    async fn update_draft_status(
        &self,
        transaction_id: &TransactionId,
        status: TransactionStatus,
        linkage: Option<OrderLinkage>,
    ) -> Result<DraftOrder, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let draft = drafts::update_draft_status(transaction_id, status, linkage.as_ref(), &mut conn).await?;
        draft.ok_or_else(|| PaymentGatewayError::DraftNotFound(transaction_id.clone()))
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewStoreOrder) -> Result<StoreOrder, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order_by_key(&self, order_key: &OrderKey) -> Result<Option<StoreOrder>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_key(order_key, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<StoreOrder>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_order_coupons(&self, order_id: i64) -> Result<Vec<OrderCoupon>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let coupons = orders::fetch_order_coupons(order_id, &mut conn).await?;
        Ok(coupons)
    }

    async fn append_transaction_attempt(
        &self,
        order_id: i64,
        meta_key: &str,
        transaction_id: &TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionMetaEntry, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        if orders::fetch_order_by_id(order_id, &mut conn).await?.is_none() {
            return Err(PaymentGatewayError::OrderNotFound(format!("id {order_id}")));
        }
        let entry = transaction_meta::append_entry(order_id, meta_key, transaction_id, status, &mut conn).await?;
        debug!("🗃️ Recorded payment attempt [{meta_key}] against order #{order_id}");
        Ok(entry)
    }

    async fn transaction_history(&self, order_id: i64) -> Result<Vec<TransactionMetaEntry>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let entries = transaction_meta::fetch_history(order_id, &mut conn).await?;
        Ok(entries)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn materialize_order_from_draft(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<MaterializedOrder>, PaymentGatewayError> {
        // Snapshots are parsed before any SQL runs so that a corrupt snapshot cannot leave half an order behind.
        let items = draft.items()?;
        let shipping = draft.shipping_snapshot()?;
        let coupons = draft.coupons()?;
        let order_key = OrderKey::from(helpers::new_order_key());
        let new_order = NewStoreOrder {
            order_key,
            status: OrderStatus::Pending,
            currency: draft.currency.clone(),
            total: draft.total,
            customer_email: event.email.clone().or_else(|| draft.customer_email.clone()),
            shipping,
            items,
            coupons,
        };
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(new_order, &mut tx).await?;
        transaction_meta::append_entry(
            order.id,
            &event.merchant_transaction_id,
            &event.transaction_id,
            TransactionStatus::Processing,
            &mut tx,
        )
        .await?;
        let linkage = OrderLinkage { order_id: order.id, order_key: order.order_key.clone() };
        let updated = drafts::transition_draft(
            &draft.transaction_id,
            &[TransactionStatus::NotStarted],
            TransactionStatus::Processing,
            Some(&linkage),
            &mut tx,
        )
        .await?;
        match updated {
            Some(updated_draft) => {
                tx.commit().await?;
                debug!(
                    "🗃️ Transaction [{}] materialized into order [{}] (id {})",
                    draft.transaction_id, linkage.order_key, linkage.order_id
                );
                Ok(Some(MaterializedOrder { order, draft: updated_draft }))
            },
            None => {
                tx.rollback().await?;
                debug!(
                    "🗃️ Draft for transaction [{}] was no longer NOT_STARTED. The new order has been rolled back.",
                    draft.transaction_id
                );
                Ok(None)
            },
        }
    }

    async fn settle_completed_draft(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<DraftTransition>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let updated = drafts::transition_draft(
            &draft.transaction_id,
            &[TransactionStatus::Processing],
            TransactionStatus::Completed,
            None,
            &mut tx,
        )
        .await?;
        let Some(updated_draft) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };
        match updated_draft.linkage() {
            Some(linkage) => {
                transaction_meta::upsert_last_status(
                    linkage.order_id,
                    &event.merchant_transaction_id,
                    &event.transaction_id,
                    TransactionStatus::Completed,
                    &mut tx,
                )
                .await?;
                let order = orders::transition_order(linkage.order_id, OrderStatus::Paid, &mut tx).await?;
                tx.commit().await?;
                debug!("🗃️ Transaction [{}] is now COMPLETED. Order [{}] settled.", draft.transaction_id, linkage.order_key);
                Ok(Some(DraftTransition { draft: updated_draft, order }))
            },
            None => {
                let msg = format!(
                    "Draft for transaction [{}] is PROCESSING but has no linked order. This is a bug and the \
                     transaction will be rolled back",
                    draft.transaction_id
                );
                error!("🗃️ {msg}");
                tx.rollback().await?;
                Err(PaymentGatewayError::DatabaseError(msg))
            },
        }
    }

    async fn fail_draft_order(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<DraftTransition>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        // The row count of this first conditional update answers "was it PROCESSING?" atomically.
        if let Some(updated_draft) = drafts::transition_draft(
            &draft.transaction_id,
            &[TransactionStatus::Processing],
            TransactionStatus::Failed,
            None,
            &mut tx,
        )
        .await?
        {
            let Some(linkage) = updated_draft.linkage() else {
                let msg = format!(
                    "Draft for transaction [{}] is PROCESSING but has no linked order. This is a bug and the \
                     transaction will be rolled back",
                    draft.transaction_id
                );
                error!("🗃️ {msg}");
                tx.rollback().await?;
                return Err(PaymentGatewayError::DatabaseError(msg));
            };
            transaction_meta::upsert_last_status(
                linkage.order_id,
                &event.merchant_transaction_id,
                &event.transaction_id,
                TransactionStatus::Failed,
                &mut tx,
            )
            .await?;
            let order = orders::transition_order(linkage.order_id, OrderStatus::Failed, &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Transaction [{}] FAILED. Order [{}] marked as failed.", draft.transaction_id, linkage.order_key);
            return Ok(Some(DraftTransition { draft: updated_draft, order }));
        }
        let updated = drafts::transition_draft(
            &draft.transaction_id,
            &[TransactionStatus::NotStarted, TransactionStatus::Failed],
            TransactionStatus::Failed,
            None,
            &mut tx,
        )
        .await?;
        match updated {
            Some(updated_draft) => {
                tx.commit().await?;
                debug!("🗃️ Transaction [{}] FAILED before an order existed.", draft.transaction_id);
                Ok(Some(DraftTransition { draft: updated_draft, order: None }))
            },
            None => {
                tx.rollback().await?;
                Ok(None)
            },
        }
    }

    async fn cancel_draft_order(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<DraftTransition>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        if let Some(updated_draft) = drafts::transition_draft(
            &draft.transaction_id,
            &[TransactionStatus::Processing],
            TransactionStatus::Cancelled,
            None,
            &mut tx,
        )
        .await?
        {
            let Some(linkage) = updated_draft.linkage() else {
                let msg = format!(
                    "Draft for transaction [{}] is PROCESSING but has no linked order. This is a bug and the \
                     transaction will be rolled back",
                    draft.transaction_id
                );
                error!("🗃️ {msg}");
                tx.rollback().await?;
                return Err(PaymentGatewayError::DatabaseError(msg));
            };
            transaction_meta::upsert_last_status(
                linkage.order_id,
                &event.merchant_transaction_id,
                &event.transaction_id,
                TransactionStatus::Cancelled,
                &mut tx,
            )
            .await?;
            let order = orders::transition_order(linkage.order_id, OrderStatus::Cancelled, &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Transaction [{}] CANCELLED. Order [{}] cancelled.", draft.transaction_id, linkage.order_key);
            return Ok(Some(DraftTransition { draft: updated_draft, order }));
        }
        let updated = drafts::transition_draft(
            &draft.transaction_id,
            &[TransactionStatus::NotStarted],
            TransactionStatus::Cancelled,
            None,
            &mut tx,
        )
        .await?;
        match updated {
            Some(updated_draft) => {
                tx.commit().await?;
                debug!("🗃️ Transaction [{}] CANCELLED before an order existed.", draft.transaction_id);
                Ok(Some(DraftTransition { draft: updated_draft, order: None }))
            },
            None => {
                tx.rollback().await?;
                Ok(None)
            },
        }
    }

    async fn annotate_order_status(
        &self,
        order: &StoreOrder,
        event: &TransactionEvent,
        status: TransactionStatus,
        new_status: Option<OrderStatus>,
    ) -> Result<OrderAnnotation, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        transaction_meta::upsert_last_status(
            order.id,
            &event.merchant_transaction_id,
            &event.transaction_id,
            status,
            &mut tx,
        )
        .await?;
        let result = match new_status {
            Some(target) => match orders::transition_order(order.id, target, &mut tx).await? {
                Some(updated) => {
                    debug!("🗃️ Order [{}] is now {}", updated.order_key, updated.status);
                    OrderAnnotation::Transitioned(updated)
                },
                None => OrderAnnotation::Annotated(order.clone()),
            },
            None => OrderAnnotation::Annotated(order.clone()),
        };
        tx.commit().await?;
        Ok(result)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
