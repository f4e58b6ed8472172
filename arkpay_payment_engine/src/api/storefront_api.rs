use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{DraftOrderManagement, OrderManagement, PaymentGatewayError},
    db_types::{
        DraftOrder,
        NewDraftOrder,
        NewStoreOrder,
        OrderKey,
        StoreOrder,
        TransactionId,
        TransactionMetaEntry,
        TransactionStatus,
    },
};

/// `StorefrontApi` backs the checkout flows: saving draft orders when a hosted payment page checkout starts,
/// resuming a checkout whose cart has not changed, registering storefront-created orders, and recording payment
/// attempts against them.
pub struct StorefrontApi<B> {
    db: B,
}

impl<B> Debug for StorefrontApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorefrontApi")
    }
}

impl<B> StorefrontApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> StorefrontApi<B>
where B: DraftOrderManagement + OrderManagement
{
    /// Returns the hosted payment page of a still-resumable draft for the given cart identifier, if one exists.
    /// The checkout flow calls this before creating a remote transaction, so an unchanged cart never creates a
    /// second one.
    pub async fn active_redirect(&self, cart_identifier: &str) -> Result<Option<String>, PaymentGatewayError> {
        self.db.active_draft_redirect(cart_identifier).await
    }

    /// Saves a draft order for a freshly created transaction. If a draft already exists for the transaction id,
    /// the existing draft is returned instead and the second element is `true`: the checkout is a resume, not a
    /// failure.
    pub async fn save_new_draft(&self, draft: NewDraftOrder) -> Result<(DraftOrder, bool), PaymentGatewayError> {
        let transaction_id = draft.transaction_id.clone();
        match self.db.insert_draft_order(draft).await {
            Ok(draft) => Ok((draft, false)),
            Err(PaymentGatewayError::DraftAlreadyExists(_)) => {
                debug!("🛒️ A draft already exists for transaction [{transaction_id}]. Resuming it.");
                let existing = self
                    .db
                    .fetch_draft_order_by_transaction_id(&transaction_id)
                    .await?
                    .ok_or(PaymentGatewayError::DraftNotFound(transaction_id))?;
                Ok((existing, true))
            },
            Err(e) => Err(e),
        }
    }

    pub async fn draft_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<DraftOrder>, PaymentGatewayError> {
        self.db.fetch_draft_order_by_transaction_id(transaction_id).await
    }

    /// Registers an order the storefront created itself. The direct-card flow pays against such an order.
    pub async fn register_order(&self, order: NewStoreOrder) -> Result<StoreOrder, PaymentGatewayError> {
        self.db.insert_order(order).await
    }

    pub async fn order_by_key(&self, order_key: &OrderKey) -> Result<Option<StoreOrder>, PaymentGatewayError> {
        self.db.fetch_order_by_key(order_key).await
    }

    /// Records a payment attempt in the order's transaction history, under the merchant transaction id that was
    /// actually sent to the processor.
    pub async fn record_payment_attempt(
        &self,
        order_id: i64,
        meta_key: &str,
        transaction_id: &TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionMetaEntry, PaymentGatewayError> {
        self.db.append_transaction_attempt(order_id, meta_key, transaction_id, status).await
    }
}
