use std::fmt::Debug;

use apg_common::helpers::strip_merchant_suffix;
use log::*;

use crate::{
    db::traits::{DraftTransition, OrderAnnotation, PaymentGatewayDatabase, PaymentGatewayError},
    db_types::{DraftOrder, OrderKey, OrderStatus, StoreOrder, TransactionEvent, TransactionStatus},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
};

/// What a status event did to the database. The webhook endpoint acknowledges the processor regardless; this is
/// for logging, tests and hooks.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// A pending store order was materialized from the draft's snapshots.
    OrderCreated { order: StoreOrder, draft: DraftOrder },
    /// A store order transitioned to `paid`.
    OrderSettled { order: StoreOrder },
    /// A store order transitioned to `failed`.
    OrderFailed { order: StoreOrder },
    /// A store order transitioned to `cancelled`.
    OrderCancelled { order: StoreOrder },
    /// The draft advanced, but no store order changed status.
    DraftUpdated { draft: DraftOrder },
    /// Only an order's payment attempt history changed.
    HistoryAnnotated { order_id: i64 },
    /// The event carried no effect, with a short reason why.
    Ignored(&'static str),
}

/// `ReconcileApi` is the primary API for applying ArkPay status events to draft orders and store orders.
///
/// Events are resolved against a store order first (the merchant transaction id doubles as the order key in the
/// direct-card flow) and against the draft order store otherwise. All state changes are delegated to the
/// backend's single-transaction operations, so processing is idempotent: re-delivered, out-of-order and
/// concurrent events converge on the same final state, and an event that finds nothing to do is a logged no-op,
/// never an error.
pub struct ReconcileApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconcileApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcileApi")
    }
}

impl<B> ReconcileApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> ReconcileApi<B>
where B: PaymentGatewayDatabase
{
    /// Applies a single status event from the processor.
    ///
    /// Unknown status keywords and unknown transactions are ignored rather than rejected: the processor has
    /// already been authenticated by the time an event reaches this method, and an event we cannot act on is
    /// not the sender's problem.
    pub async fn process_status_event(&self, event: TransactionEvent) -> Result<ReconcileOutcome, PaymentGatewayError> {
        let Ok(status) = event.status.parse::<TransactionStatus>() else {
            warn!(
                "🔄️ Ignoring event for transaction [{}] with unknown status keyword '{}'",
                event.transaction_id, event.status
            );
            return Ok(ReconcileOutcome::Ignored("unknown status keyword"));
        };
        trace!("🔄️ {status} event received for transaction [{}]", event.transaction_id);
        let order_key = OrderKey::from(strip_merchant_suffix(&event.merchant_transaction_id));
        if !order_key.as_str().is_empty() {
            if let Some(order) = self.db.fetch_order_by_key(&order_key).await? {
                return self.apply_to_order(order, &event, status).await;
            }
        }
        match self.db.fetch_draft_order_by_transaction_id(&event.transaction_id).await? {
            Some(draft) => self.apply_to_draft(draft, &event, status).await,
            None => {
                debug!("🔄️ No draft or store order matches transaction [{}]. Nothing to do.", event.transaction_id);
                Ok(ReconcileOutcome::Ignored("unknown transaction"))
            },
        }
    }

    /// The event's merchant transaction id resolved to a store order: annotate its history and apply the
    /// matching order transition, if any.
    async fn apply_to_order(
        &self,
        order: StoreOrder,
        event: &TransactionEvent,
        status: TransactionStatus,
    ) -> Result<ReconcileOutcome, PaymentGatewayError> {
        let new_status = match status {
            TransactionStatus::NotStarted => {
                debug!("🔄️ NOT_STARTED event for order [{}] carries no effect", order.order_key);
                return Ok(ReconcileOutcome::Ignored("NOT_STARTED carries no effect"));
            },
            TransactionStatus::Processing => None,
            TransactionStatus::Completed => Some(OrderStatus::Paid),
            TransactionStatus::Failed => Some(OrderStatus::Failed),
            TransactionStatus::Cancelled => Some(OrderStatus::Cancelled),
        };
        match self.db.annotate_order_status(&order, event, status, new_status).await? {
            OrderAnnotation::Transitioned(order) => {
                info!("🔄️ Order [{}] is now {} (transaction [{}])", order.order_key, order.status, event.transaction_id);
                let outcome = match order.status {
                    OrderStatus::Paid => {
                        self.call_order_paid_hook(&order).await;
                        ReconcileOutcome::OrderSettled { order }
                    },
                    OrderStatus::Failed => {
                        self.call_order_annulled_hook(&order).await;
                        ReconcileOutcome::OrderFailed { order }
                    },
                    OrderStatus::Cancelled => {
                        self.call_order_annulled_hook(&order).await;
                        ReconcileOutcome::OrderCancelled { order }
                    },
                    OrderStatus::Pending => ReconcileOutcome::HistoryAnnotated { order_id: order.id },
                };
                Ok(outcome)
            },
            OrderAnnotation::Annotated(order) => {
                debug!(
                    "🔄️ Order [{}] stays {} after {status} event. History annotated.",
                    order.order_key, order.status
                );
                Ok(ReconcileOutcome::HistoryAnnotated { order_id: order.id })
            },
        }
    }

    /// The event resolved to a draft order: run it through the draft state machine.
    async fn apply_to_draft(
        &self,
        draft: DraftOrder,
        event: &TransactionEvent,
        status: TransactionStatus,
    ) -> Result<ReconcileOutcome, PaymentGatewayError> {
        match status {
            TransactionStatus::NotStarted => Ok(ReconcileOutcome::Ignored("NOT_STARTED carries no effect")),
            TransactionStatus::Processing => {
                if draft.transaction_status != TransactionStatus::NotStarted {
                    debug!(
                        "🔄️ Transaction [{}] is already {}. PROCESSING event ignored.",
                        draft.transaction_id, draft.transaction_status
                    );
                    return Ok(ReconcileOutcome::Ignored("transaction already left NOT_STARTED"));
                }
                match self.db.materialize_order_from_draft(&draft, event).await? {
                    Some(materialized) => {
                        info!(
                            "🔄️ Created order [{}] for transaction [{}]",
                            materialized.order.order_key, draft.transaction_id
                        );
                        Ok(ReconcileOutcome::OrderCreated { order: materialized.order, draft: materialized.draft })
                    },
                    // A concurrent delivery won the materialization race.
                    None => Ok(ReconcileOutcome::Ignored("transaction already left NOT_STARTED")),
                }
            },
            TransactionStatus::Completed => match self.db.settle_completed_draft(&draft, event).await? {
                Some(DraftTransition { order: Some(order), .. }) => {
                    info!("🔄️ Order [{}] paid for transaction [{}]", order.order_key, draft.transaction_id);
                    self.call_order_paid_hook(&order).await;
                    Ok(ReconcileOutcome::OrderSettled { order })
                },
                Some(DraftTransition { draft, order: None }) => Ok(ReconcileOutcome::DraftUpdated { draft }),
                None => {
                    debug!(
                        "🔄️ COMPLETED event ignored: transaction [{}] is {}, not PROCESSING",
                        draft.transaction_id, draft.transaction_status
                    );
                    Ok(ReconcileOutcome::Ignored("transaction is not PROCESSING"))
                },
            },
            TransactionStatus::Failed => match self.db.fail_draft_order(&draft, event).await? {
                Some(DraftTransition { order: Some(order), .. }) => {
                    info!("🔄️ Order [{}] failed for transaction [{}]", order.order_key, draft.transaction_id);
                    self.call_order_annulled_hook(&order).await;
                    Ok(ReconcileOutcome::OrderFailed { order })
                },
                Some(DraftTransition { draft, order: None }) => Ok(ReconcileOutcome::DraftUpdated { draft }),
                None => Ok(ReconcileOutcome::Ignored("draft no longer accepts failure events")),
            },
            TransactionStatus::Cancelled => match self.db.cancel_draft_order(&draft, event).await? {
                Some(DraftTransition { order: Some(order), .. }) => {
                    info!("🔄️ Order [{}] cancelled for transaction [{}]", order.order_key, draft.transaction_id);
                    self.call_order_annulled_hook(&order).await;
                    Ok(ReconcileOutcome::OrderCancelled { order })
                },
                Some(DraftTransition { draft, order: None }) => Ok(ReconcileOutcome::DraftUpdated { draft }),
                None => Ok(ReconcileOutcome::Ignored("draft no longer accepts cancellation events")),
            },
        }
    }

    async fn call_order_paid_hook(&self, order: &StoreOrder) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &StoreOrder) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🔄️ Notifying order annulled hook subscribers");
            let event = OrderAnnulledEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }
}
