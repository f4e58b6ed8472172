use crate::db_types::{DraftOrder, StoreOrder};

/// The result of trying to insert a draft order. Inserting an existing transaction id is not an error at this
/// level; callers decide whether it is a resume or a bug.
#[derive(Debug, Clone)]
pub enum InsertDraftResult {
    Inserted(DraftOrder),
    AlreadyExists(DraftOrder),
}

/// A store order freshly materialized from a draft, together with the draft row as it looks after gaining its
/// linkage.
#[derive(Debug, Clone)]
pub struct MaterializedOrder {
    pub order: StoreOrder,
    pub draft: DraftOrder,
}

/// The result of settling, failing or cancelling a draft. `order` is present only when the linked store order
/// changed status in the same transaction.
#[derive(Debug, Clone)]
pub struct DraftTransition {
    pub draft: DraftOrder,
    pub order: Option<StoreOrder>,
}

/// The result of applying a status event directly to a store order.
#[derive(Debug, Clone)]
pub enum OrderAnnotation {
    /// The order moved to a new status as part of this call.
    Transitioned(StoreOrder),
    /// The order was already in a state that absorbs the event. Only the attempt history changed.
    Annotated(StoreOrder),
}

impl OrderAnnotation {
    pub fn order(&self) -> &StoreOrder {
        match self {
            OrderAnnotation::Transitioned(order) => order,
            OrderAnnotation::Annotated(order) => order,
        }
    }
}
