use arkpay_api::{
    ArkPayApiError,
    CreatedTransaction,
    NewTransactionRequest,
    PayTransactionRequest,
    PayTransactionResponse,
    PaymentProcessor,
    TransactionResource,
};
use mockall::mock;

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn create_transaction(&self, request: NewTransactionRequest) -> Result<CreatedTransaction, ArkPayApiError>;
        async fn pay_transaction(&self, transaction_id: &str, request: PayTransactionRequest) -> Result<PayTransactionResponse, ArkPayApiError>;
    }
}

/// A `CreatedTransaction` as the processor would return it for a fresh merchant id.
pub fn created_transaction(transaction_id: &str, merchant_id: &str, redirect_url: Option<&str>) -> CreatedTransaction {
    CreatedTransaction {
        transaction: TransactionResource {
            id: transaction_id.to_string(),
            merchant_transaction_id: merchant_id.to_string(),
            status: "NOT_STARTED".to_string(),
        },
        redirect_url: redirect_url.map(String::from),
        merchant_transaction_id: merchant_id.to_string(),
    }
}
