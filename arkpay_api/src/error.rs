use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArkPayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not serialize request: {0}")]
    RequestError(String),
    #[error("Invalid response from ArkPay: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Merchant transaction id still rejected after one disambiguation retry: {0}")]
    MerchantIdExhausted(String),
}
