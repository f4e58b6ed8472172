use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use arkpay_api::ArkPayApiError;
use arkpay_payment_engine::PaymentGatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Signature mismatch.")]
    SignatureMismatch,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The payment processor could not complete the request. {0}")]
    PaymentProcessorError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::SignatureMismatch => StatusCode::UNAUTHORIZED,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentProcessorError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // The 401 body is part of the processor-facing contract, so it is spelled out exactly.
        let body = match self {
            Self::SignatureMismatch => {
                serde_json::json!({ "code": 401, "message": "Signature mismatch." }).to_string()
            },
            _ => serde_json::json!({ "error": self.to_string() }).to_string(),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body)
    }
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::DraftNotFound(id) => Self::NoRecordFound(format!("No draft for transaction {id}")),
            PaymentGatewayError::OrderNotFound(what) => Self::NoRecordFound(format!("No order found. {what}")),
            PaymentGatewayError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ArkPayApiError> for ServerError {
    fn from(e: ArkPayApiError) -> Self {
        Self::PaymentProcessorError(e.to_string())
    }
}
