use std::sync::Arc;

use apg_common::signature::sign_request;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::ArkPayConfig,
    data_objects::{
        ApiErrorBody,
        CreateTransactionResponse,
        CreatedTransaction,
        NewTransactionRequest,
        PayTransactionRequest,
        PayTransactionResponse,
    },
    error::ArkPayApiError,
    helpers::disambiguate_merchant_id,
};

/// Path of the transactions collection under the merchant API root.
pub const TRANSACTIONS_PATH: &str = "/merchant/api/transactions";

// The signature is computed over the versioned URI, not the full URL.
const API_VERSION_PREFIX: &str = "/api/v1";

/// The narrow contract the checkout flows need from the payment processor. [`ArkPayApi`] is the
/// HTTP implementation; tests substitute a mock.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    /// Create a remote transaction. On a merchant-id collision (HTTP 400) the id is
    /// disambiguated with a `__<suffix>` tag and the call retried exactly once.
    async fn create_transaction(&self, request: NewTransactionRequest) -> Result<CreatedTransaction, ArkPayApiError>;

    /// Submit card details for an existing transaction (direct-card flow).
    async fn pay_transaction(
        &self,
        transaction_id: &str,
        request: PayTransactionRequest,
    ) -> Result<PayTransactionResponse, ArkPayApiError>;
}

#[derive(Clone)]
pub struct ArkPayApi {
    config: ArkPayConfig,
    client: Arc<Client>,
}

impl ArkPayApi {
    pub fn new(config: ArkPayConfig) -> Result<Self, ArkPayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| ArkPayApiError::Initialization(e.to_string()))?;
        headers.insert("X-Api-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ArkPayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    fn signing_uri(path: &str) -> String {
        format!("{API_VERSION_PREFIX}{path}")
    }

    /// POST a JSON body with the `Signature` header computed over the exact bytes sent.
    async fn post_signed<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ArkPayApiError> {
        let url = self.url(path);
        let payload = serde_json::to_vec(body).map_err(|e| ArkPayApiError::RequestError(e.to_string()))?;
        let signature = sign_request("POST", &Self::signing_uri(path), &payload, self.config.secret_key.reveal());
        trace!("💳️ POST {url}");
        let response = self
            .client
            .post(url)
            .header("Signature", signature)
            .body(payload)
            .send()
            .await
            .map_err(|e| ArkPayApiError::ResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ Query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ArkPayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let raw = response.text().await.map_err(|e| ArkPayApiError::ResponseError(e.to_string()))?;
            let message = serde_json::from_str::<ApiErrorBody>(&raw).map(|b| b.message).unwrap_or(raw);
            Err(ArkPayApiError::QueryError { status, message })
        }
    }

    async fn submit_transaction(
        &self,
        request: &NewTransactionRequest,
    ) -> Result<CreateTransactionResponse, ArkPayApiError> {
        debug!(
            "💳️ Creating transaction for merchant id {} ({} {})",
            request.merchant_transaction_id, request.amount, request.currency
        );
        self.post_signed(TRANSACTIONS_PATH, request).await
    }
}

impl PaymentProcessor for ArkPayApi {
    async fn create_transaction(&self, request: NewTransactionRequest) -> Result<CreatedTransaction, ArkPayApiError> {
        match self.submit_transaction(&request).await {
            Ok(response) => {
                info!("💳️ Created transaction {} for {}", response.transaction.id, request.merchant_transaction_id);
                Ok(CreatedTransaction {
                    transaction: response.transaction,
                    redirect_url: response.redirect_url,
                    merchant_transaction_id: request.merchant_transaction_id,
                })
            },
            Err(ArkPayApiError::QueryError { status: 400, message }) => {
                let retry_id = disambiguate_merchant_id(&request.merchant_transaction_id);
                info!(
                    "💳️ Merchant id {} was rejected upstream ({message}). Retrying once as {retry_id}",
                    request.merchant_transaction_id
                );
                let mut retry = request.clone();
                retry.merchant_transaction_id = retry_id.clone();
                match self.submit_transaction(&retry).await {
                    Ok(response) => {
                        info!("💳️ Created transaction {} for {retry_id}", response.transaction.id);
                        Ok(CreatedTransaction {
                            transaction: response.transaction,
                            redirect_url: response.redirect_url,
                            merchant_transaction_id: retry_id,
                        })
                    },
                    Err(ArkPayApiError::QueryError { status: 400, message }) => {
                        Err(ArkPayApiError::MerchantIdExhausted(format!("{retry_id}: {message}")))
                    },
                    Err(e) => Err(e),
                }
            },
            Err(e) => Err(e),
        }
    }

    async fn pay_transaction(
        &self,
        transaction_id: &str,
        request: PayTransactionRequest,
    ) -> Result<PayTransactionResponse, ArkPayApiError> {
        let path = format!("{TRANSACTIONS_PATH}/{transaction_id}/pay");
        debug!("💳️ Submitting card payment for transaction {transaction_id}");
        let response: PayTransactionResponse = self.post_signed(&path, &request).await?;
        info!("💳️ Card payment for {transaction_id} answered with status {}", response.status);
        Ok(response)
    }
}
