//! Webhook signature middleware for Actix Web.
//!
//! ArkPay signs every webhook call with an HMAC-SHA256 over `"POST {webhook_url}\n{body}"`, keyed with the
//! merchant's secret key, and sends the lowercase hex digest in the `Signature` header. The `webhook_url` is the
//! full public URL the processor has on record, which is why it comes from configuration rather than from the
//! request (a reverse proxy may have rewritten the path by the time the request arrives here).
//!
//! Wrap the webhook scope with this middleware so that unauthenticated requests are rejected before any handler
//! runs. Rejections use the processor-facing 401 contract; see [`ServerError::SignatureMismatch`].

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorBadRequest,
    web,
    Error,
};
use apg_common::{signature::verify_signature, Secret};
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::errors::ServerError;

/// The header ArkPay sends the request signature in.
pub const SIGNATURE_HEADER: &str = "Signature";

pub struct SignatureMiddlewareFactory {
    signature_header: String,
    key: Secret<String>,
    webhook_url: String,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(signature_header: &str, key: Secret<String>, webhook_url: &str, enabled: bool) -> Self {
        SignatureMiddlewareFactory {
            signature_header: signature_header.into(),
            key,
            webhook_url: webhook_url.into(),
            enabled,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            signature_header: self.signature_header.clone(),
            key: self.key.clone(),
            webhook_url: self.webhook_url.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    signature_header: String,
    key: Secret<String>,
    webhook_url: String,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        let signature_header = self.signature_header.clone();
        let webhook_url = self.webhook_url.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking signature for request");
            if !enabled {
                trace!("🔐️ Signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let provided = req
                .headers()
                .get(&signature_header)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No signature found in request. Denying access.");
                    Error::from(ServerError::SignatureMismatch)
                })?
                .to_string();
            let validated = verify_signature("POST", &webhook_url, data.as_ref(), &secret, &provided);
            if validated {
                trace!("🔐️ Signature check for request ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid signature found in request. Denying access.");
                Err(ServerError::SignatureMismatch.into())
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
