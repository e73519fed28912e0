//! Webhook signature middleware for Actix Web.
//!
//! Stripe signs every webhook delivery over the raw request body (see [`crate::helpers`] for the scheme), so the
//! signature must be checked before the body is deserialized. Wrap the webhook resource with this middleware;
//! the body is re-attached to the request after verification so the handler can extract it as usual.
//!
//! A missing or invalid signature is rejected with a 400 response, matching what Stripe expects so that it
//! retries the delivery.

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
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use tsg_common::Secret;

use crate::helpers::verify_signature;

pub struct SignatureMiddlewareFactory {
    signature_header: String,
    secret: Secret<String>,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(signature_header: &str, secret: Secret<String>, enabled: bool) -> Self {
        SignatureMiddlewareFactory { signature_header: signature_header.into(), secret, enabled }
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
            secret: self.secret.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    signature_header: String,
    secret: Secret<String>,
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
        let secret = self.secret.reveal().clone();
        let signature_header = self.signature_header.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for request");
            if !enabled {
                trace!("🔐️ Signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let header_value = req
                .headers()
                .get(&signature_header)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
                .ok_or_else(|| {
                    warn!("🔐️ No webhook signature found in request. Denying access.");
                    ErrorBadRequest("No webhook signature found.")
                })?;
            let validated = verify_signature(&secret, &header_value, data.as_ref());
            if validated {
                trace!("🔐️ Signature check for request ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature found in request. Denying access.");
                Err(ErrorBadRequest("Invalid webhook signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
