//! Gateway authentication
//!
//! The API gateway verifies bearer tokens and forwards the caller's id in
//! `X-User-Id`. This middleware rejects tokens revoked through logout and
//! exposes the caller id to handlers through the `UserId` extractor.
//! Requests without a caller id pass through; handlers that need one fail
//! with 401 when extracting `UserId`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::error::AppError;
use crate::security::{bearer_token, TokenBlacklist};

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Caller id forwarded by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

pub struct GatewayAuthMiddleware {
    blacklist: TokenBlacklist,
}

impl GatewayAuthMiddleware {
    pub fn new(blacklist: TokenBlacklist) -> Self {
        Self { blacklist }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GatewayAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = GatewayAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GatewayAuthMiddlewareService {
            service: Rc::new(service),
            blacklist: self.blacklist.clone(),
        }))
    }
}

pub struct GatewayAuthMiddlewareService<S> {
    service: Rc<S>,
    blacklist: TokenBlacklist,
}

impl<S, B> Service<ServiceRequest> for GatewayAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let blacklist = self.blacklist.clone();

        Box::pin(async move {
            let revoked = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(bearer_token)
                .map(|token| blacklist.is_revoked(token))
                .unwrap_or(false);
            if revoked {
                tracing::warn!(path = %req.path(), "Rejected revoked token");
                return Err(Error::from(AppError::Unauthorized(
                    "token has been revoked".to_string(),
                )));
            }

            let user_id = req
                .headers()
                .get(USER_ID_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string);
            if let Some(user_id) = user_id {
                req.extensions_mut().insert(UserId(user_id));
            }

            service.call(req).await
        })
    }
}

impl actix_web::FromRequest for UserId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<UserId>() {
            Some(user_id) => ready(Ok(user_id.clone())),
            None => ready(Err(actix_web::Error::from(AppError::Unauthorized(
                "User not authenticated".to_string(),
            )))),
        }
    }
}
