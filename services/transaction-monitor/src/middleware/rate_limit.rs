use crate::metrics::HTTP_REQUESTS_TOTAL;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use std::future::{ready, Ready};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;

const UNLIMITED_PATHS: [&str; 2] = ["/health", "/metrics"];

/// Global request quota shared by all workers
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(GovernorRateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimiterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let method = req.method().to_string();
        let path = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());

        if !UNLIMITED_PATHS.contains(&req.path()) && self.limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded for path: {}", req.path());
            HTTP_REQUESTS_TOTAL
                .with_label_values(&[&method, &path, "429"])
                .inc();
            return Box::pin(async {
                Err(actix_web::error::ErrorTooManyRequests(
                    "Rate limit exceeded. Please try again later.",
                ))
            });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            HTTP_REQUESTS_TOTAL
                .with_label_values(&[&method, &path, res.status().as_str()])
                .inc();
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_quota_enforced_except_health() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimiter::new(1))
                .route("/api/ping", web::get().to(ok))
                .route("/health", web::get().to(ok)),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/api/ping").to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = test::try_call_service(&app, test::TestRequest::get().uri("/api/ping").to_request()).await;
        let err = second.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::TOO_MANY_REQUESTS);

        for _ in 0..3 {
            let health = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
            assert_eq!(health.status(), StatusCode::OK);
        }
    }
}
