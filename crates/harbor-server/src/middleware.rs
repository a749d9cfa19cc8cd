use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use harbor_core::TriggerSource;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shared-secret check for the batch trigger endpoint.
#[derive(Clone)]
pub struct CronAuth {
    secret: Option<Arc<str>>,
}

impl std::fmt::Debug for CronAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronAuth")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl CronAuth {
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        if secret.is_none() {
            tracing::warn!("CRON_SECRET not set; batch trigger endpoint is open");
        }
        Self {
            secret: secret.map(Arc::from),
        }
    }

    /// Decides whether a trigger is allowed and how it should be recorded.
    ///
    /// `?manual=true` always passes. With no secret configured every call
    /// passes as manual. Otherwise the bearer token must equal the secret.
    pub fn authorize(&self, header: Option<&HeaderValue>, manual: bool) -> Option<TriggerSource> {
        if manual {
            return Some(TriggerSource::Manual);
        }
        let Some(secret) = &self.secret else {
            return Some(TriggerSource::Manual);
        };
        let token = extract_bearer_token(header)?;
        if bool::from(token.as_bytes().ct_eq(secret.as_bytes())) {
            Some(TriggerSource::Cron)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "rate limit exceeded",
                },
            }),
        )
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn matching_secret_authorizes_as_cron() {
        let auth = CronAuth::new(Some("s3cret"));
        let header = HeaderValue::from_static("Bearer s3cret");
        assert_eq!(
            auth.authorize(Some(&header), false),
            Some(TriggerSource::Cron)
        );
    }

    #[test]
    fn wrong_or_missing_secret_is_rejected() {
        let auth = CronAuth::new(Some("s3cret"));
        let wrong = HeaderValue::from_static("Bearer s3cre");
        assert_eq!(auth.authorize(Some(&wrong), false), None);
        assert_eq!(auth.authorize(None, false), None);
    }

    #[test]
    fn manual_flag_bypasses_secret() {
        let auth = CronAuth::new(Some("s3cret"));
        assert_eq!(auth.authorize(None, true), Some(TriggerSource::Manual));
    }

    #[test]
    fn unset_secret_leaves_endpoint_open() {
        let auth = CronAuth::new(None);
        assert_eq!(auth.authorize(None, false), Some(TriggerSource::Manual));
    }

    #[test]
    fn debug_redacts_secret() {
        let auth = CronAuth::new(Some("s3cret"));
        assert!(!format!("{auth:?}").contains("s3cret"));
    }
}
