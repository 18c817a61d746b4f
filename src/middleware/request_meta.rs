use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Client metadata recorded on audit entries.
///
/// The client address comes from `X-Forwarded-For` (first hop); both fields
/// fall back to `"unknown"` when the header is absent.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip_address: String,
    pub user_agent: String,
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(RequestMeta {
            ip_address,
            user_agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> RequestMeta {
        let (mut parts, _) = request.into_parts();
        RequestMeta::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_request_meta_from_headers() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("user-agent", "integration-test/1.0")
            .body(())
            .unwrap();

        let meta = extract(request).await;
        assert_eq!(meta.ip_address, "203.0.113.7");
        assert_eq!(meta.user_agent, "integration-test/1.0");
    }

    #[tokio::test]
    async fn test_request_meta_defaults_to_unknown() {
        let request = Request::builder().body(()).unwrap();

        let meta = extract(request).await;
        assert_eq!(meta.ip_address, "unknown");
        assert_eq!(meta.user_agent, "unknown");
    }
}
