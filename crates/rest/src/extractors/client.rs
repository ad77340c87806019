use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::USER_AGENT, request::Parts},
};

/// Header set by reverse proxies with the originating client address.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Single-address variant of [`X_FORWARDED_FOR`].
pub const X_REAL_IP: &str = "x-real-ip";

/// Caller address and user agent, recorded with audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client IP address, if a proxy reported one.
    pub ip_address: Option<String>,
    /// The `User-Agent` header.
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Reads client details from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let ip_address = header(X_FORWARDED_FOR)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .or_else(|| header(X_REAL_IP))
            .map(String::from);

        Self {
            ip_address,
            user_agent: header(USER_AGENT.as_str()).map(String::from),
        }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1, 172.16.0.1"));
        headers.insert(X_REAL_IP, HeaderValue::from_static("192.168.1.1"));
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.4"));

        let info = ClientInfo::from_headers(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.4"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REAL_IP, HeaderValue::from_static("192.168.1.1"));
        let info = ClientInfo::from_headers(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("192.168.1.1"));
        assert!(info.user_agent.is_none());
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(ClientInfo::from_headers(&HeaderMap::new()), ClientInfo::default());
    }
}
