//! Forwarding to the real upstream API.
//!
//! # Responsibilities
//! - Rewrite the inbound path and query onto the configured target base URL
//! - Forward end-to-end headers, drop hop-by-hop ones
//! - Route through an optional forward proxy
//!
//! # Design Decisions
//! - Redirects are returned to the client, never followed
//! - Ambient `HTTP_PROXY`-style variables are ignored; only config decides
//! - Request bodies are buffered before sending; response bodies stream back

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, Uri};
use thiserror::Error;
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers meaningful only for a single transport-level connection.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),

    #[error("upstream client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP client bound to one upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    target: Url,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, UpstreamError> {
        let target = Url::parse(&config.target_url)?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy();
        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
            tracing::info!(proxy = %proxy_url, "Forwarding upstream calls through proxy");
        }

        Ok(Self {
            client: builder.build()?,
            target,
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Forward `request` upstream and return the response with a streaming body.
    pub async fn send(
        &self,
        request: Request<Body>,
        peer: Option<SocketAddr>,
    ) -> Result<Response<Body>, UpstreamError> {
        let (parts, body) = request.into_parts();
        let url = upstream_url(&self.target, &parts.uri);

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(peer) = peer {
            append_forwarded_for(&mut headers, peer);
        }

        let body = axum::body::to_bytes(body, usize::MAX).await?;

        let response = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let mut response: Response<reqwest::Body> = response.into();
        strip_hop_by_hop(response.headers_mut());
        Ok(response.map(Body::new))
    }
}

/// Join the target base path with the inbound path and carry the query over.
pub fn upstream_url(target: &Url, uri: &Uri) -> Url {
    let mut url = target.clone();
    let base = target.path().trim_end_matches('/');
    let path = uri.path().trim_start_matches('/');
    url.set_path(&format!("{base}/{path}"));
    url.set_query(uri.query());
    url
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by `Connection` are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let ip = peer.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {ip}"),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(target: &str, uri: &str) -> String {
        upstream_url(&Url::parse(target).unwrap(), &uri.parse().unwrap()).to_string()
    }

    #[test]
    fn joins_paths_with_single_slash() {
        assert_eq!(url("http://api:8080", "/orders"), "http://api:8080/orders");
        assert_eq!(url("http://api:8080/v1/", "/orders"), "http://api:8080/v1/orders");
        assert_eq!(url("https://api.example.com/v1", "/"), "https://api.example.com/v1/");
    }

    #[test]
    fn keeps_query_and_drops_target_query() {
        assert_eq!(
            url("http://api:8080/?x=1", "/orders?page=2&size=10"),
            "http://api:8080/orders?page=2&size=10"
        );
        assert_eq!(url("http://api:8080/?x=1", "/orders"), "http://api:8080/orders");
    }

    #[test]
    fn strips_hop_by_hop_and_connection_named_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn appends_to_existing_forwarded_for() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1:5000".parse().unwrap());
        append_forwarded_for(&mut headers, "10.0.0.2:5000".parse().unwrap());
        assert_eq!(headers[X_FORWARDED_FOR], "10.0.0.1, 10.0.0.2");
    }

    #[test]
    fn rejects_bad_proxy_url() {
        let config = UpstreamConfig {
            target_url: "http://api:8080".into(),
            proxy_url: Some("http://[not-ipv6]:3128".into()),
        };
        assert!(UpstreamClient::new(&config, &TimeoutConfig::default()).is_err());
    }
}
