use std::time::Duration;

use axum::{body::Body, http::HeaderMap, response::Response};
use reqwest::Client;

use crate::{ProxyError, UpstreamRequest, response::allow_any_origin};

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Sends built token requests upstream and relays whatever comes back.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
}

impl UpstreamClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ProxyError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http })
    }

    pub fn with_http_client(http: Client) -> Self {
        Self { http }
    }

    /// Single attempt. Any upstream status, including errors, is relayed as-is;
    /// only transport failures become `Err`.
    pub async fn forward(&self, request: UpstreamRequest) -> Result<Response, ProxyError> {
        let UpstreamRequest { url, headers, body } = request;
        let upstream = self
            .http
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let headers = relay_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        allow_any_origin(&mut response);
        Ok(response)
    }
}

fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
    headers
}
