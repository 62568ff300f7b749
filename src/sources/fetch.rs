//! Outbound transport.
//!
//! Every call to the vendor goes through [`Fetch`]: the login exchange,
//! candidate GETs and discovery GETs. The reqwest implementation applies the
//! configured per-call timeout.

use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use reqwest::{Client, Url};

use crate::config::vendor::VendorConfig;
use crate::error::{ProxyError, ProxyResult};

#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl UpstreamRequest {
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: HeaderMap::new(), body: None }
    }

    pub fn post_json(url: Url, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            method: Method::POST,
            url,
            headers,
            body: Some(Bytes::from(body.to_string())),
        }
    }

    /// GET against the vendor carrying the API key and bearer token.
    pub fn vendor_get(url: Url, vendor: &VendorConfig, token: &str, accept: &str) -> ProxyResult<Self> {
        Self::get(url)
            .header(&vendor.api_key_header, vendor.api_key()?)?
            .header("authorization", &format!("Bearer {}", token))?
            .header("accept", accept)
    }

    pub fn header(mut self, name: &str, value: &str) -> ProxyResult<Self> {
        let name = http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProxyError::Configuration(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProxyError::Configuration(format!("invalid value for header '{}': {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub trait Fetch: Send + Sync + 'static {
    fn fetch(
        &self,
        request: UpstreamRequest,
    ) -> impl std::future::Future<Output = ProxyResult<UpstreamResponse>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(vendor: &VendorConfig) -> ProxyResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(vendor.timeout_ms))
            .build()
            .map_err(|e| ProxyError::Configuration(format!("building HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, request: UpstreamRequest) -> ProxyResult<UpstreamResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        Ok(UpstreamResponse { status, content_type, body })
    }
}
