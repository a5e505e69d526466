//! Transport seam between the fetcher and the network.
//!
//! The fetcher only needs "GET this URL with these parameters and a bearer credential, give me
//! the body". `HttpTransport` does that with reqwest; tests substitute scripted transports.
//! Retry or backoff, if wanted, belongs in a wrapper implementing `PageTransport`.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use thiserror::Error;
use tracing::{debug, warn};

use crate::request::ParamSet;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Other(String),
}

/// One page request: target URL, bearer credential, query parameters.
#[derive(Clone, Debug)]
pub struct PageRequest {
    pub url: String,
    pub credential: String,
    pub params: ParamSet,
}

impl PageRequest {
    /// URL with the encoded query string appended.
    pub fn full_url(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, sep, self.params.to_query_string())
    }

    fn bearer(&self) -> Result<HeaderValue, TransportError> {
        HeaderValue::from_str(&format!("Bearer {}", self.credential))
            .map_err(|_| TransportError::Other("credential contains characters not allowed in a header".into()))
    }
}

/// Fetch one page body. Each call is a single suspension point.
pub trait PageTransport: Send + Sync {
    fn get_page(&self, req: &PageRequest) -> impl Future<Output = Result<String, TransportError>> + Send;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// `timeout` bounds each request; without it a stalled server stalls the caller.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self { client: builder.build()? })
    }

    /// Probe `{api_url}meta/bases` to see whether the credential is accepted.
    pub async fn check_token(&self, api_url: &str, credential: &str) -> Result<bool, TransportError> {
        let req = PageRequest { url: format!("{}meta/bases", api_url), credential: credential.to_string(), params: ParamSet::new() };
        let resp = self.client.get(req.full_url()).header(AUTHORIZATION, req.bearer()?).send().await?;
        let ok = resp.status().is_success();
        if !ok {
            warn!(target: "mesonet_ingest::transport", status=%resp.status(), "credential rejected by remote API");
        }
        Ok(ok)
    }
}

impl PageTransport for HttpTransport {
    async fn get_page(&self, req: &PageRequest) -> Result<String, TransportError> {
        let url = req.full_url();
        debug!(target: "mesonet_ingest::transport", url=%url, "GET");
        let resp = self.client.get(url).header(AUTHORIZATION, req.bearer()?).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16(), body });
        }
        Ok(body)
    }
}
