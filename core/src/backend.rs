//! Transport backends that execute `HttpRequest`s.
//!
//! # Design
//! `Backend` is the I/O seam: the requester builds plain-data requests and a
//! backend turns them into `HttpResponse`s. `UreqBackend` is the preconfigured
//! HTTP client (base URL, timeout, default headers, retry on connection
//! failures). A POST is only retried when it never reached the server. Non-2xx statuses are returned as data, never as `Err`, so status
//! interpretation stays with the caller. Tests substitute recording fakes.

use std::io;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::TransportConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Backend: Send + Sync {
    /// Execute `request` against the API server. `Err` only when no response
    /// was obtained at all.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking HTTP backend built on ureq.
pub struct UreqBackend {
    agent: ureq::Agent,
    base_url: String,
    default_headers: Vec<(String, String)>,
    retry: u32,
    retry_delay: Duration,
}

impl UreqBackend {
    pub fn new(base_url: &str, transport: &TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(transport.timeout()))
            .http_status_as_error(false)
            .build()
            .new_agent();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: transport.headers.clone(),
            retry: transport.retry,
            retry_delay: transport.retry_delay(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ureq::Error> {
        let url = format!("{}{}", self.base_url, request.path);
        let headers = self.default_headers.iter().chain(&request.headers);

        let mut response = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&url);
                for (k, v) in headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                builder.call()?
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&url);
                for (k, v) in headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                match &request.body {
                    Some(form) => {
                        let (content_type, body) = form.encode();
                        builder.content_type(content_type.as_str()).send(&body[..])?
                    }
                    None => builder.send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Backend for UreqBackend {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut attempt = 0;
        loop {
            match self.execute(request) {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry && is_retryable(request.method, &e) => {
                    attempt += 1;
                    warn!(
                        method = request.method.as_str(),
                        path = %request.path,
                        attempt,
                        error = %e,
                        "request failed, retrying"
                    );
                    thread::sleep(self.retry_delay);
                }
                Err(e) => return Err(ApiError::Transport(Box::new(e))),
            }
        }
    }
}

/// GETs are retried on any transport failure. POSTs only when the
/// connection was never established, so a write is not applied twice.
fn is_retryable(method: HttpMethod, error: &ureq::Error) -> bool {
    match method {
        HttpMethod::Get => true,
        HttpMethod::Post => match error {
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => true,
            ureq::Error::Io(e) => e.kind() == io::ErrorKind::ConnectionRefused,
            _ => false,
        },
    }
}
