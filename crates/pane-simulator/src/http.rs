//! Blocking HTTP transport for the desktop.
//!
//! The core awaits each fetch to completion anyway, so a blocking client
//! inside the async `fetch` is fine here.

use std::time::Duration;

use log::{debug, warn};
use pane_core::transport::{Transport, TransportError};
use reqwest::blocking::Client;

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Bare command tokens are sent to the base URL.
    fn resolve(&self, target: &str) -> String {
        if target.contains("://") {
            target.to_owned()
        } else {
            format!("{}/{}", self.base_url, target)
        }
    }
}

impl Transport for HttpTransport {
    async fn fetch(&mut self, target: &str, buf: &mut [u8]) -> Result<usize, TransportError> {
        let url = self.resolve(target);
        debug!("GET {} (budget {} bytes)", url, buf.len());

        let response = self.client.get(&url).send().map_err(|e| {
            warn!("GET {} failed: {}", url, e);
            TransportError::Failure
        })?;
        if !response.status().is_success() {
            warn!("GET {} returned {}", url, response.status());
            return Err(TransportError::Failure);
        }

        let body = response.bytes().map_err(|e| {
            warn!("Reading {} failed: {}", url, e);
            TransportError::Failure
        })?;
        if body.len() > buf.len() {
            return Err(TransportError::BufferOverrun {
                budget: buf.len(),
                received: body.len(),
            });
        }

        buf[..body.len()].copy_from_slice(&body);
        Ok(body.len())
    }
}
