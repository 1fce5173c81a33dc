//! HTTP transport over the embassy-net stack.
//!
//! Every fetch is a plain `GET` with the response body read straight into the
//! caller's buffer. Any connection error or non-2xx status is reported as
//! [`TransportError::Failure`]; the core decides what that means for the
//! screen.

use alloc::boxed::Box;
use alloc::vec;
use core::fmt::Write;

use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use heapless::String;
use log::{debug, warn};
use pane_core::transport::{TARGET_LEN, Target, Transport, TransportError};
use reqwless::client::HttpClient;
use reqwless::request::Method;

pub const TCP_SOCKETS: usize = 1;
pub const TCP_TX_BYTES: usize = 1024;
pub const TCP_RX_BYTES: usize = 4096;

/// Status line and headers only; the body goes to the caller's buffer.
pub const HEADER_BUFFER_BYTES: usize = 2048;

pub type NetTcpClient<'a> = TcpClient<'a, TCP_SOCKETS, TCP_TX_BYTES, TCP_RX_BYTES>;
pub type NetTcpState = TcpClientState<TCP_SOCKETS, TCP_TX_BYTES, TCP_RX_BYTES>;

pub struct HttpTransport<'a> {
    client: HttpClient<'a, NetTcpClient<'a>, DnsSocket<'a>>,
    base_url: String<{ pane_core::config::BASE_URL_LEN }>,
    header_buf: Box<[u8]>,
}

impl<'a> HttpTransport<'a> {
    /// `base_url` is used for bare command tokens, which carry no host.
    pub fn new(tcp: &'a NetTcpClient<'a>, dns: &'a DnsSocket<'a>, base_url: &str) -> Self {
        let mut base = String::new();
        if base.push_str(base_url.trim_end_matches('/')).is_err() {
            warn!("Base URL does not fit: {}", base_url);
        }
        Self {
            client: HttpClient::new(tcp, dns),
            base_url: base,
            header_buf: vec![0u8; HEADER_BUFFER_BYTES].into_boxed_slice(),
        }
    }

    fn resolve(&self, target: &str) -> Result<Target, TransportError> {
        let mut url = Target::new();
        let written = if target.contains("://") {
            url.push_str(target).map_err(|_| ())
        } else {
            write!(url, "{}/{}", self.base_url, target).map_err(|_| ())
        };
        written.map_err(|_| TransportError::InvalidTarget(TARGET_LEN))?;
        Ok(url)
    }
}

fn request_failed(url: &str, e: reqwless::Error) -> TransportError {
    warn!("GET {} failed: {:?}", url, e);
    TransportError::Failure
}

impl Transport for HttpTransport<'_> {
    async fn fetch(&mut self, target: &str, buf: &mut [u8]) -> Result<usize, TransportError> {
        let url = self.resolve(target)?;
        let budget = buf.len();
        debug!("GET {} (budget {} bytes)", url, budget);

        let mut request = self
            .client
            .request(Method::GET, &url)
            .await
            .map_err(|e| request_failed(&url, e))?;
        let response = request
            .send(&mut self.header_buf)
            .await
            .map_err(|e| request_failed(&url, e))?;

        if !response.status.is_successful() {
            warn!("GET {} returned {:?}", url, response.status);
            return Err(TransportError::Failure);
        }
        if let Some(length) = response.content_length
            && length > budget
        {
            return Err(TransportError::BufferOverrun {
                budget,
                received: length,
            });
        }

        let mut reader = response.body().reader();
        reader.read_to_end(buf).await.map_err(|e| match e {
            reqwless::Error::BufferTooSmall => TransportError::BufferOverrun {
                budget,
                received: budget + 1,
            },
            other => request_failed(&url, other),
        })
    }
}
