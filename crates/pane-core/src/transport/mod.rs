//! Request/response contract between the device and the content server.
//!
//! Everything the device shows is pulled with [`Transport::fetch`]: a target
//! string and a caller-owned buffer whose length is the byte budget for the
//! response. Implementations live outside the core (HTTP over embassy-net on
//! the device, a blocking HTTP client in the simulator, scripted fakes in the
//! tests); callers go through [`fetch_into`], which applies the overrun and
//! in-band failure rules the same way for every implementation.

pub mod endpoint;

pub use endpoint::{Command, Endpoint, RequestStyle, TARGET_LEN, Target};

use log::debug;
use thiserror_no_std::Error;

/// Body the server sends in place of content when it could not produce any.
pub const FAILURE_LITERAL: &[u8] = b"Failure";

/// Response buffer for navigation and action commands.
pub const COMMAND_RESPONSE_BYTES: usize = 32;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Connection error, non-2xx status, or a `Failure` body.
    #[error("transport failure")]
    Failure,
    #[error("response of {received} bytes exceeds the {budget} byte budget")]
    BufferOverrun { budget: usize, received: usize },
    #[error("request target does not fit in {0} bytes")]
    InvalidTarget(usize),
}

/// A blocking-per-call request/response channel.
///
/// `buf.len()` is the budget. Implementations write the body into `buf` and
/// return its length, or report [`TransportError::BufferOverrun`] when the
/// server has more bytes than fit. An implementation that cannot tell the
/// difference may also return a length larger than the budget; [`fetch_into`]
/// turns that into an overrun.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn fetch(&mut self, target: &str, buf: &mut [u8]) -> Result<usize, TransportError>;
}

impl<T: Transport> Transport for &mut T {
    async fn fetch(&mut self, target: &str, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).fetch(target, buf).await
    }
}

/// Fetch `target` into `buf` and return the body slice.
///
/// A body equal to [`FAILURE_LITERAL`] is reported as
/// [`TransportError::Failure`].
pub async fn fetch_into<'b, T: Transport>(
    transport: &mut T,
    target: &str,
    buf: &'b mut [u8],
) -> Result<&'b [u8], TransportError> {
    let budget = buf.len();
    let received = transport.fetch(target, &mut *buf).await?;
    if received > budget {
        return Err(TransportError::BufferOverrun { budget, received });
    }

    let buf: &'b [u8] = buf;
    let body = &buf[..received];
    if is_failure_body(body) {
        debug!("{} answered with the failure literal", target);
        return Err(TransportError::Failure);
    }
    Ok(body)
}

/// Send a command whose response carries no content beyond success/failure.
pub async fn send_command<T: Transport>(
    transport: &mut T,
    target: &str,
) -> Result<(), TransportError> {
    let mut response = [0u8; COMMAND_RESPONSE_BYTES];
    fetch_into(transport, target, &mut response).await.map(|_| ())
}

pub fn is_failure_body(body: &[u8]) -> bool {
    body == FAILURE_LITERAL
}
