//! Request target naming.
//!
//! Region and action requests are addressed relative to the configured page:
//! `{base}/{page}?region={i}` and `{base}/{page}?action`. Navigation commands
//! forwarded from the button use the tokens `page_next`, `page_last` and
//! `page_action`, either appended to the base URL or sent bare for servers
//! that route on the token alone. Bare servers serve a one-region frame as
//! `page_get_frame`.

use core::fmt::Write;

use heapless::String;
use serde::Deserialize;

use super::TransportError;
use crate::config::{BASE_URL_LEN, PAGE_ID_LEN, ServerConfig};

pub const TARGET_LEN: usize = 160;

pub type Target = String<TARGET_LEN>;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStyle {
    /// `{base}/{token}`
    #[default]
    Url,
    /// `{token}`
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NextPage,
    PreviousPage,
    PageAction,
    GetFrame,
}

impl Command {
    pub const fn token(self) -> &'static str {
        match self {
            Command::NextPage => "page_next",
            Command::PreviousPage => "page_last",
            Command::PageAction => "page_action",
            Command::GetFrame => "page_get_frame",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String<BASE_URL_LEN>,
    page: String<PAGE_ID_LEN>,
    style: RequestStyle,
}

impl Endpoint {
    pub fn new(base: &str, page: &str) -> Result<Self, TransportError> {
        let mut base_url = String::new();
        base_url
            .push_str(base.trim_end_matches('/'))
            .map_err(|_| TransportError::InvalidTarget(BASE_URL_LEN))?;
        let mut page_id = String::new();
        page_id
            .push_str(page)
            .map_err(|_| TransportError::InvalidTarget(PAGE_ID_LEN))?;
        Ok(Self {
            base: base_url,
            page: page_id,
            style: RequestStyle::Url,
        })
    }

    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            base: String::try_from(server.base_url.trim_end_matches('/')).unwrap_or_default(),
            page: server.page.clone(),
            style: RequestStyle::Url,
        }
    }

    pub fn with_style(mut self, style: RequestStyle) -> Self {
        self.style = style;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn region(&self, index: u8) -> Result<Target, TransportError> {
        build(format_args!("{}/{}?region={}", self.base, self.page, index))
    }

    /// Target for region `index` of a frame split into `regions`. A bare-style
    /// server hands out a one-region frame through `page_get_frame`.
    pub fn frame_region(&self, index: u8, regions: u8) -> Result<Target, TransportError> {
        if self.style == RequestStyle::Bare && regions == 1 {
            return self.command(Command::GetFrame);
        }
        self.region(index)
    }

    pub fn action(&self) -> Result<Target, TransportError> {
        build(format_args!("{}/{}?action", self.base, self.page))
    }

    /// A path under the base URL, for pages that read their own resources.
    pub fn resource(&self, path: &str) -> Result<Target, TransportError> {
        build(format_args!("{}/{}", self.base, path.trim_start_matches('/')))
    }

    pub fn command(&self, command: Command) -> Result<Target, TransportError> {
        match self.style {
            RequestStyle::Url => build(format_args!("{}/{}", self.base, command.token())),
            RequestStyle::Bare => build(format_args!("{}", command.token())),
        }
    }
}

fn build(args: core::fmt::Arguments<'_>) -> Result<Target, TransportError> {
    let mut target = Target::new();
    target
        .write_fmt(args)
        .map_err(|_| TransportError::InvalidTarget(TARGET_LEN))?;
    Ok(target)
}
