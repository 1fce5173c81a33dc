//! Core page abstraction and the enum wrapper the scheduler stores.
//!
//! A page is one screen in the scheduler's ring. It is told when it becomes
//! active ([`Page::init`]), when it should draw ([`Page::render`]), when the
//! user long-presses ([`Page::action`]) and when it is switched away from
//! ([`Page::deinit`]). Content state belongs to the page and is rebuilt on
//! every `init`; nothing survives a `deinit`.
//!
//! Every page declares its [`Capabilities`] up front. The scheduler only
//! calls the hooks a page claims to support, so a static page can leave the
//! defaults in place.

use alloc::boxed::Box;

use embassy_time::Duration;
use embedded_graphics::pixelcolor::Rgb565;
use heapless::String;
use thiserror_no_std::Error;

use super::constants::PAGE_NAME_LEN;
use crate::display::{DisplayError, DisplaySink};
use crate::transport::{Transport, TransportError};

pub type PageName = String<PAGE_NAME_LEN>;

/// Copy `name` into a [`PageName`], dropping whatever does not fit.
pub fn page_name(name: &str) -> PageName {
    truncated(name)
}

/// Copy as many whole characters of `s` as fit into `N` bytes.
pub fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderTheme {
    pub foreground: Rgb565,
    pub background: Rgb565,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub init: bool,
    pub deinit: bool,
    pub render: bool,
    pub action: bool,
}

impl Capabilities {
    pub const RENDER_ONLY: Self = Self {
        init: false,
        deinit: false,
        render: true,
        action: false,
    };

    pub const LIFECYCLE: Self = Self {
        init: true,
        deinit: true,
        render: true,
        action: false,
    };

    pub const ALL: Self = Self {
        init: true,
        deinit: true,
        render: true,
        action: true,
    };
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    #[error("transport: {0}")]
    Transport(TransportError),
    #[error("display: {0}")]
    Display(DisplayError),
    #[error("response could not be decoded")]
    Decode,
    #[error("page used before init")]
    NotInitialised,
}

impl From<TransportError> for PageError {
    fn from(e: TransportError) -> Self {
        PageError::Transport(e)
    }
}

impl From<DisplayError> for PageError {
    fn from(e: DisplayError) -> Self {
        PageError::Display(e)
    }
}

/// The display and transport a page hook may use for the duration of the
/// call.
pub struct PageContext<'a, S, T> {
    pub sink: &'a mut S,
    pub transport: &'a mut T,
}

impl<'a, S, T> PageContext<'a, S, T> {
    pub fn new(sink: &'a mut S, transport: &'a mut T) -> Self {
        Self { sink, transport }
    }
}

// ---------------------------------------------------------------------------
// Page trait
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait Page {
    fn name(&self) -> &str;

    fn theme(&self) -> HeaderTheme;

    /// Time between scheduled renders.
    fn refresh_period(&self) -> Duration;

    fn capabilities(&self) -> Capabilities;

    /// Build content state. A failure keeps the page from becoming active.
    async fn init<S: DisplaySink, T: Transport>(
        &mut self,
        _ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        Ok(())
    }

    async fn deinit<S: DisplaySink, T: Transport>(
        &mut self,
        _ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        Ok(())
    }

    /// Draw the page. With `force` false a page may skip drawing when its
    /// content has not changed since the last render.
    async fn render<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
        force: bool,
    ) -> Result<(), PageError>;

    async fn action<S: DisplaySink, T: Transport>(
        &mut self,
        _ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blanket impl: Box<T> where T: Page
// ---------------------------------------------------------------------------

impl<P: Page> Page for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn theme(&self) -> HeaderTheme {
        (**self).theme()
    }

    fn refresh_period(&self) -> Duration {
        (**self).refresh_period()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    async fn init<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        (**self).init(ctx).await
    }

    async fn deinit<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        (**self).deinit(ctx).await
    }

    async fn render<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
        force: bool,
    ) -> Result<(), PageError> {
        (**self).render(ctx, force).await
    }

    async fn action<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        (**self).action(ctx).await
    }
}

// ---------------------------------------------------------------------------
// PageWrapper
// ---------------------------------------------------------------------------

/// Enum over the concrete pages the device ships with, so the scheduler can
/// hold a heterogeneous ring in a `heapless::Vec` without trait objects.
///
/// When adding a page, add a variant here and extend every match below.
pub enum PageWrapper {
    NowPlaying(Box<super::now_playing::NowPlayingPage>),
    Remote(Box<super::remote::RemotePage>),
    Notice(Box<super::notice::NoticePage>),
}

impl Page for PageWrapper {
    fn name(&self) -> &str {
        match self {
            PageWrapper::NowPlaying(page) => page.name(),
            PageWrapper::Remote(page) => page.name(),
            PageWrapper::Notice(page) => page.name(),
        }
    }

    fn theme(&self) -> HeaderTheme {
        match self {
            PageWrapper::NowPlaying(page) => page.theme(),
            PageWrapper::Remote(page) => page.theme(),
            PageWrapper::Notice(page) => page.theme(),
        }
    }

    fn refresh_period(&self) -> Duration {
        match self {
            PageWrapper::NowPlaying(page) => page.refresh_period(),
            PageWrapper::Remote(page) => page.refresh_period(),
            PageWrapper::Notice(page) => page.refresh_period(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self {
            PageWrapper::NowPlaying(page) => page.capabilities(),
            PageWrapper::Remote(page) => page.capabilities(),
            PageWrapper::Notice(page) => page.capabilities(),
        }
    }

    async fn init<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        match self {
            PageWrapper::NowPlaying(page) => page.init(ctx).await,
            PageWrapper::Remote(page) => page.init(ctx).await,
            PageWrapper::Notice(page) => page.init(ctx).await,
        }
    }

    async fn deinit<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        match self {
            PageWrapper::NowPlaying(page) => page.deinit(ctx).await,
            PageWrapper::Remote(page) => page.deinit(ctx).await,
            PageWrapper::Notice(page) => page.deinit(ctx).await,
        }
    }

    async fn render<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
        force: bool,
    ) -> Result<(), PageError> {
        match self {
            PageWrapper::NowPlaying(page) => page.render(ctx, force).await,
            PageWrapper::Remote(page) => page.render(ctx, force).await,
            PageWrapper::Notice(page) => page.render(ctx, force).await,
        }
    }

    async fn action<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        match self {
            PageWrapper::NowPlaying(page) => page.action(ctx).await,
            PageWrapper::Remote(page) => page.action(ctx).await,
            PageWrapper::Notice(page) => page.action(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_name_truncates_to_sixteen_bytes() {
        assert_eq!(page_name("Spotify").as_str(), "Spotify");
        assert_eq!(
            page_name("A very long page name").as_str(),
            "A very long page"
        );
        // Multi-byte characters are never split.
        assert_eq!(page_name("ééééééééé").len(), 16);
    }
}
