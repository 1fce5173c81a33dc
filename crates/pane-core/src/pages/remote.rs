//! Server-rendered page
//!
//! Pulls the page image from the server region by region through the same
//! fetch and blit path the streaming mode uses, so a page can be designed on
//! the server and shown inside the local page ring. A long press sends
//! `{base}/{page}?action` and redraws.

use embassy_time::Duration;
use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use log::{debug, warn};

use super::page::{Capabilities, HeaderTheme, Page, PageContext, PageError, PageName, page_name};
use crate::display::DisplaySink;
use crate::display::colors::{COLOR_BLACK, COLOR_REMOTE_HEADER, COLOR_WHITE};
use crate::stream::{RegionBuffer, RegionFetch, RegionGeometry};
use crate::transport::{Endpoint, Transport, send_command};

const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

pub struct RemotePage {
    name: PageName,
    endpoint: Endpoint,
    geometry: RegionGeometry,
    period: Duration,
    buffer: Option<RegionBuffer>,
}

impl RemotePage {
    pub fn new(name: &str, endpoint: Endpoint, regions: u8) -> Self {
        Self {
            name: page_name(name),
            endpoint,
            geometry: RegionGeometry::full_screen(regions),
            period: DEFAULT_PERIOD,
            buffer: None,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

impl Page for RemotePage {
    fn name(&self) -> &str {
        &self.name
    }

    fn theme(&self) -> HeaderTheme {
        HeaderTheme {
            foreground: COLOR_WHITE,
            background: COLOR_REMOTE_HEADER,
        }
    }

    fn refresh_period(&self) -> Duration {
        self.period
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    async fn init<S: DisplaySink, T: Transport>(
        &mut self,
        _ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        self.buffer = Some(RegionBuffer::new(self.geometry));
        Ok(())
    }

    async fn deinit<S: DisplaySink, T: Transport>(
        &mut self,
        _ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        self.buffer = None;
        Ok(())
    }

    /// Failed regions are painted black and the first failure is returned
    /// once every region has been tried. A full-refresh sentinel stops the
    /// pass and clears everything from that region down.
    async fn render<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
        _force: bool,
    ) -> Result<(), PageError> {
        let buffer = self.buffer.as_mut().ok_or(PageError::NotInitialised)?;
        let mut first_error = None;

        for index in 0..self.geometry.regions {
            let target = self.endpoint.region(index)?;
            match buffer.fetch(ctx.transport, &target).await {
                RegionFetch::Pixels(len) => {
                    buffer.blit(ctx.sink, index, len)?;
                }
                RegionFetch::Blanked(e) => {
                    warn!("{} region {} failed: {}", self.name, index, e);
                    buffer.blit(ctx.sink, index, self.geometry.footprint())?;
                    first_error.get_or_insert(PageError::Transport(e));
                }
                RegionFetch::FullRefresh => {
                    debug!("{} region {} asked for a refresh", self.name, index);
                    let top = self.geometry.y_offset(index);
                    let stale = Rectangle::new(
                        Point::new(0, top as i32),
                        Size::new(self.geometry.width, self.geometry.height - top),
                    );
                    ctx.sink.fill_region(stale, COLOR_BLACK)?;
                    break;
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn action<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        let target = self.endpoint.action()?;
        send_command(ctx.transport, &target).await?;
        self.render(ctx, true).await
    }
}
