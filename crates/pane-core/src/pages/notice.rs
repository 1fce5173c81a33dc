//! Static notice page
//!
//! Displays a centered title and message. Used for the placeholder page in
//! the default ring and for status screens that need no network access.

use embassy_time::Duration;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Alignment;

use super::constants::{CENTER_X_PX, CENTER_Y_PX};
use super::page::{Capabilities, HeaderTheme, Page, PageContext, PageError, PageName, page_name};
use crate::display::colors::{COLOR_BLACK, COLOR_WHITE};
use crate::display::{DisplaySink, FontId};
use crate::transport::Transport;

const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

pub struct NoticePage {
    name: PageName,
    theme: HeaderTheme,
    title: &'static str,
    message: &'static str,
    period: Duration,
}

impl NoticePage {
    pub fn new(name: &str, title: &'static str, message: &'static str) -> Self {
        Self {
            name: page_name(name),
            theme: HeaderTheme {
                foreground: COLOR_WHITE,
                background: COLOR_BLACK,
            },
            title,
            message,
            period: DEFAULT_PERIOD,
        }
    }

    /// The placeholder page shipped in the default ring.
    pub fn placeholder() -> Self {
        Self::new("Template", "Template Page", "[|:)")
    }

    pub fn with_theme(mut self, theme: HeaderTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

impl Page for NoticePage {
    fn name(&self) -> &str {
        &self.name
    }

    fn theme(&self) -> HeaderTheme {
        self.theme
    }

    fn refresh_period(&self) -> Duration {
        self.period
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::RENDER_ONLY
    }

    async fn render<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
        _force: bool,
    ) -> Result<(), PageError> {
        let sink = &mut *ctx.sink;
        sink.fill_screen(COLOR_BLACK)?;
        sink.set_foreground(COLOR_WHITE);
        sink.set_background(COLOR_BLACK);

        sink.set_font(FontId::Default);
        sink.draw_text(
            self.title,
            Point::new(CENTER_X_PX, CENTER_Y_PX - 30),
            Alignment::Center,
        )?;

        sink.set_font(FontId::Large);
        sink.draw_text(self.message, Point::new(CENTER_X_PX, CENTER_Y_PX), Alignment::Center)?;
        Ok(())
    }
}
