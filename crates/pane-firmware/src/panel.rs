//! Display sink for the SPI panel.
//!
//! Drawing goes into a RAM [`FrameBuffer`]; [`DisplaySink::present`] pushes
//! the dirty area to the panel in one transfer, so a page never shows half
//! drawn.

use core::fmt::Debug;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;
use log::warn;
use pane_core::display::{DisplayError, DisplaySink, FontId, FrameBuffer, GraphicsSink};

pub struct PanelSink<P> {
    frame: GraphicsSink<FrameBuffer>,
    panel: P,
}

impl<P> PanelSink<P>
where
    P: DrawTarget<Color = Rgb565>,
    P::Error: Debug,
{
    pub fn new(panel: P) -> Self {
        Self {
            frame: GraphicsSink::new(FrameBuffer::new()),
            panel,
        }
    }
}

impl<P> DisplaySink for PanelSink<P>
where
    P: DrawTarget<Color = Rgb565>,
    P::Error: Debug,
{
    fn size(&self) -> Size {
        self.frame.size()
    }

    fn set_foreground(&mut self, color: Rgb565) {
        self.frame.set_foreground(color);
    }

    fn set_background(&mut self, color: Rgb565) {
        self.frame.set_background(color);
    }

    fn set_font(&mut self, font: FontId) {
        self.frame.set_font(font);
    }

    fn fill_region(&mut self, area: Rectangle, color: Rgb565) -> Result<(), DisplayError> {
        self.frame.fill_region(area, color)
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: Point,
        alignment: Alignment,
    ) -> Result<(), DisplayError> {
        self.frame.draw_text(text, position, alignment)
    }

    fn blit_row(&mut self, y: u32, width: u32, pixels: &[u8]) -> Result<(), DisplayError> {
        self.frame.blit_row(y, width, pixels)
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        self.frame.target_mut().flush(&mut self.panel).map_err(|e| {
            warn!("Panel flush failed: {:?}", e);
            DisplayError::Draw
        })
    }
}
