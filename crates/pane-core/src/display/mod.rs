//! Display sink abstraction.
//!
//! Pages, the header overlay and the frame streamer draw through
//! [`DisplaySink`], a small immediate-mode interface: filled rectangles, text
//! with the current colours and font, and rows of RGB888 pixels. The sink may
//! draw straight to the panel or into a RAM buffer; callers make no
//! assumption either way and call [`DisplaySink::present`] once per tick.

pub mod colors;
pub mod framebuffer;
pub mod graphics;

pub use framebuffer::FrameBuffer;
pub use graphics::GraphicsSink;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;
use embedded_hal::digital::OutputPin;
use thiserror_no_std::Error;

// ---------------------------------------------------------------------------
// Panel geometry
// ---------------------------------------------------------------------------

pub const DISPLAY_WIDTH_PX: u32 = 128;
pub const DISPLAY_HEIGHT_PX: u32 = 160;

/// Wire pixels are RGB888.
pub const BYTES_PER_PIXEL: usize = 3;

pub fn screen_bounds() -> Rectangle {
    Rectangle::new(
        Point::zero(),
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX),
    )
}

// ---------------------------------------------------------------------------
// Sink contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontId {
    Small,
    Default,
    Large,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display draw failed")]
    Draw,
    #[error("row {0} is outside the display")]
    RowOutOfBounds(u32),
    #[error("backlight control failed")]
    Backlight,
}

pub trait DisplaySink {
    fn size(&self) -> Size;

    fn set_foreground(&mut self, color: Rgb565);

    fn set_background(&mut self, color: Rgb565);

    fn set_font(&mut self, font: FontId);

    fn fill_region(&mut self, area: Rectangle, color: Rgb565) -> Result<(), DisplayError>;

    /// Draw `text` in the current font and colours, with the top of the text
    /// at `position.y` and aligned on `position.x`.
    fn draw_text(
        &mut self,
        text: &str,
        position: Point,
        alignment: Alignment,
    ) -> Result<(), DisplayError>;

    /// Draw `width` RGB888 pixels from `pixels` starting at `(0, y)`.
    fn blit_row(&mut self, y: u32, width: u32, pixels: &[u8]) -> Result<(), DisplayError>;

    fn fill_screen(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        let size = self.size();
        self.fill_region(Rectangle::new(Point::zero(), size), color)
    }

    /// Push whatever has been drawn since the last call to the panel.
    fn present(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

impl<S: DisplaySink> DisplaySink for &mut S {
    fn size(&self) -> Size {
        (**self).size()
    }

    fn set_foreground(&mut self, color: Rgb565) {
        (**self).set_foreground(color)
    }

    fn set_background(&mut self, color: Rgb565) {
        (**self).set_background(color)
    }

    fn set_font(&mut self, font: FontId) {
        (**self).set_font(font)
    }

    fn fill_region(&mut self, area: Rectangle, color: Rgb565) -> Result<(), DisplayError> {
        (**self).fill_region(area, color)
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: Point,
        alignment: Alignment,
    ) -> Result<(), DisplayError> {
        (**self).draw_text(text, position, alignment)
    }

    fn blit_row(&mut self, y: u32, width: u32, pixels: &[u8]) -> Result<(), DisplayError> {
        (**self).blit_row(y, width, pixels)
    }

    fn fill_screen(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        (**self).fill_screen(color)
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        (**self).present()
    }
}

// ---------------------------------------------------------------------------
// Backlight
// ---------------------------------------------------------------------------

pub trait Backlight {
    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError>;
}

/// Backlight switched by a single GPIO.
pub struct PinBacklight<P> {
    pin: P,
    active_high: bool,
}

impl<P: OutputPin> PinBacklight<P> {
    pub fn new(pin: P, active_high: bool) -> Self {
        Self { pin, active_high }
    }
}

impl<P: OutputPin> Backlight for PinBacklight<P> {
    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        let result = if on == self.active_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|_| DisplayError::Backlight)
    }
}
