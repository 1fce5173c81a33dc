//! RAM framebuffer with change detection.
//!
//! On the device every tick draws into this buffer and [`FrameBuffer::flush`]
//! sends only the bounding box of changed pixels to the panel, so a streamed
//! region that repeats the previous frame costs no SPI traffic at all.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

const WIDTH: usize = DISPLAY_WIDTH_PX as usize;
const HEIGHT: usize = DISPLAY_HEIGHT_PX as usize;

/// Bounding box of pixels that changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn area(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.min_x as i32, self.min_y as i32),
            Size::new(
                (self.max_x - self.min_x + 1) as u32,
                (self.max_y - self.min_y + 1) as u32,
            ),
        )
    }
}

/// Heap-allocated 128x160 RGB565 buffer implementing `DrawTarget`.
pub struct FrameBuffer {
    pixels: Vec<Rgb565>,
    dirty: Option<DirtyRect>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a black framebuffer. The whole screen starts dirty so the
    /// first flush overwrites whatever the panel powered up with.
    pub fn new() -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; WIDTH * HEIGHT],
            dirty: Some(DirtyRect {
                min_x: 0,
                min_y: 0,
                max_x: WIDTH - 1,
                max_y: HEIGHT - 1,
            }),
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb565> {
        if x < WIDTH && y < HEIGHT {
            Some(self.pixels[y * WIDTH + x])
        } else {
            None
        }
    }

    /// Region that the next flush would send, if any.
    pub fn dirty_area(&self) -> Option<Rectangle> {
        self.dirty.map(|rect| rect.area())
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = y * WIDTH + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            match &mut self.dirty {
                Some(rect) => rect.expand(x, y),
                None => self.dirty = Some(DirtyRect::from_point(x, y)),
            }
        }
    }

    /// Send the dirty region to `display` and reset the dirty state.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(rect) = self.dirty.take() else {
            return Ok(());
        };

        let area = rect.area();
        debug!(
            "Flushing {}x{} at ({}, {})",
            area.size.width, area.size.height, rect.min_x, rect.min_y
        );

        let pixels = &self.pixels;
        let width = area.size.width as usize;
        let pixel_iter = (rect.min_y..=rect.max_y).flat_map(move |y| {
            let row_start = y * WIDTH + rect.min_x;
            pixels[row_start..row_start + width].iter().copied()
        });

        display.fill_contiguous(&area, pixel_iter)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if coord.x >= 0 && coord.y >= 0 && (coord.x as usize) < WIDTH && (coord.y as usize) < HEIGHT
            {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // Colours for off-screen pixels are consumed and dropped so the
        // on-screen ones stay aligned with the requested area.
        let mut colors = colors.into_iter();
        for row in 0..area.size.height as i32 {
            let y = area.top_left.y + row;
            for col in 0..area.size.width as i32 {
                let x = area.top_left.x + col;
                let Some(color) = colors.next() else {
                    return Ok(());
                };
                if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                    self.set_pixel(x as usize, y as usize, color);
                }
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let x_start = (area.top_left.x.max(0) as usize).min(WIDTH);
        let y_start = (area.top_left.y.max(0) as usize).min(HEIGHT);
        let x_end = (area.top_left.x.max(0) as usize)
            .saturating_add(area.size.width as usize)
            .min(WIDTH);
        let y_end = (area.top_left.y.max(0) as usize)
            .saturating_add(area.size.height as usize)
            .min(HEIGHT);

        for y in y_start..y_end {
            for x in x_start..x_end {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}
