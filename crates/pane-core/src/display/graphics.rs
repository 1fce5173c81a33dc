//! [`DisplaySink`] on top of any embedded-graphics `DrawTarget`.

use core::fmt::Debug;

use embedded_graphics::Drawable;
use embedded_graphics::mono_font::ascii::{FONT_5X8, FONT_6X10, FONT_10X20};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use log::warn;

use super::colors::{COLOR_BLACK, COLOR_WHITE};
use super::{BYTES_PER_PIXEL, DisplayError, DisplaySink, FontId};

fn mono_font(font: FontId) -> &'static MonoFont<'static> {
    match font {
        FontId::Small => &FONT_5X8,
        FontId::Default => &FONT_6X10,
        FontId::Large => &FONT_10X20,
    }
}

pub struct GraphicsSink<D> {
    target: D,
    foreground: Rgb565,
    background: Rgb565,
    font: FontId,
}

impl<D> GraphicsSink<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    /// White default-font text on black until told otherwise.
    pub fn new(target: D) -> Self {
        Self {
            target,
            foreground: COLOR_WHITE,
            background: COLOR_BLACK,
            font: FontId::Default,
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    pub fn into_inner(self) -> D {
        self.target
    }
}

fn draw_failed<E: Debug>(e: E) -> DisplayError {
    warn!("Draw target error: {:?}", e);
    DisplayError::Draw
}

impl<D> DisplaySink for GraphicsSink<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    fn size(&self) -> Size {
        self.target.bounding_box().size
    }

    fn set_foreground(&mut self, color: Rgb565) {
        self.foreground = color;
    }

    fn set_background(&mut self, color: Rgb565) {
        self.background = color;
    }

    fn set_font(&mut self, font: FontId) {
        self.font = font;
    }

    fn fill_region(&mut self, area: Rectangle, color: Rgb565) -> Result<(), DisplayError> {
        self.target.fill_solid(&area, color).map_err(draw_failed)
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: Point,
        alignment: Alignment,
    ) -> Result<(), DisplayError> {
        let character_style = MonoTextStyleBuilder::new()
            .font(mono_font(self.font))
            .text_color(self.foreground)
            .background_color(self.background)
            .build();
        let text_style = TextStyleBuilder::new()
            .alignment(alignment)
            .baseline(Baseline::Top)
            .build();

        Text::with_text_style(text, position, character_style, text_style)
            .draw(&mut self.target)
            .map(|_| ())
            .map_err(draw_failed)
    }

    fn blit_row(&mut self, y: u32, width: u32, pixels: &[u8]) -> Result<(), DisplayError> {
        let size = self.size();
        if y >= size.height {
            return Err(DisplayError::RowOutOfBounds(y));
        }

        let count = (width as usize)
            .min(pixels.len() / BYTES_PER_PIXEL)
            .min(size.width as usize);
        if count == 0 {
            return Ok(());
        }

        let area = Rectangle::new(Point::new(0, y as i32), Size::new(count as u32, 1));
        let colors = pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .take(count)
            .map(|px| Rgb565::from(Rgb888::new(px[0], px[1], px[2])));
        self.target.fill_contiguous(&area, colors).map_err(draw_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::FrameBuffer;

    fn sink() -> GraphicsSink<FrameBuffer> {
        GraphicsSink::new(FrameBuffer::new())
    }

    #[test]
    fn test_blit_row_converts_rgb888() {
        let mut sink = sink();
        let pixels = [255, 0, 0, 0, 255, 0, 0, 0, 255];
        sink.blit_row(5, 3, &pixels).unwrap();

        let fb = sink.target();
        assert_eq!(fb.pixel(0, 5), Some(Rgb565::RED));
        assert_eq!(fb.pixel(1, 5), Some(Rgb565::GREEN));
        assert_eq!(fb.pixel(2, 5), Some(Rgb565::BLUE));
        assert_eq!(fb.pixel(3, 5), Some(Rgb565::BLACK));
    }

    #[test]
    fn test_blit_row_ignores_trailing_partial_pixel() {
        let mut sink = sink();
        sink.blit_row(0, 128, &[255, 255, 255, 255, 255]).unwrap();
        let fb = sink.target();
        assert_eq!(fb.pixel(0, 0), Some(Rgb565::WHITE));
        assert_eq!(fb.pixel(1, 0), Some(Rgb565::BLACK));
    }

    #[test]
    fn test_blit_row_out_of_bounds() {
        let mut sink = sink();
        assert_eq!(
            sink.blit_row(160, 1, &[0, 0, 0]),
            Err(DisplayError::RowOutOfBounds(160))
        );
    }

    #[test]
    fn test_fill_region_and_screen() {
        let mut sink = sink();
        sink.fill_region(
            Rectangle::new(Point::new(0, 140), Size::new(128, 20)),
            Rgb565::GREEN,
        )
        .unwrap();
        assert_eq!(sink.target().pixel(64, 150), Some(Rgb565::GREEN));
        assert_eq!(sink.target().pixel(64, 139), Some(Rgb565::BLACK));

        sink.fill_screen(Rgb565::BLUE).unwrap();
        assert_eq!(sink.target().pixel(0, 0), Some(Rgb565::BLUE));
        assert_eq!(sink.target().pixel(127, 159), Some(Rgb565::BLUE));
    }

    #[test]
    fn test_draw_text_uses_colours() {
        let mut sink = sink();
        sink.set_foreground(Rgb565::WHITE);
        sink.set_background(Rgb565::RED);
        sink.set_font(FontId::Default);
        sink.draw_text("A", Point::new(0, 0), Alignment::Left).unwrap();

        // The 6x10 cell is painted with both colours.
        let fb = sink.target();
        let cell: Vec<_> = (0..10)
            .flat_map(|y| (0..6).map(move |x| (x, y)))
            .filter_map(|(x, y)| fb.pixel(x, y))
            .collect();
        assert!(cell.contains(&Rgb565::WHITE));
        assert!(cell.contains(&Rgb565::RED));
    }
}
