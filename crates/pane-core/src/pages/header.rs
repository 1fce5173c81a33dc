//! Transient page header.
//!
//! After a page switch or a scheduled render the page name is shown in a
//! full-width bar in the page's theme colours. The bar counts down for a fixed
//! number of ticks; when the countdown expires the page is redrawn and only a
//! thin line in the theme background colour is left at the bottom edge.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;

use super::constants::{
    CENTER_X_PX, CENTER_Y_PX, HEADER_HEIGHT_PX, HEADER_TEXT_INSET_PX, HEADER_Y_PX, LOADING_TEXT,
    THIN_HEADER_HEIGHT_PX,
};
use super::page::HeaderTheme;
use crate::display::colors::{COLOR_BLACK, COLOR_STATUS_TEXT};
use crate::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, DisplaySink, FontId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// Just drawn; the countdown has not advanced yet.
    Full,
    /// Still showing the full bar, counting down.
    Fading,
    Thin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderForm {
    Full,
    Thin,
}

#[derive(Debug, Clone)]
pub struct HeaderOverlay {
    state: HeaderState,
    remaining: u32,
    lifetime: u32,
}

impl HeaderOverlay {
    /// `lifetime` is in ticks. Zero keeps the full header up indefinitely.
    pub fn new(lifetime: u32) -> Self {
        Self {
            state: HeaderState::Thin,
            remaining: 0,
            lifetime,
        }
    }

    pub fn state(&self) -> HeaderState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Restart the countdown.
    pub fn show_full(&mut self) {
        self.state = HeaderState::Full;
        self.remaining = self.lifetime;
    }

    /// Advance one tick. Returns `true` on the tick the countdown expires.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.state = HeaderState::Thin;
            true
        } else {
            self.state = HeaderState::Fading;
            false
        }
    }
}

pub fn draw_header<S: DisplaySink>(
    sink: &mut S,
    name: &str,
    theme: HeaderTheme,
    form: HeaderForm,
) -> Result<(), DisplayError> {
    match form {
        HeaderForm::Full => {
            sink.fill_region(
                Rectangle::new(
                    Point::new(0, HEADER_Y_PX as i32),
                    Size::new(DISPLAY_WIDTH_PX, HEADER_HEIGHT_PX),
                ),
                theme.background,
            )?;
            sink.set_font(FontId::Default);
            sink.set_foreground(theme.foreground);
            sink.set_background(theme.background);
            sink.draw_text(
                name,
                Point::new(CENTER_X_PX, (HEADER_Y_PX + HEADER_TEXT_INSET_PX) as i32),
                Alignment::Center,
            )
        }
        HeaderForm::Thin => sink.fill_region(
            Rectangle::new(
                Point::new(0, (DISPLAY_HEIGHT_PX - THIN_HEADER_HEIGHT_PX) as i32),
                Size::new(DISPLAY_WIDTH_PX, THIN_HEADER_HEIGHT_PX),
            ),
            theme.background,
        ),
    }
}

/// Placeholder shown between a page's deinit and the next page's first
/// render.
pub fn draw_loading<S: DisplaySink>(sink: &mut S) -> Result<(), DisplayError> {
    sink.fill_screen(COLOR_BLACK)?;
    sink.set_font(FontId::Default);
    sink.set_foreground(COLOR_STATUS_TEXT);
    sink.set_background(COLOR_BLACK);
    sink.draw_text(LOADING_TEXT, Point::new(CENTER_X_PX, CENTER_Y_PX - 5), Alignment::Center)
}
