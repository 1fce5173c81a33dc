//! Named colours used across the UI.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RgbColor;

/// Convert 8-bit-per-channel RGB to RGB565.
pub const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

// ============================================================================
// Base
// ============================================================================

pub const COLOR_BLACK: Rgb565 = Rgb565::BLACK;
pub const COLOR_WHITE: Rgb565 = Rgb565::WHITE;

// ============================================================================
// Status
// ============================================================================

pub const COLOR_STATUS_TEXT: Rgb565 = rgb(220, 220, 220);
pub const COLOR_DISCONNECTED_TEXT: Rgb565 = rgb(255, 80, 80);
pub const COLOR_ART_PLACEHOLDER: Rgb565 = rgb(48, 48, 48);

// ============================================================================
// Page themes
// ============================================================================

pub const COLOR_NOW_PLAYING_HEADER: Rgb565 = rgb(30, 215, 96);
pub const COLOR_REMOTE_HEADER: Rgb565 = rgb(40, 90, 200);
