//! Deterministic fakes for the display, transport and backlight seams.

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;

use crate::display::{
    Backlight, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, DisplaySink, FontId,
};
use crate::transport::{Transport, TransportError};

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Fill {
        area: Rectangle,
        color: Rgb565,
    },
    Text {
        text: String,
        position: Point,
        foreground: Rgb565,
        background: Rgb565,
        font: FontId,
    },
    Row {
        y: u32,
        width: u32,
        bytes: Vec<u8>,
    },
    Present,
}

/// Records every call so tests can assert on what was drawn, in order.
pub struct RecordingSink {
    pub ops: Vec<DrawOp>,
    foreground: Rgb565,
    background: Rgb565,
    font: FontId,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            foreground: Rgb565::WHITE,
            background: Rgb565::BLACK,
            font: FontId::Default,
        }
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn rows(&self) -> Vec<(u32, &[u8])> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Row { y, bytes, .. } => Some((*y, bytes.as_slice())),
                _ => None,
            })
            .collect()
    }

    pub fn fills(&self) -> Vec<(Rectangle, Rgb565)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Fill { area, color } => Some((*area, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn has_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }
}

impl DisplaySink for RecordingSink {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
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
        self.ops.push(DrawOp::Fill { area, color });
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: Point,
        _alignment: Alignment,
    ) -> Result<(), DisplayError> {
        self.ops.push(DrawOp::Text {
            text: text.into(),
            position,
            foreground: self.foreground,
            background: self.background,
            font: self.font,
        });
        Ok(())
    }

    fn blit_row(&mut self, y: u32, width: u32, pixels: &[u8]) -> Result<(), DisplayError> {
        if y >= DISPLAY_HEIGHT_PX {
            return Err(DisplayError::RowOutOfBounds(y));
        }
        self.ops.push(DrawOp::Row {
            y,
            width,
            bytes: pixels.to_vec(),
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        self.ops.push(DrawOp::Present);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Fail,
}

impl Reply {
    pub fn body(bytes: &[u8]) -> Self {
        Reply::Body(bytes.to_vec())
    }
}

/// Answers requests from a queue, in order. An empty queue fails.
pub struct ScriptedTransport {
    replies: VecDeque<Reply>,
    requests: Vec<String>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    pub fn push(&mut self, reply: Reply) {
        self.replies.push_back(reply);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl Transport for ScriptedTransport {
    async fn fetch(&mut self, target: &str, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.requests.push(target.into());
        match self.replies.pop_front() {
            Some(Reply::Body(bytes)) => {
                if bytes.len() > buf.len() {
                    return Err(TransportError::BufferOverrun {
                        budget: buf.len(),
                        received: bytes.len(),
                    });
                }
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Reply::Fail) | None => Err(TransportError::Failure),
        }
    }
}

// ---------------------------------------------------------------------------
// Backlight
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingBacklight {
    pub commands: Vec<bool>,
}

impl Backlight for RecordingBacklight {
    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.commands.push(on);
        Ok(())
    }
}
