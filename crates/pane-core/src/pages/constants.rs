//! Layout constants shared by the pager chrome and the pages.

use crate::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// Maximum number of pages in the ring.
pub const MAX_PAGES: usize = 8;

/// Page names are truncated to this many bytes.
pub const PAGE_NAME_LEN: usize = 16;

// ============================================================================
// Header
// ============================================================================

pub const HEADER_HEIGHT_PX: u32 = 20;
pub const HEADER_Y_PX: u32 = DISPLAY_HEIGHT_PX - HEADER_HEIGHT_PX;
/// Gap between the top of the header bar and the top of the name text.
pub const HEADER_TEXT_INSET_PX: u32 = 5;
/// Height of the coloured line left behind once the header has faded.
pub const THIN_HEADER_HEIGHT_PX: u32 = 2;

// ============================================================================
// Placeholders
// ============================================================================

pub const LOADING_TEXT: &str = "Loading...";
pub const CENTER_X_PX: i32 = DISPLAY_WIDTH_PX as i32 / 2;
pub const CENTER_Y_PX: i32 = DISPLAY_HEIGHT_PX as i32 / 2;
