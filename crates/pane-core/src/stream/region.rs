//! Region geometry, the reusable region buffer, and the shared fetch/blit
//! path used by both the streamer and server-rendered pages.

use alloc::boxed::Box;
use alloc::vec;

use log::debug;

use crate::display::{BYTES_PER_PIXEL, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, DisplaySink};
use crate::transport::{Transport, TransportError, fetch_into};

/// Leading bytes of a region body that ask for a full-screen refresh instead
/// of carrying pixels.
pub const FULL_REFRESH_SENTINEL: &[u8] = b"REFRESH";

/// How the screen is cut into horizontal slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionGeometry {
    pub width: u32,
    pub height: u32,
    pub regions: u8,
}

impl RegionGeometry {
    pub const fn full_screen(regions: u8) -> Self {
        Self {
            width: DISPLAY_WIDTH_PX,
            height: DISPLAY_HEIGHT_PX,
            regions,
        }
    }

    pub fn region_height(&self) -> u32 {
        self.height / self.regions.max(1) as u32
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Bytes in one fully populated region.
    pub fn footprint(&self) -> usize {
        self.row_bytes() * self.region_height() as usize
    }

    /// Response budget: one byte of slack past the footprint, so a server
    /// that sends a whole region plus anything extra is caught as an overrun.
    pub fn budget(&self) -> usize {
        self.footprint() + 1
    }

    pub fn y_offset(&self, index: u8) -> u32 {
        index as u32 * self.region_height()
    }
}

/// Fixed-capacity buffer for one region, allocated once and reused.
pub struct RegionBuffer {
    geometry: RegionGeometry,
    bytes: Box<[u8]>,
}

/// What a region fetch left in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFetch {
    /// `len` bytes of pixel data.
    Pixels(usize),
    /// The fetch failed and the buffer was zeroed.
    Blanked(TransportError),
    /// The body started with [`FULL_REFRESH_SENTINEL`].
    FullRefresh,
}

impl RegionBuffer {
    pub fn new(geometry: RegionGeometry) -> Self {
        Self {
            geometry,
            bytes: vec![0u8; geometry.budget()].into_boxed_slice(),
        }
    }

    pub fn geometry(&self) -> RegionGeometry {
        self.geometry
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn blank(&mut self) {
        self.bytes.fill(0);
    }

    /// Fetch `target` into the buffer. Failures zero the buffer so the region
    /// paints black when blitted.
    pub async fn fetch<T: Transport>(&mut self, transport: &mut T, target: &str) -> RegionFetch {
        let outcome = match fetch_into(transport, target, &mut self.bytes).await {
            Ok(body) if body.starts_with(FULL_REFRESH_SENTINEL) => Ok(RegionFetch::FullRefresh),
            Ok(body) => Ok(RegionFetch::Pixels(body.len())),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(fetch) => fetch,
            Err(e) => {
                self.blank();
                RegionFetch::Blanked(e)
            }
        }
    }

    /// Draw the first `len` bytes as rows of region `index`. A trailing
    /// partial row is drawn up to its last whole pixel. Returns the number of
    /// rows touched.
    pub fn blit<S: DisplaySink>(
        &self,
        sink: &mut S,
        index: u8,
        len: usize,
    ) -> Result<u32, DisplayError> {
        let geometry = self.geometry;
        let len = len.min(geometry.footprint());
        let y0 = geometry.y_offset(index);

        let mut rows = 0;
        for chunk in self.bytes[..len].chunks(geometry.row_bytes()) {
            let pixels = chunk.len() / BYTES_PER_PIXEL;
            if pixels == 0 {
                break;
            }
            sink.blit_row(
                y0 + rows,
                pixels as u32,
                &chunk[..pixels * BYTES_PER_PIXEL],
            )?;
            rows += 1;
        }
        debug!("Region {} blitted {} rows from {} bytes", index, rows, len);
        Ok(rows)
    }
}
