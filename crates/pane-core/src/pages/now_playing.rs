//! Now-playing page
//!
//! Shows the track the server reports at `{base}/now_playing`. The body is a
//! flat JSON object:
//!
//! ```json
//! {"name": "...", "artist": "...", "album": "...", "art_url": "...", "is_playing": true}
//! ```
//!
//! Album art is not decoded on the device; a placeholder box marks where it
//! goes. Scheduled (non-forced) renders skip drawing when the metadata is
//! unchanged.

use alloc::string::String as WireString;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write;

use embassy_time::Duration;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;
use heapless::String;
use log::debug;
use serde::Deserialize;

use super::constants::{CENTER_X_PX, CENTER_Y_PX};
use super::page::{
    Capabilities, HeaderTheme, Page, PageContext, PageError, PageName, page_name, truncated,
};
use crate::display::colors::{
    COLOR_ART_PLACEHOLDER, COLOR_BLACK, COLOR_NOW_PLAYING_HEADER, COLOR_WHITE,
};
use crate::display::{DisplaySink, FontId};
use crate::transport::{Endpoint, Transport, fetch_into};

pub const NOW_PLAYING_PATH: &str = "now_playing";

const METADATA_BUDGET: usize = 1024;
const REFRESH_PERIOD: Duration = Duration::from_secs(5);

pub const TRACK_FIELD_LEN: usize = 32;
pub const ART_URL_LEN: usize = 128;

const ART_X_PX: i32 = 27;
const ART_Y_PX: i32 = 44;
const ART_SIZE_PX: u32 = 75;
const ALBUM_Y_PX: i32 = 123;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub name: String<TRACK_FIELD_LEN>,
    pub artist: String<TRACK_FIELD_LEN>,
    pub album: String<TRACK_FIELD_LEN>,
    pub art_url: String<ART_URL_LEN>,
    pub is_playing: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TrackWire {
    name: WireString,
    artist: WireString,
    album: WireString,
    art_url: WireString,
    is_playing: bool,
}

impl Track {
    /// Decode a now-playing body. Over-long fields are truncated rather than
    /// rejected.
    pub fn parse(body: &[u8]) -> Result<Self, PageError> {
        let wire: TrackWire = serde_json::from_slice(body).map_err(|e| {
            debug!("Now-playing body rejected: {}", e);
            PageError::Decode
        })?;
        Ok(Self {
            name: truncated(&wire.name),
            artist: truncated(&wire.artist),
            album: truncated(&wire.album),
            art_url: truncated(&wire.art_url),
            is_playing: wire.is_playing,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

pub struct NowPlayingPage {
    name: PageName,
    endpoint: Endpoint,
    buffer: Option<Vec<u8>>,
    current: Option<Track>,
}

impl NowPlayingPage {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            name: page_name("Spotify"),
            endpoint,
            buffer: None,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    async fn fetch_track<T: Transport>(&mut self, transport: &mut T) -> Result<Track, PageError> {
        let buffer = self.buffer.as_mut().ok_or(PageError::NotInitialised)?;
        let target = self.endpoint.resource(NOW_PLAYING_PATH)?;
        let body = fetch_into(transport, &target, buffer).await?;
        Track::parse(body)
    }

    fn draw<S: DisplaySink>(sink: &mut S, track: &Track) -> Result<(), PageError> {
        sink.fill_screen(COLOR_BLACK)?;
        sink.set_foreground(COLOR_WHITE);
        sink.set_background(COLOR_BLACK);
        sink.set_font(FontId::Small);

        if track.is_empty() {
            sink.set_font(FontId::Default);
            sink.draw_text(
                "Nothing playing",
                Point::new(CENTER_X_PX, CENTER_Y_PX - 5),
                Alignment::Center,
            )?;
            return Ok(());
        }

        let mut heading: String<{ TRACK_FIELD_LEN * 2 + 1 }> = String::new();
        let _ = write!(heading, "{}\n{}", track.name, track.artist);
        sink.draw_text(&heading, Point::zero(), Alignment::Left)?;

        if !track.is_playing {
            sink.draw_text("||", Point::new(127, 0), Alignment::Right)?;
        }

        sink.fill_region(
            Rectangle::new(
                Point::new(ART_X_PX, ART_Y_PX),
                Size::new(ART_SIZE_PX, ART_SIZE_PX),
            ),
            COLOR_ART_PLACEHOLDER,
        )?;
        sink.set_font(FontId::Large);
        sink.set_background(COLOR_ART_PLACEHOLDER);
        sink.draw_text(
            "?",
            Point::new(
                ART_X_PX + ART_SIZE_PX as i32 / 2,
                ART_Y_PX + ART_SIZE_PX as i32 / 2 - 10,
            ),
            Alignment::Center,
        )?;

        sink.set_font(FontId::Small);
        sink.set_background(COLOR_BLACK);
        sink.draw_text(&track.album, Point::new(CENTER_X_PX, ALBUM_Y_PX), Alignment::Center)?;
        Ok(())
    }
}

impl Page for NowPlayingPage {
    fn name(&self) -> &str {
        &self.name
    }

    fn theme(&self) -> HeaderTheme {
        HeaderTheme {
            foreground: COLOR_WHITE,
            background: COLOR_NOW_PLAYING_HEADER,
        }
    }

    fn refresh_period(&self) -> Duration {
        REFRESH_PERIOD
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LIFECYCLE
    }

    async fn init<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        self.buffer = Some(vec![0u8; METADATA_BUDGET]);
        match self.fetch_track(ctx.transport).await {
            Ok(track) => {
                self.current = Some(track);
                Ok(())
            }
            Err(e) => {
                self.buffer = None;
                Err(e)
            }
        }
    }

    async fn deinit<S: DisplaySink, T: Transport>(
        &mut self,
        _ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), PageError> {
        self.buffer = None;
        self.current = None;
        Ok(())
    }

    async fn render<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
        force: bool,
    ) -> Result<(), PageError> {
        let track = self.fetch_track(ctx.transport).await?;
        if !force && self.current.as_ref() == Some(&track) {
            debug!("{} does not need to update", self.name);
            return Ok(());
        }

        Self::draw(ctx.sink, &track)?;
        self.current = Some(track);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSink, Reply, ScriptedTransport};
    use crate::transport::TransportError;
    use embassy_futures::block_on;

    const TRACK_A: &[u8] =
        br#"{"name":"Song A","artist":"Band","album":"Record","art_url":"http://img/a","is_playing":true}"#;
    const TRACK_B: &[u8] =
        br#"{"name":"Song B","artist":"Band","album":"Record","art_url":"http://img/b","is_playing":true}"#;

    fn page() -> NowPlayingPage {
        NowPlayingPage::new(Endpoint::new("http://srv", "live").unwrap())
    }

    #[test]
    fn test_parse_track() {
        let track = Track::parse(TRACK_A).unwrap();
        assert_eq!(track.name.as_str(), "Song A");
        assert_eq!(track.artist.as_str(), "Band");
        assert_eq!(track.album.as_str(), "Record");
        assert_eq!(track.art_url.as_str(), "http://img/a");
        assert!(track.is_playing);
    }

    #[test]
    fn test_parse_missing_fields_default() {
        let track = Track::parse(br#"{"name":"Only"}"#).unwrap();
        assert_eq!(track.name.as_str(), "Only");
        assert!(track.artist.is_empty());
        assert!(!track.is_playing);
        assert!(Track::parse(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_truncates_long_fields() {
        let track = Track::parse(
            br#"{"name":"A name that is much longer than thirty two bytes"}"#,
        )
        .unwrap();
        assert_eq!(track.name.len(), TRACK_FIELD_LEN);
    }

    #[test]
    fn test_parse_unescapes_strings() {
        let track = Track::parse(br#"{"name":"Say \"Hi\"","artist":"Caf\u00e9"}"#).unwrap();
        assert_eq!(track.name.as_str(), "Say \"Hi\"");
        assert_eq!(track.artist.as_str(), "Caf\u{e9}");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Track::parse(b"not json"), Err(PageError::Decode));
    }

    #[test]
    fn test_render_before_init() {
        let mut page = page();
        let mut sink = RecordingSink::new();
        let mut transport = ScriptedTransport::new([Reply::body(TRACK_A)]);
        let mut ctx = PageContext::new(&mut sink, &mut transport);
        assert_eq!(
            block_on(page.render(&mut ctx, true)),
            Err(PageError::NotInitialised)
        );
    }

    #[test]
    fn test_init_failure_is_reported() {
        let mut page = page();
        let mut sink = RecordingSink::new();
        let mut transport = ScriptedTransport::new([Reply::Fail]);
        let mut ctx = PageContext::new(&mut sink, &mut transport);
        assert_eq!(
            block_on(page.init(&mut ctx)),
            Err(PageError::Transport(TransportError::Failure))
        );
        assert!(page.current().is_none());
    }

    #[test]
    fn test_unchanged_metadata_skips_redraw() {
        let mut page = page();
        let mut sink = RecordingSink::new();
        let mut transport = ScriptedTransport::new([
            Reply::body(TRACK_A),
            Reply::body(TRACK_A),
            Reply::body(TRACK_A),
            Reply::body(TRACK_B),
        ]);

        {
            let mut ctx = PageContext::new(&mut sink, &mut transport);
            block_on(page.init(&mut ctx)).unwrap();
            block_on(page.render(&mut ctx, true)).unwrap();
        }
        assert!(sink.has_text("Song A\nBand"));
        assert!(sink.has_text("Record"));
        sink.clear();

        {
            let mut ctx = PageContext::new(&mut sink, &mut transport);
            block_on(page.render(&mut ctx, false)).unwrap();
        }
        assert!(sink.ops.is_empty());

        {
            let mut ctx = PageContext::new(&mut sink, &mut transport);
            block_on(page.render(&mut ctx, false)).unwrap();
        }
        assert!(sink.has_text("Song B\nBand"));
        assert_eq!(page.current().unwrap().name.as_str(), "Song B");
        assert!(
            transport
                .requests()
                .iter()
                .all(|r| r == "http://srv/now_playing")
        );
    }

    #[test]
    fn test_deinit_clears_state() {
        let mut page = page();
        let mut sink = RecordingSink::new();
        let mut transport = ScriptedTransport::new([Reply::body(TRACK_A)]);
        let mut ctx = PageContext::new(&mut sink, &mut transport);

        block_on(page.init(&mut ctx)).unwrap();
        assert!(page.current().is_some());
        block_on(page.deinit(&mut ctx)).unwrap();
        assert!(page.current().is_none());
        assert_eq!(
            block_on(page.render(&mut ctx, true)),
            Err(PageError::NotInitialised)
        );
    }

    #[test]
    fn test_paused_marker() {
        let mut page = page();
        let mut sink = RecordingSink::new();
        let paused = br#"{"name":"Song A","artist":"Band","album":"Record","is_playing":false}"#;
        let mut transport = ScriptedTransport::new([Reply::body(paused), Reply::body(paused)]);
        let mut ctx = PageContext::new(&mut sink, &mut transport);

        block_on(page.init(&mut ctx)).unwrap();
        block_on(page.render(&mut ctx, true)).unwrap();
        assert!(sink.has_text("||"));
    }
}
