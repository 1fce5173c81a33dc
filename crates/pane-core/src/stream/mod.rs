//! Frame streaming client.
//!
//! The streaming mode replaces the page scheduler with a single loop that
//! pulls the screen from the server in horizontal regions. Every cycle fetches
//! `{base}/{page}?region=i` for each region in order and blits what came back.
//! The stream degrades rather than stops when the server is unreachable:
//!
//! - a failed region is zeroed and painted black,
//! - a "Disconnected" banner is drawn over the frame while the last fetch
//!   failed,
//! - after enough failed cycles in a row the backlight is switched off, and
//!   the first successful fetch switches it back on.
//!
//! A cycle counts as failed when none of its regions came back.
//!
//! A region body starting with [`FULL_REFRESH_SENTINEL`] ends the cycle early
//! and clears the screen, so the next cycle repaints from scratch.

pub mod failure;
pub mod region;

pub use failure::{BacklightCommand, FailureCounter};
pub use region::{FULL_REFRESH_SENTINEL, RegionBuffer, RegionFetch, RegionGeometry};

use embassy_time::{Duration, Ticker};
use embedded_graphics::prelude::Point;
use embedded_graphics::text::Alignment;
use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::config::{Config, StreamConfig};
use crate::display::colors::{COLOR_BLACK, COLOR_DISCONNECTED_TEXT};
use crate::display::{
    Backlight, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, DisplaySink, FontId,
};
use crate::input::{InputSignals, Intent};
use crate::transport::{Command, Endpoint, Transport, send_command};

pub const DISCONNECTED_TEXT: &str = "Disconnected";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream is already running")]
    AlreadyRunning,
    #[error("stream was stopped and cannot be restarted")]
    Stopped,
    #[error("stream has not been started")]
    NotRunning,
    #[error("display error: {0}")]
    Display(DisplayError),
}

impl From<DisplayError> for StreamError {
    fn from(e: DisplayError) -> Self {
        StreamError::Display(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub geometry: RegionGeometry,
    pub period: Duration,
    pub failure_threshold: u32,
}

impl From<&StreamConfig> for StreamSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            geometry: RegionGeometry::full_screen(config.regions),
            period: config.period(),
            failure_threshold: config.failure_threshold,
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every region was fetched.
    Complete,
    /// Region `region` carried the sentinel; later regions were skipped.
    FullRefresh { region: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub blitted: u8,
    pub blanked: u8,
    pub disconnected: bool,
    /// Last backlight command issued during the cycle.
    pub backlight: Option<BacklightCommand>,
}

impl Default for CycleReport {
    fn default() -> Self {
        Self {
            outcome: CycleOutcome::Complete,
            blitted: 0,
            blanked: 0,
            disconnected: false,
            backlight: None,
        }
    }
}

/// The collaborators one cycle drives. Borrowed per cycle so the caller keeps
/// ownership of the display between cycles.
pub struct StreamIo<'a, S, T, B> {
    pub sink: &'a mut S,
    pub transport: &'a mut T,
    pub backlight: &'a mut B,
}

impl<'a, S, T, B> StreamIo<'a, S, T, B> {
    pub fn new(sink: &'a mut S, transport: &'a mut T, backlight: &'a mut B) -> Self {
        Self {
            sink,
            transport,
            backlight,
        }
    }
}

pub struct FrameStreamer<'a> {
    settings: StreamSettings,
    endpoint: Endpoint,
    buffer: RegionBuffer,
    failures: FailureCounter,
    disconnected: bool,
    state: StreamState,
    signals: &'a InputSignals,
}

impl<'a> FrameStreamer<'a> {
    pub fn new(settings: StreamSettings, endpoint: Endpoint, signals: &'a InputSignals) -> Self {
        info!(
            "Streaming {} region(s) of {} bytes every {} ms",
            settings.geometry.regions,
            settings.geometry.footprint(),
            settings.period.as_millis()
        );
        Self {
            buffer: RegionBuffer::new(settings.geometry),
            failures: FailureCounter::new(settings.failure_threshold),
            settings,
            endpoint,
            disconnected: false,
            state: StreamState::Idle,
            signals,
        }
    }

    pub fn from_config(config: &Config, signals: &'a InputSignals) -> Self {
        let endpoint =
            Endpoint::from_config(&config.server).with_style(config.stream.command_style);
        Self::new(StreamSettings::from(&config.stream), endpoint, signals)
    }

    pub fn start(&mut self) -> Result<(), StreamError> {
        match self.state {
            StreamState::Idle => {
                info!("Frame stream started");
                self.state = StreamState::Running;
                Ok(())
            }
            StreamState::Running => Err(StreamError::AlreadyRunning),
            StreamState::Stopped => Err(StreamError::Stopped),
        }
    }

    pub fn stop(&mut self) {
        if self.state != StreamState::Stopped {
            info!("Frame stream stopped");
        }
        self.state = StreamState::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.state == StreamState::Running
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn failures(&self) -> &FailureCounter {
        &self.failures
    }

    pub fn settings(&self) -> StreamSettings {
        self.settings
    }

    /// Run one cycle: forward pending button commands, then fetch and blit
    /// every region.
    pub async fn run_cycle<S, T, B>(
        &mut self,
        io: &mut StreamIo<'_, S, T, B>,
    ) -> Result<CycleReport, StreamError>
    where
        S: DisplaySink,
        T: Transport,
        B: Backlight,
    {
        if self.state != StreamState::Running {
            return Err(StreamError::NotRunning);
        }

        self.forward_commands(io.transport).await;

        let geometry = self.settings.geometry;
        let mut report = CycleReport::default();

        for index in 0..geometry.regions {
            let fetch = match self.endpoint.frame_region(index, geometry.regions) {
                Ok(target) => self.buffer.fetch(io.transport, &target).await,
                Err(e) => {
                    self.buffer.blank();
                    RegionFetch::Blanked(e)
                }
            };

            match fetch {
                RegionFetch::Blanked(e) => {
                    warn!("Region {} fetch failed: {}", index, e);
                    self.disconnected = true;
                    self.buffer.blit(io.sink, index, geometry.footprint())?;
                    report.blanked += 1;
                }
                RegionFetch::FullRefresh => {
                    self.record_success(io.backlight, &mut report);
                    info!("Region {} requested a full refresh", index);
                    io.sink.fill_screen(COLOR_BLACK)?;
                    report.outcome = CycleOutcome::FullRefresh { region: index };
                    break;
                }
                RegionFetch::Pixels(len) => {
                    self.record_success(io.backlight, &mut report);
                    self.buffer.blit(io.sink, index, len)?;
                    report.blitted += 1;
                }
            }
        }

        let reached_server =
            report.blitted > 0 || matches!(report.outcome, CycleOutcome::FullRefresh { .. });
        if !reached_server
            && report.blanked > 0
            && let Some(command) = self.failures.record_failure()
        {
            apply_backlight(io.backlight, command);
            report.backlight = Some(command);
        }

        if self.disconnected {
            draw_disconnected(io.sink)?;
        }
        report.disconnected = self.disconnected;
        Ok(report)
    }

    /// Start the stream and cycle at the configured period until stopped.
    pub async fn run<S, T, B>(&mut self, io: &mut StreamIo<'_, S, T, B>) -> Result<(), StreamError>
    where
        S: DisplaySink,
        T: Transport,
        B: Backlight,
    {
        self.start()?;
        let mut ticker = Ticker::every(self.settings.period);

        while self.is_running() {
            match self.run_cycle(io).await {
                Ok(report) => debug!("Cycle: {:?}", report),
                Err(e) => warn!("Cycle failed: {}", e),
            }
            if let Err(e) = io.sink.present() {
                warn!("Present failed: {}", e);
            }
            ticker.next().await;
        }
        Ok(())
    }

    fn record_success<B: Backlight>(&mut self, backlight: &mut B, report: &mut CycleReport) {
        self.disconnected = false;
        if let Some(command) = self.failures.record_success() {
            apply_backlight(backlight, command);
            report.backlight = Some(command);
        }
    }

    /// Forward button intents to the server as navigation commands. The
    /// server owns page order in this mode.
    async fn forward_commands<T: Transport>(&mut self, transport: &mut T) {
        const FORWARDED: [(Intent, Command); 3] = [
            (Intent::NextPage, Command::NextPage),
            (Intent::PreviousPage, Command::PreviousPage),
            (Intent::Action, Command::PageAction),
        ];

        for (intent, command) in FORWARDED {
            if !self.signals.take(intent) {
                continue;
            }
            let result = match self.endpoint.command(command) {
                Ok(target) => send_command(transport, &target).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => info!("Sent {}", command.token()),
                Err(e) => warn!("Command {} failed: {}", command.token(), e),
            }
        }
    }
}

fn apply_backlight<B: Backlight>(backlight: &mut B, command: BacklightCommand) {
    info!("Backlight {:?}", command);
    if let Err(e) = backlight.set_backlight(command.is_on()) {
        warn!("Backlight command failed: {}", e);
    }
}

fn draw_disconnected<S: DisplaySink>(sink: &mut S) -> Result<(), DisplayError> {
    sink.set_font(FontId::Default);
    sink.set_foreground(COLOR_DISCONNECTED_TEXT);
    sink.set_background(COLOR_BLACK);
    sink.draw_text(
        DISCONNECTED_TEXT,
        Point::new(DISPLAY_WIDTH_PX as i32 / 2, DISPLAY_HEIGHT_PX as i32 / 2 - 5),
        Alignment::Center,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DrawOp, RecordingBacklight, RecordingSink, Reply, ScriptedTransport};
    use crate::transport::RequestStyle;
    use embassy_futures::block_on;

    const BASE: &str = "http://srv";

    fn streamer(signals: &InputSignals, regions: u8) -> FrameStreamer<'_> {
        let settings = StreamSettings {
            geometry: RegionGeometry::full_screen(regions),
            period: Duration::from_millis(40),
            failure_threshold: 5,
        };
        let mut streamer = FrameStreamer::new(settings, Endpoint::new(BASE, "live").unwrap(), signals);
        streamer.start().unwrap();
        streamer
    }

    struct Rig {
        sink: RecordingSink,
        transport: ScriptedTransport,
        backlight: RecordingBacklight,
    }

    impl Rig {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                sink: RecordingSink::new(),
                transport: ScriptedTransport::new(replies),
                backlight: RecordingBacklight::default(),
            }
        }

        fn cycle(&mut self, streamer: &mut FrameStreamer<'_>) -> CycleReport {
            let mut io = StreamIo::new(&mut self.sink, &mut self.transport, &mut self.backlight);
            block_on(streamer.run_cycle(&mut io)).unwrap()
        }
    }

    #[test]
    fn test_lifecycle() {
        let signals = InputSignals::new();
        let settings = StreamSettings::default();
        let mut streamer = FrameStreamer::new(settings, Endpoint::new(BASE, "live").unwrap(), &signals);
        let mut rig = Rig::new([]);

        {
            let mut io = StreamIo::new(&mut rig.sink, &mut rig.transport, &mut rig.backlight);
            assert_eq!(
                block_on(streamer.run_cycle(&mut io)),
                Err(StreamError::NotRunning)
            );
        }

        assert_eq!(streamer.start(), Ok(()));
        assert_eq!(streamer.start(), Err(StreamError::AlreadyRunning));
        streamer.stop();
        assert_eq!(streamer.start(), Err(StreamError::Stopped));
        assert!(!streamer.is_running());
    }

    #[test]
    fn test_requests_every_region_in_order() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 4);
        let region = vec![5u8; RegionGeometry::full_screen(4).footprint()];
        let mut rig = Rig::new((0..4).map(|_| Reply::Body(region.clone())));

        let report = rig.cycle(&mut streamer);
        assert_eq!(report.outcome, CycleOutcome::Complete);
        assert_eq!(report.blitted, 4);
        assert!(!report.disconnected);
        assert_eq!(
            rig.transport.requests(),
            [
                "http://srv/live?region=0",
                "http://srv/live?region=1",
                "http://srv/live?region=2",
                "http://srv/live?region=3",
            ]
        );
        let rows = rig.sink.rows();
        assert_eq!(rows.len(), 160);
        assert_eq!(rows[40].0, 40);
        assert!(!rig.sink.has_text(DISCONNECTED_TEXT));
    }

    #[test]
    fn test_failed_region_paints_black_and_shows_banner() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 2);
        let half = RegionGeometry::full_screen(2).footprint();
        let mut rig = Rig::new([Reply::Body(vec![0xFF; half]), Reply::Fail]);

        let report = rig.cycle(&mut streamer);
        assert_eq!(report.blitted, 1);
        assert_eq!(report.blanked, 1);
        assert!(report.disconnected);
        assert!(streamer.is_disconnected());

        let rows = rig.sink.rows();
        assert_eq!(rows.len(), 160);
        assert!(rows[..80].iter().all(|(_, bytes)| bytes.iter().all(|b| *b == 0xFF)));
        assert!(rows[80..].iter().all(|(_, bytes)| bytes.iter().all(|b| *b == 0)));
        assert!(rig.sink.has_text(DISCONNECTED_TEXT));
    }

    #[test]
    fn test_disconnected_follows_last_fetch() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 2);
        let mut rig = Rig::new([Reply::Fail, Reply::body(&[1, 2, 3])]);

        let report = rig.cycle(&mut streamer);
        assert!(!report.disconnected);
        assert!(!rig.sink.has_text(DISCONNECTED_TEXT));
        assert_eq!(streamer.failures().consecutive(), 0);
    }

    #[test]
    fn test_sentinel_aborts_cycle_and_clears_screen() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 4);
        let mut rig = Rig::new([
            Reply::body(&[7u8; 384]),
            Reply::body(b"REFRESH"),
            Reply::body(&[8u8; 384]),
            Reply::body(&[9u8; 384]),
        ]);

        let report = rig.cycle(&mut streamer);
        assert_eq!(report.outcome, CycleOutcome::FullRefresh { region: 1 });
        assert_eq!(report.blitted, 1);
        assert_eq!(rig.transport.requests().len(), 2);
        assert_eq!(rig.transport.remaining(), 2);

        // One row from region 0, then the clear, then nothing else drawn.
        let last_row = rig
            .sink
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Row { .. }))
            .unwrap();
        let clear = rig
            .sink
            .ops
            .iter()
            .position(|op| matches!(op, DrawOp::Fill { .. }))
            .unwrap();
        assert!(last_row < clear);
        assert_eq!(clear, rig.sink.ops.len() - 1);
        assert_eq!(
            rig.sink.fills(),
            [(crate::display::screen_bounds(), COLOR_BLACK)]
        );
    }

    #[test]
    fn test_full_budget_body_is_one_frame() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 1);
        let mut rig = Rig::new([Reply::body(&[3u8; 30_000])]);

        let report = rig.cycle(&mut streamer);
        assert_eq!(report.blitted, 1);
        let rows = rig.sink.rows();
        assert_eq!(rows.len(), 79);
        assert_eq!(rows[78].1.len(), 48);

        // 61441 is the budget: one byte more than a full frame still fits,
        // anything larger is an overrun and blanks the frame.
        let mut rig = Rig::new([Reply::body(&[3u8; 61_442])]);
        let report = rig.cycle(&mut streamer);
        assert_eq!(report.blanked, 1);
        assert!(report.disconnected);
    }

    #[test]
    fn test_backlight_off_once_after_fifth_failed_cycle() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 1);
        let mut rig = Rig::new([]);

        for cycle in 1..=4 {
            let report = rig.cycle(&mut streamer);
            assert_eq!(report.backlight, None, "cycle {cycle}");
        }
        assert!(rig.backlight.commands.is_empty());

        let report = rig.cycle(&mut streamer);
        assert_eq!(report.backlight, Some(BacklightCommand::Off));
        assert_eq!(rig.backlight.commands, [false]);

        for _ in 0..3 {
            rig.cycle(&mut streamer);
        }
        assert_eq!(rig.backlight.commands, [false]);

        rig.transport.push(Reply::body(&[1u8; 384]));
        let report = rig.cycle(&mut streamer);
        assert_eq!(report.backlight, Some(BacklightCommand::On));
        assert_eq!(rig.backlight.commands, [false, true]);
        assert!(!report.disconnected);
    }

    #[test]
    fn test_multi_region_threshold_counts_cycles() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 4);
        let mut rig = Rig::new([]);

        for cycle in 1..=4 {
            let report = rig.cycle(&mut streamer);
            assert_eq!(report.blanked, 4);
            assert_eq!(report.backlight, None, "cycle {cycle}");
            assert_eq!(streamer.failures().consecutive(), cycle);
        }
        assert!(rig.backlight.commands.is_empty());

        let report = rig.cycle(&mut streamer);
        assert_eq!(report.backlight, Some(BacklightCommand::Off));
        assert_eq!(rig.backlight.commands, [false]);
        assert_eq!(rig.transport.requests().len(), 20);
    }

    #[test]
    fn test_partly_fetched_cycle_is_not_a_failure() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 2);
        let half = RegionGeometry::full_screen(2).footprint();
        let mut rig = Rig::new([]);

        for _ in 0..6 {
            rig.transport.push(Reply::Body(vec![1; half]));
            rig.transport.push(Reply::Fail);
            let report = rig.cycle(&mut streamer);
            assert!(report.disconnected);
        }
        assert_eq!(streamer.failures().consecutive(), 0);
        assert!(rig.backlight.commands.is_empty());
    }

    #[test]
    fn test_interleaved_success_keeps_backlight_on() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 1);
        let mut rig = Rig::new([
            Reply::Fail,
            Reply::Fail,
            Reply::Fail,
            Reply::Fail,
            Reply::body(&[1u8; 384]),
            Reply::Fail,
            Reply::Fail,
            Reply::Fail,
            Reply::Fail,
        ]);

        for _ in 0..9 {
            rig.cycle(&mut streamer);
        }
        assert!(rig.backlight.commands.is_empty());
        assert_eq!(streamer.failures().consecutive(), 4);
    }

    #[test]
    fn test_button_intents_forwarded_before_regions() {
        let signals = InputSignals::new();
        let mut streamer = streamer(&signals, 1);
        let mut rig = Rig::new([
            Reply::body(b"OK"),
            Reply::body(b"Failure"),
            Reply::body(&[1u8; 384]),
        ]);

        signals.raise(Intent::NextPage);
        signals.raise(Intent::Action);
        let report = rig.cycle(&mut streamer);

        assert_eq!(
            rig.transport.requests(),
            [
                "http://srv/page_next",
                "http://srv/page_action",
                "http://srv/live?region=0",
            ]
        );
        // A failed command does not count against the stream.
        assert!(!report.disconnected);
        assert_eq!(streamer.failures().consecutive(), 0);
        assert!(!signals.is_pending(Intent::NextPage));
        assert!(!signals.is_pending(Intent::Action));
    }

    #[test]
    fn test_bare_command_style() {
        let signals = InputSignals::new();
        let settings = StreamSettings::default();
        let endpoint = Endpoint::new(BASE, "live")
            .unwrap()
            .with_style(RequestStyle::Bare);
        let mut streamer = FrameStreamer::new(settings, endpoint, &signals);
        streamer.start().unwrap();
        let mut rig = Rig::new([Reply::body(b"OK")]);

        signals.raise(Intent::PreviousPage);
        rig.cycle(&mut streamer);
        assert_eq!(rig.transport.requests(), ["page_last", "page_get_frame"]);
    }
}
