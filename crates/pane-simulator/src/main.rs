//! Desktop simulator for the pane networked display.
//!
//! Runs the page scheduler or the frame streamer from `pane-core` against a
//! real content server, drawing into an SDL2 window via
//! `embedded-graphics-simulator`. Configuration is read from `pane.toml`
//! (or the path given as the first argument); missing values keep their
//! defaults.
//!
//! # Key bindings
//!
//! | Key          | Action                        |
//! |--------------|-------------------------------|
//! | N, Right     | Next page (single tap)        |
//! | P, Left      | Previous page (double tap)    |
//! | A, Space     | Page action (long press)      |
//! | Q, Escape    | Quit                          |

mod http;

use std::path::Path;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{error, info, warn};
use thiserror_no_std::Error;

use pane_core::config::{Config, ConfigError, Mode};
use pane_core::display::{
    Backlight, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, GraphicsSink,
};
use pane_core::input::{InputSignals, Intent};
use pane_core::pages::{
    NoticePage, NowPlayingPage, PageContext, PageScheduler, PageWrapper, RemotePage,
    SchedulerConfig,
};
use pane_core::stream::{FrameStreamer, StreamIo};
use pane_core::transport::Endpoint;

use crate::http::HttpTransport;

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 3;

const DEFAULT_CONFIG_PATH: &str = "pane.toml";

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
enum SimError {
    #[error("cannot read config: {0}")]
    Io(std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(ConfigError),
    #[error("cannot build HTTP client: {0}")]
    Http(reqwest::Error),
}

type Sink = GraphicsSink<SimulatorDisplay<Rgb565>>;

fn load_config(path: &Path) -> Result<Config, SimError> {
    let config = if path.exists() {
        let text = std::fs::read_to_string(path).map_err(SimError::Io)?;
        toml::from_str(&text).map_err(SimError::Parse)?
    } else {
        warn!("{} not found, using defaults", path.display());
        Config::default()
    };

    // The simulator runs on the host's network; only the server matters.
    if config.server.base_url.is_empty() {
        return Err(SimError::Invalid(ConfigError::EmptyBaseUrl));
    }
    let mut checked = config.clone();
    if checked.internet.ssid.is_empty() {
        let _ = checked.internet.ssid.push_str("simulator");
    }
    checked.validate().map_err(SimError::Invalid)?;
    Ok(config)
}

/// Stands in for the panel backlight; the window stays lit.
struct SimBacklight;

impl Backlight for SimBacklight {
    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        info!("Backlight {}", if on { "on" } else { "off" });
        Ok(())
    }
}

fn keycode_to_intent(keycode: Keycode) -> Option<Intent> {
    match keycode {
        Keycode::N | Keycode::Right => Some(Intent::NextPage),
        Keycode::P | Keycode::Left => Some(Intent::PreviousPage),
        Keycode::A | Keycode::Space => Some(Intent::Action),
        _ => None,
    }
}

/// Pump SDL events. Returns `false` once the user asked to quit.
fn handle_events(window: &mut Window, signals: &InputSignals) -> bool {
    for event in window.events() {
        match event {
            SimulatorEvent::Quit => return false,
            SimulatorEvent::KeyDown { keycode, .. } => {
                if keycode == Keycode::Q || keycode == Keycode::Escape {
                    return false;
                }
                if let Some(intent) = keycode_to_intent(keycode) {
                    info!("Key {:?} -> {:?}", keycode, intent);
                    signals.raise(intent);
                }
            }
            _ => {}
        }
    }
    true
}

fn pace(started: Instant, period: Duration) {
    let elapsed = started.elapsed();
    if elapsed < period {
        std::thread::sleep(period - elapsed);
    }
}

fn run_pager(
    config: &Config,
    window: &mut Window,
    sink: &mut Sink,
    transport: &mut HttpTransport,
    signals: &InputSignals,
) {
    let endpoint = Endpoint::from_config(&config.server);
    let scheduler_config = SchedulerConfig::from(&config.pager);
    let mut scheduler: PageScheduler<'_, PageWrapper> =
        PageScheduler::new(scheduler_config, signals);

    let pages = [
        PageWrapper::NowPlaying(Box::new(NowPlayingPage::new(endpoint.clone()))),
        PageWrapper::Remote(Box::new(RemotePage::new(
            &config.server.page,
            endpoint,
            config.stream.regions,
        ))),
        PageWrapper::Notice(Box::new(NoticePage::placeholder())),
    ];
    for page in pages {
        let mut ctx = PageContext::new(&mut *sink, &mut *transport);
        if let Err(e) = block_on(scheduler.register(page, &mut ctx)) {
            error!("Page not registered: {}", e);
        }
    }
    scheduler.start();
    window.update(sink.target());

    let tick = Duration::from_millis(config.pager.tick_ms as u64);
    loop {
        let started = Instant::now();
        if !handle_events(window, signals) {
            break;
        }

        let mut ctx = PageContext::new(&mut *sink, &mut *transport);
        if let Err(e) = block_on(scheduler.tick(&mut ctx)) {
            error!("{}", e);
        }
        window.update(sink.target());
        pace(started, tick);
    }
}

fn run_stream(
    config: &Config,
    window: &mut Window,
    sink: &mut Sink,
    transport: &mut HttpTransport,
    signals: &InputSignals,
) {
    let mut streamer = FrameStreamer::from_config(config, signals);
    let mut backlight = SimBacklight;
    if let Err(e) = streamer.start() {
        error!("{}", e);
        return;
    }

    let period = Duration::from_millis(config.stream.period_ms as u64);
    while streamer.is_running() {
        let started = Instant::now();
        if !handle_events(window, signals) {
            streamer.stop();
            break;
        }

        let mut io = StreamIo::new(&mut *sink, &mut *transport, &mut backlight);
        if let Err(e) = block_on(streamer.run_cycle(&mut io)) {
            warn!("Cycle failed: {}", e);
        }
        window.update(sink.target());
        pace(started, period);
    }
}

fn main() {
    env_logger::init();
    info!("Starting pane simulator");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = match load_config(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Mode {:?}, server {}/{}",
        config.mode, config.server.base_url, config.server.page
    );

    let mut transport = match HttpTransport::new(&config.server.base_url, HTTP_TIMEOUT)
        .map_err(SimError::Http)
    {
        Ok(transport) => transport,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let display = SimulatorDisplay::<Rgb565>::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX));
    let mut sink = GraphicsSink::new(display);
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("pane simulator", &output_settings);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    window.update(sink.target());

    let signals = InputSignals::new();
    match config.mode {
        Mode::Pager => run_pager(&config, &mut window, &mut sink, &mut transport, &signals),
        Mode::Stream => run_stream(&config, &mut window, &mut sink, &mut transport, &signals),
    }

    info!("Simulator exiting");
}
