//! Page scheduler: a fixed ring of pages driven by a periodic tick.
//!
//! The scheduler owns the ring and all of its state; nothing about the active
//! page lives outside it. Each [`tick`](PageScheduler::tick) does at most one
//! of three things, checked in this order:
//!
//! 1. a pending next-page request switches to the following page,
//! 2. the active page's refresh period has elapsed, so it renders and the
//!    full header comes back,
//! 3. the header countdown expires, so the page is redrawn with only the thin
//!    header line.
//!
//! A pending long-press action runs between steps 1 and 2.
//!
//! A switch is all-or-nothing: if the incoming page fails to initialise the
//! outgoing page is brought back and the failure is reported to the caller.

use embassy_time::{Duration, Ticker};
use heapless::Vec;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use super::constants::MAX_PAGES;
use super::header::{HeaderForm, HeaderOverlay, HeaderState, draw_header, draw_loading};
use super::page::{Page, PageContext, PageError, PageName, page_name};
use crate::config::PagerConfig;
use crate::display::DisplaySink;
use crate::input::{InputSignals, Intent};
use crate::transport::Transport;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("pages cannot be registered once the tick loop has started")]
    AlreadyRunning,
    #[error("page ring is full ({0} pages)")]
    RingFull(usize),
    #[error("page {name} failed to initialise: {error}")]
    PageInitFailure { name: PageName, error: PageError },
    #[error("no page to navigate to")]
    NoNextPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pages are registered.
    Empty,
    Idle,
    Switched,
    /// Scheduled render with the full header.
    Refreshed,
    /// Header countdown expired; redrawn with the thin header.
    HeaderThinned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub tick: Duration,
    pub header_lifetime: Duration,
}

impl From<&PagerConfig> for SchedulerConfig {
    fn from(config: &PagerConfig) -> Self {
        Self {
            tick: config.tick(),
            header_lifetime: config.header_lifetime(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&PagerConfig::default())
    }
}

/// Whole ticks in `duration`, rounding down.
pub fn to_ticks(duration: Duration, tick: Duration) -> u32 {
    let tick_ms = tick.as_millis().max(1);
    (duration.as_millis() / tick_ms).min(u32::MAX as u64) as u32
}

pub struct PageScheduler<'a, P, const N: usize = MAX_PAGES> {
    pages: Vec<P, N>,
    active: usize,
    elapsed: u32,
    header: HeaderOverlay,
    config: SchedulerConfig,
    signals: &'a InputSignals,
    running: bool,
}

impl<'a, P: Page, const N: usize> PageScheduler<'a, P, N> {
    pub fn new(config: SchedulerConfig, signals: &'a InputSignals) -> Self {
        Self {
            pages: Vec::new(),
            active: 0,
            elapsed: 0,
            header: HeaderOverlay::new(to_ticks(config.header_lifetime, config.tick)),
            config,
            signals,
            running: false,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_page(&self) -> Option<&P> {
        self.pages.get(self.active)
    }

    pub fn pages(&self) -> &[P] {
        &self.pages
    }

    pub fn header_state(&self) -> HeaderState {
        self.header.state()
    }

    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed
    }

    /// Append a page to the ring. The first page becomes active at once:
    /// it is initialised, rendered and given the full header.
    pub async fn register<S: DisplaySink, T: Transport>(
        &mut self,
        mut page: P,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), SchedulerError> {
        if self.running {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.pages.is_full() {
            return Err(SchedulerError::RingFull(N));
        }

        info!("Adding page {}", page.name());
        if !self.pages.is_empty() {
            return self
                .pages
                .push(page)
                .map_err(|_| SchedulerError::RingFull(N));
        }

        if page.capabilities().init
            && let Err(error) = page.init(ctx).await
        {
            error!("Page {} failed to initialise: {}", page.name(), error);
            return Err(SchedulerError::PageInitFailure {
                name: page_name(page.name()),
                error,
            });
        }
        self.pages
            .push(page)
            .map_err(|_| SchedulerError::RingFull(N))?;
        self.active = 0;
        self.activate(ctx).await;
        Ok(())
    }

    /// Close registration; the ring is fixed from here on.
    pub fn start(&mut self) {
        if !self.running {
            info!("Page scheduler started with {} page(s)", self.pages.len());
        }
        self.running = true;
    }

    /// Ask for a switch at the next tick. On a single-page ring the switch
    /// goes through the full lifecycle of the same page.
    pub fn request_next_page(&self) -> Result<(), SchedulerError> {
        if self.pages.is_empty() {
            return Err(SchedulerError::NoNextPage);
        }
        self.signals.raise(Intent::NextPage);
        Ok(())
    }

    /// Run the active page's action if it has one. Returns whether an action
    /// ran.
    pub async fn dispatch_action<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> bool {
        let Some(page) = self.pages.get_mut(self.active) else {
            return false;
        };
        if !page.capabilities().action {
            debug!("{} has no action", page.name());
            return false;
        }

        info!("Running action on {}", page.name());
        if let Err(e) = page.action(ctx).await {
            warn!("{} action failed: {}", page.name(), e);
        }
        self.show_full_header(ctx);
        true
    }

    pub async fn tick<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<TickOutcome, SchedulerError> {
        if self.pages.is_empty() {
            return Ok(TickOutcome::Empty);
        }

        if self.signals.take(Intent::PreviousPage) {
            debug!("Ignoring previous-page request");
        }

        if self.signals.take(Intent::NextPage) {
            self.switch_to_next(ctx).await?;
            return Ok(TickOutcome::Switched);
        }

        if self.signals.take(Intent::Action) {
            self.dispatch_action(ctx).await;
        }

        let period = to_ticks(self.pages[self.active].refresh_period(), self.config.tick);
        if self.elapsed >= period {
            debug!("Updating page {}", self.pages[self.active].name());
            self.render_active(ctx, false).await;
            self.show_full_header(ctx);
            self.elapsed = 0;
            return Ok(TickOutcome::Refreshed);
        }

        self.elapsed = self.elapsed.saturating_add(1);
        if self.header.tick() {
            self.render_active(ctx, true).await;
            self.draw_header(ctx, HeaderForm::Thin);
            return Ok(TickOutcome::HeaderThinned);
        }
        Ok(TickOutcome::Idle)
    }

    /// Start the scheduler and tick it forever at the configured period.
    pub async fn run<S: DisplaySink, T: Transport>(&mut self, ctx: &mut PageContext<'_, S, T>) -> ! {
        self.start();
        let mut ticker = Ticker::every(self.config.tick);
        loop {
            match self.tick(ctx).await {
                Ok(TickOutcome::Idle) => {}
                Ok(outcome) => debug!("Tick: {:?}", outcome),
                Err(e) => error!("{}", e),
            }
            if let Err(e) = ctx.sink.present() {
                warn!("Present failed: {}", e);
            }
            ticker.next().await;
        }
    }

    async fn switch_to_next<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
    ) -> Result<(), SchedulerError> {
        let outgoing = self.active;
        let incoming = (outgoing + 1) % self.pages.len();

        let page = &mut self.pages[outgoing];
        if page.capabilities().deinit
            && let Err(e) = page.deinit(ctx).await
        {
            warn!("{} deinit failed: {}", page.name(), e);
        }

        if let Err(e) = draw_loading(ctx.sink) {
            warn!("Loading placeholder failed: {}", e);
        }

        let page = &mut self.pages[incoming];
        if page.capabilities().init
            && let Err(error) = page.init(ctx).await
        {
            let name = page_name(page.name());
            error!("Page {} failed to initialise: {}", name, error);
            self.restore(outgoing, ctx).await;
            return Err(SchedulerError::PageInitFailure { name, error });
        }

        self.active = incoming;
        info!("Setting active page to {}", self.pages[incoming].name());
        self.activate(ctx).await;
        Ok(())
    }

    async fn restore<S: DisplaySink, T: Transport>(
        &mut self,
        index: usize,
        ctx: &mut PageContext<'_, S, T>,
    ) {
        let page = &mut self.pages[index];
        if page.capabilities().init
            && let Err(e) = page.init(ctx).await
        {
            error!("Page {} could not be restored: {}", page.name(), e);
        }
        self.active = index;
        self.activate(ctx).await;
    }

    async fn activate<S: DisplaySink, T: Transport>(&mut self, ctx: &mut PageContext<'_, S, T>) {
        self.render_active(ctx, true).await;
        self.show_full_header(ctx);
        self.elapsed = 0;
    }

    async fn render_active<S: DisplaySink, T: Transport>(
        &mut self,
        ctx: &mut PageContext<'_, S, T>,
        force: bool,
    ) {
        let page = &mut self.pages[self.active];
        if !page.capabilities().render {
            return;
        }
        if let Err(e) = page.render(ctx, force).await {
            warn!("Page {} render failed: {}", page.name(), e);
        }
    }

    fn show_full_header<S: DisplaySink, T>(&mut self, ctx: &mut PageContext<'_, S, T>) {
        self.header.show_full();
        self.draw_header(ctx, HeaderForm::Full);
    }

    fn draw_header<S: DisplaySink, T>(&self, ctx: &mut PageContext<'_, S, T>, form: HeaderForm) {
        let page = &self.pages[self.active];
        if let Err(e) = draw_header(ctx.sink, page.name(), page.theme(), form) {
            warn!("Header draw failed: {}", e);
        }
    }
}
