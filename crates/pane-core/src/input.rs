//! Button gesture classification and the flags it raises.
//!
//! The device has a single push button. [`ButtonClassifier`] turns debounced
//! press/release edges into gestures, each gesture maps to an [`Intent`], and
//! the intent is raised on [`InputSignals`], which the scheduler or the
//! streamer test-and-clear at their next tick.
//!
//! | Gesture     | Intent        |
//! |-------------|---------------|
//! | single tap  | next page     |
//! | double tap  | previous page |
//! | long press  | page action   |

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use log::{debug, warn};

pub const DEBOUNCE: Duration = Duration::from_millis(20);
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
pub const LONG_PRESS: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// One or more taps, each released within the double-tap window of the
    /// previous one.
    Tap(u8),
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    NextPage,
    PreviousPage,
    Action,
}

impl Gesture {
    pub fn intent(self) -> Option<Intent> {
        match self {
            Gesture::Tap(1) => Some(Intent::NextPage),
            Gesture::Tap(2) => Some(Intent::PreviousPage),
            Gesture::Tap(_) => None,
            Gesture::LongPress => Some(Intent::Action),
        }
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Flags shared between the button context and the tick loop.
///
/// Raising a flag that is already raised is a no-op, so requests made between
/// two ticks collapse into one.
pub struct InputSignals {
    next_page: AtomicBool,
    previous_page: AtomicBool,
    action: AtomicBool,
}

impl Default for InputSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSignals {
    pub const fn new() -> Self {
        Self {
            next_page: AtomicBool::new(false),
            previous_page: AtomicBool::new(false),
            action: AtomicBool::new(false),
        }
    }

    fn flag(&self, intent: Intent) -> &AtomicBool {
        match intent {
            Intent::NextPage => &self.next_page,
            Intent::PreviousPage => &self.previous_page,
            Intent::Action => &self.action,
        }
    }

    pub fn raise(&self, intent: Intent) {
        self.flag(intent).store(true, Ordering::Release);
    }

    /// Clear the flag and report whether it was set.
    pub fn take(&self, intent: Intent) -> bool {
        self.flag(intent).swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self, intent: Intent) -> bool {
        self.flag(intent).load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub double_tap_window: Duration,
    pub long_press: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            double_tap_window: DOUBLE_TAP_WINDOW,
            long_press: LONG_PRESS,
        }
    }
}

/// Edge-driven gesture recogniser. Time is passed in so the classifier can be
/// driven by a real clock on the device and by fixed instants in tests.
#[derive(Debug, Clone)]
pub struct ButtonClassifier {
    config: ClassifierConfig,
    pressed_at: Option<Instant>,
    long_fired: bool,
    taps: u8,
    last_release: Option<Instant>,
}

impl ButtonClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            pressed_at: None,
            long_fired: false,
            taps: 0,
            last_release: None,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    pub fn on_press(&mut self, now: Instant) {
        if self.pressed_at.is_none() {
            self.pressed_at = Some(now);
            self.long_fired = false;
        }
    }

    /// A release completes a long press that was not yet reported by
    /// [`poll`](Self::poll); otherwise it counts a tap.
    pub fn on_release(&mut self, now: Instant) -> Option<Gesture> {
        let start = self.pressed_at.take()?;
        if self.long_fired {
            self.long_fired = false;
            return None;
        }
        if now.saturating_duration_since(start) >= self.config.long_press {
            self.reset_taps();
            return Some(Gesture::LongPress);
        }
        self.taps = self.taps.saturating_add(1);
        self.last_release = Some(now);
        None
    }

    /// Report a gesture whose deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Gesture> {
        if let Some(start) = self.pressed_at {
            if !self.long_fired && now.saturating_duration_since(start) >= self.config.long_press
            {
                self.long_fired = true;
                self.reset_taps();
                return Some(Gesture::LongPress);
            }
            return None;
        }

        let released = self.last_release?;
        if self.taps > 0
            && now.saturating_duration_since(released) >= self.config.double_tap_window
        {
            let taps = self.taps;
            self.reset_taps();
            return Some(Gesture::Tap(taps));
        }
        None
    }

    /// When [`poll`](Self::poll) next has something to report if no edge
    /// arrives first.
    pub fn next_deadline(&self) -> Option<Instant> {
        if let Some(start) = self.pressed_at {
            return (!self.long_fired).then_some(start + self.config.long_press);
        }
        match self.last_release {
            Some(released) if self.taps > 0 => Some(released + self.config.double_tap_window),
            _ => None,
        }
    }

    fn reset_taps(&mut self) {
        self.taps = 0;
        self.last_release = None;
    }
}

fn dispatch(gesture: Gesture, signals: &InputSignals) {
    match gesture.intent() {
        Some(intent) => {
            debug!("Button {:?} -> {:?}", gesture, intent);
            signals.raise(intent);
        }
        None => debug!("Ignoring button {:?}", gesture),
    }
}

/// Watch a button pin forever, raising intents on `signals`.
///
/// `active_low` is true for the usual pull-up wiring where a press pulls the
/// pin to ground.
pub async fn watch_button<P>(
    mut pin: P,
    active_low: bool,
    signals: &InputSignals,
    config: ClassifierConfig,
) -> !
where
    P: Wait + InputPin,
{
    let mut classifier = ButtonClassifier::new(config);

    loop {
        let edge = match classifier.next_deadline() {
            Some(deadline) => match select(pin.wait_for_any_edge(), Timer::at(deadline)).await {
                Either::First(result) => Some(result),
                Either::Second(()) => None,
            },
            None => Some(pin.wait_for_any_edge().await),
        };

        if let Some(result) = edge {
            if let Err(e) = result {
                warn!("Button wait failed: {:?}", e);
            }
            Timer::after(DEBOUNCE).await;

            match pin.is_low() {
                Ok(low) => {
                    let pressed = low == active_low;
                    let now = Instant::now();
                    if pressed && !classifier.is_pressed() {
                        classifier.on_press(now);
                    } else if !pressed
                        && classifier.is_pressed()
                        && let Some(gesture) = classifier.on_release(now)
                    {
                        dispatch(gesture, signals);
                    }
                }
                Err(e) => warn!("Button read failed: {:?}", e),
            }
        }

        if let Some(gesture) = classifier.poll(Instant::now()) {
            dispatch(gesture, signals);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn classifier() -> ButtonClassifier {
        ButtonClassifier::new(ClassifierConfig::default())
    }

    #[test]
    fn test_single_tap_after_window() {
        let mut c = classifier();
        c.on_press(at(0));
        assert_eq!(c.on_release(at(80)), None);
        assert_eq!(c.poll(at(200)), None);
        assert_eq!(c.next_deadline(), Some(at(380)));
        assert_eq!(c.poll(at(380)), Some(Gesture::Tap(1)));
        assert_eq!(c.poll(at(1000)), None);
    }

    #[test]
    fn test_double_tap() {
        let mut c = classifier();
        c.on_press(at(0));
        c.on_release(at(60));
        c.on_press(at(200));
        assert_eq!(c.poll(at(250)), None);
        c.on_release(at(260));
        assert_eq!(c.poll(at(559)), None);
        assert_eq!(c.poll(at(560)), Some(Gesture::Tap(2)));
    }

    #[test]
    fn test_long_press_reported_while_held() {
        let mut c = classifier();
        c.on_press(at(0));
        assert_eq!(c.next_deadline(), Some(at(800)));
        assert_eq!(c.poll(at(799)), None);
        assert_eq!(c.poll(at(800)), Some(Gesture::LongPress));
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.on_release(at(1500)), None);
        assert_eq!(c.poll(at(3000)), None);
    }

    #[test]
    fn test_long_press_reported_on_late_release() {
        let mut c = classifier();
        c.on_press(at(0));
        assert_eq!(c.on_release(at(900)), Some(Gesture::LongPress));
        assert_eq!(c.poll(at(2000)), None);
    }

    #[test]
    fn test_tap_then_long_press_drops_tap() {
        let mut c = classifier();
        c.on_press(at(0));
        c.on_release(at(50));
        c.on_press(at(150));
        assert_eq!(c.poll(at(950)), Some(Gesture::LongPress));
        c.on_release(at(1000));
        assert_eq!(c.poll(at(2000)), None);
    }

    #[test]
    fn test_gesture_intents() {
        assert_eq!(Gesture::Tap(1).intent(), Some(Intent::NextPage));
        assert_eq!(Gesture::Tap(2).intent(), Some(Intent::PreviousPage));
        assert_eq!(Gesture::Tap(3).intent(), None);
        assert_eq!(Gesture::LongPress.intent(), Some(Intent::Action));
    }

    #[test]
    fn test_signals_take_clears() {
        let signals = InputSignals::new();
        assert!(!signals.take(Intent::NextPage));
        signals.raise(Intent::NextPage);
        signals.raise(Intent::NextPage);
        assert!(signals.is_pending(Intent::NextPage));
        assert!(!signals.is_pending(Intent::Action));
        assert!(signals.take(Intent::NextPage));
        assert!(!signals.take(Intent::NextPage));
    }

    #[test]
    fn test_dispatch_raises_intent() {
        let signals = InputSignals::new();
        dispatch(Gesture::LongPress, &signals);
        dispatch(Gesture::Tap(5), &signals);
        assert!(signals.take(Intent::Action));
        assert!(!signals.take(Intent::NextPage));
        assert!(!signals.take(Intent::PreviousPage));
    }
}
