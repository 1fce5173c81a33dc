//! Consecutive-failure tracking for the backlight cutoff.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklightCommand {
    Off,
    On,
}

impl BacklightCommand {
    pub fn is_on(self) -> bool {
        self == BacklightCommand::On
    }
}

/// Counts failed stream cycles in a row. Crossing the threshold asks for the
/// backlight to go off once; the first success after that asks for it to come
/// back on once.
#[derive(Debug, Clone)]
pub struct FailureCounter {
    consecutive: u32,
    threshold: u32,
    tripped: bool,
}

impl FailureCounter {
    pub const fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold,
            tripped: false,
        }
    }

    pub fn record_failure(&mut self) -> Option<BacklightCommand> {
        self.consecutive = self.consecutive.saturating_add(1);
        if !self.tripped && self.consecutive >= self.threshold {
            self.tripped = true;
            return Some(BacklightCommand::Off);
        }
        None
    }

    pub fn record_success(&mut self) -> Option<BacklightCommand> {
        self.consecutive = 0;
        if self.tripped {
            self.tripped = false;
            return Some(BacklightCommand::On);
        }
        None
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}
