//! Frame scheduling: three cadences (redraw, rotation, background) that run
//! independently off one clock. Time is injected so tests can drive it.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Ticks a cadence will replay after a hiccup before re-anchoring to now.
pub const MAX_CATCH_UP: u32 = 4;

pub trait Clock {
    /// Time since the clock's epoch.
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    period: Duration,
    next_due: Duration,
}

impl Cadence {
    /// First tick is due one period after `start`.
    pub fn new(period: Duration, start: Duration) -> Self {
        let period = period.max(Duration::from_micros(100));
        Self {
            period,
            next_due: start + period,
        }
    }

    pub fn from_hz(hz: f32, start: Duration) -> Self {
        let period = Duration::try_from_secs_f32(1.0 / hz)
            .ok()
            .filter(|_| hz.is_finite() && hz > 0.0)
            .unwrap_or(Duration::from_secs(1));
        Self::new(period, start)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    /// Number of periods that elapsed up to `now`, at most [`MAX_CATCH_UP`].
    pub fn due(&mut self, now: Duration) -> u32 {
        let mut ticks = 0;
        while self.next_due <= now {
            ticks += 1;
            self.next_due += self.period;
            if ticks == MAX_CATCH_UP {
                if self.next_due <= now {
                    self.next_due = now + self.period;
                }
                break;
            }
        }
        ticks
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadences {
    pub redraw_hz: f32,
    pub rotate_hz: f32,
    pub background_hz: f32,
}

impl Default for Cadences {
    fn default() -> Self {
        Self {
            redraw_hz: 60.0,
            rotate_hz: 50.0,
            background_hz: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ticks {
    pub redraw: bool,
    pub rotations: u32,
    pub background: bool,
}

impl Ticks {
    pub fn is_idle(&self) -> bool {
        !self.redraw && self.rotations == 0 && !self.background
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    redraw: Cadence,
    rotate: Cadence,
    background: Cadence,
}

impl Scheduler {
    pub fn new(cadences: Cadences, start: Duration) -> Self {
        Self {
            redraw: Cadence::from_hz(cadences.redraw_hz, start),
            rotate: Cadence::from_hz(cadences.rotate_hz, start),
            background: Cadence::from_hz(cadences.background_hz, start),
        }
    }

    /// Collects what became due. Missed redraws and background repaints
    /// collapse into one; rotations replay up to the catch-up limit.
    pub fn poll(&mut self, now: Duration) -> Ticks {
        Ticks {
            redraw: self.redraw.due(now) > 0,
            rotations: self.rotate.due(now),
            background: self.background.due(now) > 0,
        }
    }

    pub fn next_deadline(&self) -> Duration {
        self.redraw
            .next_due()
            .min(self.rotate.next_due())
            .min(self.background.next_due())
    }
}
