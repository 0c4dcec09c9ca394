//! Frame clock port.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

/// Source of rendering ticks that pace the detection loop.
pub trait FrameClock: Send + Sync {
    /// Returns a channel that yields one instant per rendering tick.
    ///
    /// Ticks that arrive while the loop is busy may be dropped.
    fn ticks(&self) -> Receiver<Instant>;
}

/// Clock ticking at a fixed display refresh rate.
#[derive(Debug, Clone, Copy)]
pub struct RefreshClock {
    period: Duration,
}

impl RefreshClock {
    /// Default display refresh rate.
    pub const DEFAULT_HZ: f64 = 60.0;

    /// Creates a clock ticking `hz` times per second.
    ///
    /// Non-positive or non-finite rates fall back to [`Self::DEFAULT_HZ`].
    #[must_use]
    pub fn new(hz: f64) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 {
            hz
        } else {
            Self::DEFAULT_HZ
        };
        Self {
            period: Duration::from_secs_f64(1.0 / hz),
        }
    }

    /// Tick period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

impl Default for RefreshClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HZ)
    }
}

impl FrameClock for RefreshClock {
    fn ticks(&self) -> Receiver<Instant> {
        crossbeam_channel::tick(self.period)
    }
}
