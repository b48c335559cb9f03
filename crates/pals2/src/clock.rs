//! Millisecond time source used to bound the on-demand handshake.

/// A monotonically non-decreasing millisecond counter.
pub trait Clock {
    fn now_ms(&mut self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now_ms(&mut self) -> u64 {
        (**self).now_ms()
    }
}

/// [`Clock`] backed by the embassy time driver.
#[cfg(feature = "embassy-time")]
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

#[cfg(feature = "embassy-time")]
impl Clock for EmbassyClock {
    fn now_ms(&mut self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}

/// Outcome of waiting for a conversion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionStatus {
    /// The conversion-done flag was observed.
    Ready,
    /// The deadline passed first; the data registers may hold stale values.
    TimedOut,
}

/// Start time plus budget, checked against a [`Clock`].
#[derive(Debug, Copy, Clone)]
pub(crate) struct Deadline {
    start: u64,
    timeout_ms: u64,
}

impl Deadline {
    pub fn start<C: Clock>(clock: &mut C, timeout_ms: u64) -> Self {
        Self { start: clock.now_ms(), timeout_ms }
    }

    /// True once strictly more than `timeout_ms` has elapsed.
    pub fn expired<C: Clock>(&self, clock: &mut C) -> bool {
        clock.now_ms().saturating_sub(self.start) > self.timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Manual(u64);

    impl Clock for Manual {
        fn now_ms(&mut self) -> u64 {
            self.0
        }
    }

    #[test]
    fn deadline_is_exclusive() {
        let mut clock = Manual(500);
        let deadline = Deadline::start(&mut clock, 1000);
        clock.0 = 1500;
        assert!(!deadline.expired(&mut clock));
        clock.0 = 1501;
        assert!(deadline.expired(&mut clock));
    }

    #[test]
    fn clock_going_backwards_never_expires() {
        let mut clock = Manual(500);
        let deadline = Deadline::start(&mut clock, 1000);
        clock.0 = 0;
        assert!(!deadline.expired(&mut clock));
    }
}
