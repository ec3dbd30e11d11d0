//! CTC-toggle timer backend.
//!
//! Drives a STEP pin wired to a hardware timer's compare output. The timer
//! runs in clear-on-compare-match mode with output toggle, so one full
//! square-wave period takes `2 * (top + 1) * prescaler` timer clocks:
//!
//! ```text
//! f_real = clock_hz / (2 * prescaler * (top + 1))
//! ```
//!
//! The backend does no step counting; the arbiter bounds the motion by
//! calling [`CtcToggle::stop`] when the command's duration expires.

use crate::hal::CtcTimer;

/// Square-wave generator over a [`CtcTimer`].
#[derive(Debug)]
pub struct CtcToggle<T: CtcTimer> {
    timer: T,
}

impl<T: CtcTimer> CtcToggle<T> {
    /// Take ownership of a timer, leaving it stopped with the pin low.
    pub fn new(mut timer: T) -> Self {
        timer.stop();
        Self { timer }
    }

    /// Start (or retune) the square wave at `hz`.
    ///
    /// Picks the prescaler minimizing |f_real - hz| subject to the counter
    /// width, then the matching compare top clamped to `[1, max_top]`. Both
    /// are recomputed on every call; a running wave is simply retuned.
    pub fn set_frequency(&mut self, hz: u32) {
        if hz == 0 {
            self.stop();
            return;
        }

        let clock = self.timer.clock_hz() as u64;
        let max_top: u32 = if self.timer.counter_bits() <= 8 {
            255
        } else {
            65535
        };

        let mut best: Option<(u16, u16, u64)> = None; // (prescaler, top, |err| scaled)

        for &presc in self.timer.prescalers() {
            let denom = 2 * presc as u64 * hz as u64;
            if denom == 0 {
                continue;
            }

            // Round to the nearest counter period.
            let top_plus_one = ((clock + denom / 2) / denom).max(1);
            let top = (top_plus_one - 1).clamp(1, max_top as u64) as u32;

            // Compare achieved frequencies without floats:
            // |f_real - hz| ~ |clock - hz * 2 * presc * (top + 1)| / (...)
            let period_clocks = 2 * presc as u64 * (top as u64 + 1);
            let err = clock.abs_diff(hz as u64 * period_clocks);
            // Normalize by the period so prescalers compare fairly.
            let scaled = err * 1_000_000 / period_clocks;

            match best {
                Some((_, _, b)) if scaled >= b => {}
                _ => best = Some((presc, top as u16, scaled)),
            }
        }

        if let Some((presc, top, _)) = best {
            self.timer.start(presc, top);
        }
    }

    /// Stop the wave: disconnect the compare output, pin low.
    pub fn stop(&mut self) {
        self.timer.stop();
    }

    /// Access the underlying timer.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
