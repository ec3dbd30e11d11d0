//! Hardware trait seams.
//!
//! The motion core never touches registers; it drives these traits. DIR and
//! ENABLE are plain `embedded_hal::digital::OutputPin`s. Everything that
//! embedded-hal does not model (pin-mux ownership, PWM slices, PIO state
//! machines, DMA, the free-running microsecond counter) gets a crate-local
//! trait, implemented per MCU outside this crate and mocked in
//! [`mock`] for tests.

#[cfg(feature = "std")]
pub mod mock;

/// Multiplexed function a STEP pin can be owned by.
///
/// A STEP pin is owned by exactly one function at a time; transfers go
/// through the old owner's stop routine first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinFunction {
    /// Software GPIO (the idle owner).
    Sio,
    /// Hardware PWM slice output.
    Pwm,
    /// PIO instance 0.
    Pio0,
    /// PIO instance 1.
    Pio1,
}

/// A STEP pin with pin-mux control.
///
/// Whenever no backend is active the pin must be held LOW via software GPIO;
/// a disabled PWM slice leaves the level indeterminate, so [`force_low`]
/// must reclaim the pin for SIO and drive it low in one operation.
///
/// [`force_low`]: StepPin::force_low
pub trait StepPin {
    /// Hand the pin to a backend's function.
    fn set_function(&mut self, function: PinFunction);

    /// Reclaim the pin for SIO, configure it as output, drive it low.
    fn force_low(&mut self);
}

/// Free-running monotonic microsecond counter.
pub trait Clock {
    /// Current counter value in microseconds.
    fn now_us(&self) -> u64;
}

/// A hardware timer usable in clear-on-compare-match mode with output
/// toggle, producing a 50% square wave on its compare pin.
pub trait CtcTimer {
    /// Timer input clock in Hz (before prescaling).
    fn clock_hz(&self) -> u32;

    /// Counter width in bits (8 or 16); bounds the compare top value.
    fn counter_bits(&self) -> u8;

    /// Available prescaler divisors, ascending.
    fn prescalers(&self) -> &[u16];

    /// Start in CTC-toggle mode: set the prescaler and compare top, connect
    /// the compare output, reset and run the counter.
    fn start(&mut self, prescaler: u16, top: u16);

    /// Stop the counter, disconnect the compare output, drive the pin low.
    fn stop(&mut self);
}

/// One hardware PWM slice bound to a STEP pin.
pub trait PwmSlice {
    /// Hardware slice index (used by diagnostics and IRQ bookkeeping).
    fn slice_index(&self) -> u8;

    /// Run or halt the counter.
    fn set_enabled(&mut self, enabled: bool);

    /// Clock divider in the hardware's 8.4 fixed-point encoding.
    fn set_divider(&mut self, div_8_4: u16);

    /// Counter wrap (TOP) value.
    fn set_wrap(&mut self, wrap: u16);

    /// Compare level for the bound channel.
    fn set_level(&mut self, level: u16);

    /// Reset the counter to zero.
    fn reset_counter(&mut self);

    /// Is this slice's wrap interrupt pending?
    fn irq_pending(&self) -> bool;

    /// Acknowledge this slice's wrap interrupt.
    fn clear_irq(&mut self);

    /// Gate this slice's wrap interrupt.
    fn set_irq_enabled(&mut self, enabled: bool);
}

/// One PIO state machine loaded with the pulse program.
///
/// The pulse program consumes `(duty_period, steps)` word pairs from the TX
/// FIFO: toggle STEP high, wait `duty_period` cycles, toggle low, wait
/// again, repeat `steps` times, pull the next pair. A `(0, 0)` pair is the
/// stream end marker and leaves the machine stalled on the next pull.
pub trait PioStateMachine {
    /// PIO instance index (0 or 1).
    fn pio_index(&self) -> u8;

    /// State machine index within the instance (0..=3).
    fn sm_index(&self) -> u8;

    /// Run or halt the state machine.
    fn set_enabled(&mut self, enabled: bool);

    /// Drain both FIFOs.
    fn clear_fifos(&mut self);

    /// Restart execution state (PC, X, Y, ISR, OSR).
    fn restart(&mut self);

    /// Inject a one-shot `SET PINS, 0` so the bound pin is driven low from
    /// the PIO side.
    fn set_pins_low(&mut self);

    /// Blocking TX-FIFO put. Bounded in practice: the FIFO drains in
    /// microseconds and callers push at most two words.
    fn tx_put(&mut self, word: u32);

    /// Load the pulse program into this instance's program memory and
    /// return its offset. Callers must go through
    /// [`PioProgramCache`](crate::backend::PioProgramCache) so each
    /// instance is loaded at most once.
    fn install_program(&mut self) -> u32;

    /// State machine clock divider.
    fn set_clkdiv(&mut self, div: f32);
}

/// A DMA channel able to feed a PIO TX FIFO, paced by its DREQ.
pub trait DmaChannel {
    /// Claim a channel and start a 32-bit, read-increment,
    /// write-fixed transfer of `words` into the paired state machine's TX
    /// FIFO. Returns false when no channel could be claimed.
    ///
    /// The caller keeps `words` alive until the transfer finishes or is
    /// aborted; implementations that cannot guarantee that must copy.
    fn try_start(&mut self, words: &[u32]) -> bool;

    /// Is a transfer still in flight?
    fn busy(&self) -> bool;

    /// Abort any in-flight transfer and release the channel.
    fn abort(&mut self);
}

/// Placeholder output pin for motors without an ENABLE line.
///
/// All operations succeed and do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl embedded_hal::digital::ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for NoPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Placeholder timer for motors whose STEP pin has no compare output.
///
/// Never started by the arbiter; requesting the timer backend without a
/// bound timer is reported as an error before these methods run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTimer;

impl CtcTimer for NoTimer {
    fn clock_hz(&self) -> u32 {
        0
    }

    fn counter_bits(&self) -> u8 {
        16
    }

    fn prescalers(&self) -> &[u16] {
        &[]
    }

    fn start(&mut self, _prescaler: u16, _top: u16) {}

    fn stop(&mut self) {}
}
