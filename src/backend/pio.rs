//! PIO pulse-engine backend.
//!
//! A small state machine executes a 2-word command protocol: for each
//! `(duty_period, steps)` pair it raises STEP, waits `duty_period` cycles,
//! drops STEP, waits again, and repeats `steps` times before pulling the
//! next pair. A `(0, 0)` pair ends the stream and leaves the machine
//! stalled on a pull with STEP low.
//!
//! Two submission modes:
//!
//! - **Parametric**: exactly one pair, pushed with two blocking FIFO puts.
//! - **Stream**: a caller-built word array handed to a DMA channel paced by
//!   the machine's TX DREQ. The array must end with the `(0, 0)` marker or
//!   the machine will free-run into stale FIFO residue on the next command.
//!
//! Before every new command the machine goes through a fixed reset
//! sequence (disable, drain FIFOs, restart, force the pin low from the PIO
//! side, re-enable). Skipping any step yields ghost pulses or a stuck-high
//! STEP line.

use crate::error::BackendError;
use crate::hal::{DmaChannel, PioStateMachine};

/// Stream terminator pair.
pub const END_MARKER: [u32; 2] = [0, 0];

/// Idempotent per-instance loader for the pulse program.
///
/// Program memory belongs to the PIO instance, not to any one state
/// machine; two motors on the same instance share one loaded copy. All
/// executors are built through one cache so each instance is programmed at
/// most once.
#[derive(Debug, Default)]
pub struct PioProgramCache {
    loaded: [bool; 2],
    offset: [u32; 2],
}

impl PioProgramCache {
    /// Empty cache; nothing loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the program into `sm`'s instance unless already resident, and
    /// return its offset.
    pub fn ensure_loaded<S: PioStateMachine>(&mut self, sm: &mut S) -> u32 {
        let idx = (sm.pio_index() & 1) as usize;
        if !self.loaded[idx] {
            self.offset[idx] = sm.install_program();
            self.loaded[idx] = true;
        }
        self.offset[idx]
    }

    /// Offset of the program on instance `pio`, if loaded.
    pub fn offset(&self, pio: u8) -> Option<u32> {
        let idx = (pio & 1) as usize;
        self.loaded[idx].then_some(self.offset[idx])
    }
}

/// Command executor over one PIO state machine and its DMA feed.
#[derive(Debug)]
pub struct PioExec<S: PioStateMachine, D: DmaChannel> {
    sm: S,
    dma: D,
    program_offset: u32,
}

impl<S: PioStateMachine, D: DmaChannel> PioExec<S, D> {
    /// Bind a state machine slot.
    ///
    /// Loads the program through `cache` (once per instance), applies the
    /// clock divider, and leaves the machine disabled; it only runs while a
    /// command is in flight.
    pub fn new(mut sm: S, dma: D, cache: &mut PioProgramCache, clk_div: f32) -> Self {
        let program_offset = cache.ensure_loaded(&mut sm);
        sm.set_clkdiv(clk_div);
        sm.set_enabled(false);
        Self {
            sm,
            dma,
            program_offset,
        }
    }

    /// Full state-machine reset, run before every new command:
    ///
    /// 1. disable, 2. drain FIFOs, 3. restart (PC/X/Y/ISR/OSR),
    /// 4. force the pin low from the PIO side, 5. re-enable.
    pub fn reset(&mut self) {
        self.sm.set_enabled(false);
        self.sm.clear_fifos();
        self.sm.restart();
        self.sm.set_pins_low();
        self.sm.set_enabled(true);
    }

    /// Parametric mode: push one `(duty, steps)` pair.
    ///
    /// The puts block on FIFO space, bounded by two words draining in
    /// microseconds.
    pub fn run_pair(&mut self, duty: u32, steps: u32) {
        self.sm.tx_put(duty);
        self.sm.tx_put(steps);
    }

    /// Stream mode: hand `words` to the DMA channel.
    ///
    /// `words` must stay alive for the transfer and end with [`END_MARKER`].
    pub fn start_stream(&mut self, words: &[u32]) -> Result<(), BackendError> {
        if self.dma.try_start(words) {
            Ok(())
        } else {
            Err(BackendError::DmaExhausted)
        }
    }

    /// Hard stop: abort any stream, then disable / drain / restart / pin
    /// low. The machine stays disabled until the next [`reset`](Self::reset).
    pub fn hard_stop(&mut self) {
        self.dma.abort();
        self.sm.set_enabled(false);
        self.sm.clear_fifos();
        self.sm.restart();
        self.sm.set_pins_low();
    }

    /// Halt the machine without touching FIFO or pin state (used when
    /// handing the STEP pin to another backend while nothing is queued).
    pub fn disable(&mut self) {
        self.sm.set_enabled(false);
    }

    /// PIO instance index of the bound slot.
    pub fn pio_index(&self) -> u8 {
        self.sm.pio_index()
    }

    /// State machine index of the bound slot.
    pub fn sm_index(&self) -> u8 {
        self.sm.sm_index()
    }

    /// Offset the pulse program was loaded at.
    pub fn program_offset(&self) -> u32 {
        self.program_offset
    }

    /// Access the underlying state machine.
    pub fn state_machine(&self) -> &S {
        &self.sm
    }
}
