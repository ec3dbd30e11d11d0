//! Mock HAL implementations for host-side tests.
//!
//! Every mock is a cheap cloneable handle over shared interior state, so a
//! test can move one clone into an arbiter and keep another to drive
//! simulated hardware events (wrap IRQs, DMA delivery, the clock) and to
//! inspect what the motion core did.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use super::{Clock, CtcTimer, DmaChannel, PinFunction, PioStateMachine, PwmSlice, StepPin};

// ------------------------------------------------------------------
// STEP pin
// ------------------------------------------------------------------

#[derive(Debug)]
struct StepPinState {
    function: PinFunction,
    sio_level_low: bool,
    force_low_count: u32,
    mux_log: Vec<PinFunction>,
}

/// Mock STEP pin recording mux transfers and idle-low enforcement.
#[derive(Debug, Clone)]
pub struct MockStepPin {
    state: Rc<RefCell<StepPinState>>,
}

impl Default for MockStepPin {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStepPin {
    /// Fresh pin owned by SIO, driven low.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(StepPinState {
                function: PinFunction::Sio,
                sio_level_low: true,
                force_low_count: 0,
                mux_log: Vec::new(),
            })),
        }
    }

    /// Current pin-mux owner.
    pub fn function(&self) -> PinFunction {
        self.state.borrow().function
    }

    /// True when the pin is parked: owned by SIO and driven low.
    pub fn is_idle_low(&self) -> bool {
        let s = self.state.borrow();
        s.function == PinFunction::Sio && s.sio_level_low
    }

    /// How many times the idle-low fallback ran.
    pub fn force_low_count(&self) -> u32 {
        self.state.borrow().force_low_count
    }

    /// Every mux transfer in order, including the SIO reclaims.
    pub fn mux_history(&self) -> Vec<PinFunction> {
        self.state.borrow().mux_log.clone()
    }
}

impl StepPin for MockStepPin {
    fn set_function(&mut self, function: PinFunction) {
        let mut s = self.state.borrow_mut();
        s.function = function;
        s.mux_log.push(function);
    }

    fn force_low(&mut self) {
        let mut s = self.state.borrow_mut();
        s.function = PinFunction::Sio;
        s.sio_level_low = true;
        s.force_low_count += 1;
        s.mux_log.push(PinFunction::Sio);
    }
}

// ------------------------------------------------------------------
// DIR / ENABLE pin
// ------------------------------------------------------------------

#[derive(Debug, Default)]
struct OutputPinState {
    high: bool,
    history: Vec<bool>,
}

/// Mock plain output pin for DIR/ENABLE lines.
#[derive(Debug, Clone, Default)]
pub struct MockOutputPin {
    state: Rc<RefCell<OutputPinState>>,
}

impl MockOutputPin {
    /// Fresh low output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level.
    pub fn is_high(&self) -> bool {
        self.state.borrow().high
    }

    /// Every level write in order.
    pub fn history(&self) -> Vec<bool> {
        self.state.borrow().history.clone()
    }
}

impl embedded_hal::digital::ErrorType for MockOutputPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockOutputPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        s.high = true;
        s.history.push(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        s.high = false;
        s.history.push(false);
        Ok(())
    }
}

// ------------------------------------------------------------------
// Clock
// ------------------------------------------------------------------

/// Mock microsecond counter advanced manually by tests.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_us: Rc<RefCell<u64>>,
}

impl MockClock {
    /// Counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter starting at `now_us`.
    pub fn starting_at(now_us: u64) -> Self {
        Self {
            now_us: Rc::new(RefCell::new(now_us)),
        }
    }

    /// Advance the counter.
    pub fn advance_us(&self, delta: u64) {
        let next = self.now_us.borrow().wrapping_add(delta);
        *self.now_us.borrow_mut() = next;
    }

    /// Jump the counter to an absolute value.
    pub fn set_us(&self, now: u64) {
        *self.now_us.borrow_mut() = now;
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> u64 {
        *self.now_us.borrow()
    }
}

// ------------------------------------------------------------------
// CTC timer
// ------------------------------------------------------------------

#[derive(Debug, Default)]
struct CtcTimerState {
    running: bool,
    prescaler: u16,
    top: u16,
    starts: u32,
    stops: u32,
}

/// Mock CTC-toggle timer.
#[derive(Debug, Clone)]
pub struct MockCtcTimer {
    clock_hz: u32,
    counter_bits: u8,
    prescalers: Vec<u16>,
    state: Rc<RefCell<CtcTimerState>>,
}

impl MockCtcTimer {
    /// Timer with an explicit clock, counter width, and prescaler set.
    pub fn new(clock_hz: u32, counter_bits: u8, prescalers: &[u16]) -> Self {
        Self {
            clock_hz,
            counter_bits,
            prescalers: prescalers.to_vec(),
            state: Rc::new(RefCell::new(CtcTimerState::default())),
        }
    }

    /// 16 MHz AVR-style 16-bit timer with the classic prescaler ladder.
    pub fn avr16() -> Self {
        Self::new(16_000_000, 16, &[1, 8, 64, 256, 1024])
    }

    /// Is the counter running?
    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Last `(prescaler, top)` programmed.
    pub fn programmed(&self) -> (u16, u16) {
        let s = self.state.borrow();
        (s.prescaler, s.top)
    }

    /// Start/stop call counts, for ownership-transfer assertions.
    pub fn call_counts(&self) -> (u32, u32) {
        let s = self.state.borrow();
        (s.starts, s.stops)
    }
}

impl CtcTimer for MockCtcTimer {
    fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn counter_bits(&self) -> u8 {
        self.counter_bits
    }

    fn prescalers(&self) -> &[u16] {
        &self.prescalers
    }

    fn start(&mut self, prescaler: u16, top: u16) {
        let mut s = self.state.borrow_mut();
        s.running = true;
        s.prescaler = prescaler;
        s.top = top;
        s.starts += 1;
    }

    fn stop(&mut self) {
        let mut s = self.state.borrow_mut();
        s.running = false;
        s.stops += 1;
    }
}

// ------------------------------------------------------------------
// PWM slice
// ------------------------------------------------------------------

#[derive(Debug, Default)]
struct PwmSliceState {
    enabled: bool,
    divider_8_4: u16,
    wrap: u16,
    level: u16,
    counter_resets: u32,
    irq_enabled: bool,
    irq_pending: bool,
    pulses: u64,
}

/// Mock PWM slice counting simulated wraps as emitted pulses.
#[derive(Debug, Clone)]
pub struct MockPwmSlice {
    index: u8,
    state: Rc<RefCell<PwmSliceState>>,
}

impl MockPwmSlice {
    /// Slice with a fixed hardware index.
    pub fn new(index: u8) -> Self {
        Self {
            index,
            state: Rc::new(RefCell::new(PwmSliceState::default())),
        }
    }

    /// Simulate one counter wrap: one STEP pulse plus a pending IRQ when
    /// the IRQ is gated on. No effect while the slice is disabled.
    pub fn wrap(&self) {
        let mut s = self.state.borrow_mut();
        if !s.enabled {
            return;
        }
        s.pulses += 1;
        if s.irq_enabled {
            s.irq_pending = true;
        }
    }

    /// Pulses emitted since construction.
    pub fn pulses(&self) -> u64 {
        self.state.borrow().pulses
    }

    /// Is the slice counting?
    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    /// Is the wrap IRQ gated on?
    pub fn irq_enabled(&self) -> bool {
        self.state.borrow().irq_enabled
    }

    /// Last `(divider_8_4, wrap, level)` programmed.
    pub fn programmed(&self) -> (u16, u16, u16) {
        let s = self.state.borrow();
        (s.divider_8_4, s.wrap, s.level)
    }

    /// How many times the counter was reset.
    pub fn counter_resets(&self) -> u32 {
        self.state.borrow().counter_resets
    }
}

impl PwmSlice for MockPwmSlice {
    fn slice_index(&self) -> u8 {
        self.index
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.state.borrow_mut().enabled = enabled;
    }

    fn set_divider(&mut self, div_8_4: u16) {
        self.state.borrow_mut().divider_8_4 = div_8_4;
    }

    fn set_wrap(&mut self, wrap: u16) {
        self.state.borrow_mut().wrap = wrap;
    }

    fn set_level(&mut self, level: u16) {
        self.state.borrow_mut().level = level;
    }

    fn reset_counter(&mut self) {
        self.state.borrow_mut().counter_resets += 1;
    }

    fn irq_pending(&self) -> bool {
        self.state.borrow().irq_pending
    }

    fn clear_irq(&mut self) {
        self.state.borrow_mut().irq_pending = false;
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        self.state.borrow_mut().irq_enabled = enabled;
    }
}

// ------------------------------------------------------------------
// PIO state machine
// ------------------------------------------------------------------

#[derive(Debug, Default)]
struct PioState {
    enabled: bool,
    clkdiv: f32,
    tx_fifo: VecDeque<u32>,
    restarts: u32,
    fifo_clears: u32,
    pins_low_count: u32,
    program_installs: u32,
    pin_low: bool,
    stalled: bool,
    pulses: u64,
}

/// Mock PIO state machine executing the `(duty, steps)` pair protocol.
#[derive(Debug, Clone)]
pub struct MockPio {
    pio_index: u8,
    sm_index: u8,
    state: Rc<RefCell<PioState>>,
}

impl MockPio {
    /// State machine `sm` on PIO instance `pio`.
    pub fn new(pio: u8, sm: u8) -> Self {
        Self {
            pio_index: pio,
            sm_index: sm,
            state: Rc::new(RefCell::new(PioState {
                pin_low: true,
                ..PioState::default()
            })),
        }
    }

    /// Execute queued command pairs until the FIFO runs dry or the `(0, 0)`
    /// end marker is reached. Returns the pulses emitted by this run.
    ///
    /// Either way the machine ends stalled on a pull with STEP low, which
    /// is the hardware's steady state between streams.
    pub fn run_until_stalled(&self) -> u64 {
        let mut s = self.state.borrow_mut();
        if !s.enabled {
            return 0;
        }

        let mut emitted = 0u64;
        loop {
            let duty = match s.tx_fifo.pop_front() {
                Some(w) => w,
                None => break,
            };
            let steps = match s.tx_fifo.pop_front() {
                Some(w) => w,
                None => break,
            };

            if duty == 0 && steps == 0 {
                break;
            }

            emitted += steps as u64;
        }

        s.pulses += emitted;
        s.stalled = true;
        s.pin_low = true;
        emitted
    }

    /// Total pulses emitted across runs.
    pub fn pulses(&self) -> u64 {
        self.state.borrow().pulses
    }

    /// Words currently queued in the TX FIFO.
    pub fn queued_words(&self) -> Vec<u32> {
        self.state.borrow().tx_fifo.iter().copied().collect()
    }

    /// Is the machine enabled?
    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    /// Is the machine stalled waiting for a pull?
    pub fn is_stalled(&self) -> bool {
        self.state.borrow().stalled
    }

    /// Is the PIO-side pin level low?
    pub fn pin_low(&self) -> bool {
        self.state.borrow().pin_low
    }

    /// `(restarts, fifo_clears, pins_low, program_installs)` counters.
    pub fn call_counts(&self) -> (u32, u32, u32, u32) {
        let s = self.state.borrow();
        (s.restarts, s.fifo_clears, s.pins_low_count, s.program_installs)
    }
}

impl PioStateMachine for MockPio {
    fn pio_index(&self) -> u8 {
        self.pio_index
    }

    fn sm_index(&self) -> u8 {
        self.sm_index
    }

    fn set_enabled(&mut self, enabled: bool) {
        let mut s = self.state.borrow_mut();
        s.enabled = enabled;
        if enabled {
            s.stalled = false;
        }
    }

    fn clear_fifos(&mut self) {
        let mut s = self.state.borrow_mut();
        s.tx_fifo.clear();
        s.fifo_clears += 1;
    }

    fn restart(&mut self) {
        self.state.borrow_mut().restarts += 1;
    }

    fn set_pins_low(&mut self) {
        let mut s = self.state.borrow_mut();
        s.pin_low = true;
        s.pins_low_count += 1;
    }

    fn tx_put(&mut self, word: u32) {
        self.state.borrow_mut().tx_fifo.push_back(word);
    }

    fn install_program(&mut self) -> u32 {
        self.state.borrow_mut().program_installs += 1;
        0
    }

    fn set_clkdiv(&mut self, div: f32) {
        self.state.borrow_mut().clkdiv = div;
    }
}

// ------------------------------------------------------------------
// DMA channel
// ------------------------------------------------------------------

#[derive(Debug)]
struct DmaState {
    channels_available: usize,
    transfers: Vec<Vec<u32>>,
    busy: bool,
}

/// Mock DMA channel delivering stream words straight into a [`MockPio`]'s
/// TX FIFO (DREQ pacing collapsed to immediate delivery).
#[derive(Debug, Clone)]
pub struct MockDma {
    target: MockPio,
    state: Rc<RefCell<DmaState>>,
}

impl MockDma {
    /// Channel pool of `channels` feeding `target`.
    pub fn feeding(target: &MockPio, channels: usize) -> Self {
        Self {
            target: target.clone(),
            state: Rc::new(RefCell::new(DmaState {
                channels_available: channels,
                transfers: Vec::new(),
                busy: false,
            })),
        }
    }

    /// Pool with no free channels: every `try_start` fails.
    pub fn exhausted(target: &MockPio) -> Self {
        Self::feeding(target, 0)
    }

    /// Word arrays handed to the channel so far.
    pub fn transfers(&self) -> Vec<Vec<u32>> {
        self.state.borrow().transfers.clone()
    }
}

impl DmaChannel for MockDma {
    fn try_start(&mut self, words: &[u32]) -> bool {
        let mut s = self.state.borrow_mut();
        if s.channels_available == 0 {
            return false;
        }

        s.transfers.push(words.to_vec());
        s.busy = false; // synchronous delivery
        drop(s);

        let mut target = self.target.clone();
        for &w in words {
            target.tx_put(w);
        }
        true
    }

    fn busy(&self) -> bool {
        self.state.borrow().busy
    }

    fn abort(&mut self) {
        self.state.borrow_mut().busy = false;
    }
}
