//! Per-motor command arbiter.
//!
//! A [`MotorArbiter`] owns one motor end to end: the STEP pin (and its mux),
//! the DIR and optional ENABLE pins, one PWM slice, one PIO state-machine
//! slot with its DMA feed, optionally a CTC timer, and the COM1/COM2
//! command slot. It translates a monotonic stream of motion commands into
//! backend starts and stops under last-command-wins semantics.
//!
//! Invariants the arbiter maintains:
//!
//! - At most one command Running at a time; a newer command interrupts the
//!   older one with the hardware stopped before the new backend is armed.
//! - A STEP pin is owned by exactly one function at a time; transfers are
//!   routed through the old owner's stop path, never left ambiguous.
//! - Whenever no backend is active, STEP is parked GPIO-low (a disabled
//!   PWM slice's level is indeterminate, so SIO must reclaim the pin).
//! - `busy()` and `last_completion()` settle natural expiry before
//!   answering, so reads are always fresh.

use embedded_hal::digital::OutputPin;

use crate::backend::{ActiveBackend, CtcToggle, PioExec, PwmStepper, StepBackend};
use crate::error::{Error, MotorError, Result};
use crate::hal::{
    Clock, CtcTimer, DmaChannel, NoPin, NoTimer, PinFunction, PioStateMachine, PwmSlice, StepPin,
};
use crate::timing;

use super::slot::{CommandSlot, CompletionReason};

/// Command arbiter for one motor.
///
/// Generic over the hardware seams; see [`crate::hal`] for the traits and
/// [`crate::hal::mock`] for host-side test doubles. `EN` and `TIM` default
/// to placeholders for motors without an ENABLE line or timer backend.
pub struct MotorArbiter<STEP, DIR, PWM, SM, DMA, CLK, EN = NoPin, TIM = NoTimer>
where
    STEP: StepPin,
    DIR: OutputPin,
    PWM: PwmSlice,
    SM: PioStateMachine,
    DMA: DmaChannel,
    CLK: Clock,
    EN: OutputPin,
    TIM: CtcTimer,
{
    step: STEP,
    dir: DIR,
    enable: Option<EN>,
    pwm: PwmStepper<PWM>,
    pio: PioExec<SM, DMA>,
    timer: Option<CtcToggle<TIM>>,
    clock: CLK,
    sys_clock_hz: u32,
    dir_invert: bool,
    enable_invert: bool,
    slot: CommandSlot,
    active: ActiveBackend,
}

impl<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM> MotorArbiter<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>
where
    STEP: StepPin,
    DIR: OutputPin,
    PWM: PwmSlice,
    SM: PioStateMachine,
    DMA: DmaChannel,
    CLK: Clock,
    EN: OutputPin,
    TIM: CtcTimer,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        step: STEP,
        dir: DIR,
        enable: Option<EN>,
        pwm: PwmStepper<PWM>,
        pio: PioExec<SM, DMA>,
        timer: Option<CtcToggle<TIM>>,
        clock: CLK,
        sys_clock_hz: u32,
        dir_invert: bool,
        enable_invert: bool,
    ) -> Self {
        Self {
            step,
            dir,
            enable,
            pwm,
            pio,
            timer,
            clock,
            sys_clock_hz,
            dir_invert,
            enable_invert,
            slot: CommandSlot::new(),
            active: ActiveBackend::None,
        }
    }

    /// Bring the motor to its safe idle state.
    ///
    /// STEP parked GPIO-low, direction forward, driver disabled (when an
    /// ENABLE pin exists), PWM slice parked, PIO slot disabled, slot fresh.
    pub fn init(&mut self) -> Result<()> {
        self.step.force_low();
        self.set_direction(true)?;
        if self.enable.is_some() {
            self.disable()?;
        }

        self.pwm.init();
        self.pio.disable();

        self.step.force_low();
        self.slot = CommandSlot::new();
        self.active = ActiveBackend::None;
        Ok(())
    }

    /// Drive ENABLE to its active polarity. No-op without an ENABLE pin.
    pub fn enable(&mut self) -> Result<()> {
        if let Some(pin) = self.enable.as_mut() {
            set_level(pin, !self.enable_invert)?;
        }
        Ok(())
    }

    /// Drive ENABLE to its inactive polarity. No-op without an ENABLE pin.
    pub fn disable(&mut self) -> Result<()> {
        if let Some(pin) = self.enable.as_mut() {
            set_level(pin, self.enable_invert)?;
        }
        Ok(())
    }

    /// Set the rotation sense: `DIR = forward XOR dir_invert`.
    pub fn set_direction(&mut self, forward: bool) -> Result<()> {
        set_level(&mut self.dir, forward ^ self.dir_invert)
    }

    /// Settle natural completion. Pure state transition; the backend's own
    /// completion mechanism (PWM countdown, stream exhaustion) handles the
    /// waveform side, this merely reflects the time-based truth.
    pub fn update(&mut self) {
        self.slot.update(self.clock.now_us());
    }

    /// Main-loop service entry: settle natural completion, then silence the
    /// timer backend if its command just expired.
    ///
    /// The PWM and PIO backends stop their own waveforms (IRQ countdown,
    /// stream exhaustion), so `update()` alone suffices for them. The CTC
    /// timer free-runs and has no completion mechanism, so its duration is
    /// enforced here.
    pub fn poll(&mut self) {
        self.update();

        if !self.slot.is_running() && self.active == ActiveBackend::Timer {
            if let Some(timer) = self.timer.as_mut() {
                timer.stop();
            }
            self.active = ActiveBackend::None;
            self.step.force_low();
        }
    }

    /// Is a command running? (update-on-read)
    pub fn busy(&mut self) -> bool {
        self.update();
        self.slot.is_running()
    }

    /// How did the last command end? (update-on-read)
    pub fn last_completion(&mut self) -> CompletionReason {
        self.update();
        self.slot.last_completion()
    }

    /// Run `steps` pulses at `freq_hz` on the chosen backend, step-bounded
    /// and non-blocking. A zero step count or frequency completes
    /// immediately as a no-op.
    pub fn run_steps(&mut self, steps: u32, freq_hz: u32, backend: StepBackend) -> Result<()> {
        // Refuse before arbitration so a running command survives the error.
        if backend == StepBackend::Timer && self.timer.is_none() {
            return Err(Error::Motor(MotorError::TimerNotBound));
        }

        // Settle natural completion first.
        self.update();

        // A still-running command is interrupted: hardware stopped before
        // the new command is armed.
        if self.slot.is_running() {
            self.terminate_hardware();
            self.slot.interrupt();
        }

        if steps == 0 || freq_hz == 0 {
            self.slot.complete_noop();
            self.active = ActiveBackend::None;
            self.step.force_low();
            return Ok(());
        }

        match backend {
            StepBackend::Pwm => {
                // Make sure the PIO side is quiet, then hand the pin over.
                self.pio.disable();
                self.step.set_function(PinFunction::Pwm);

                self.pwm.run(self.sys_clock_hz, freq_hz, steps);
                self.active = ActiveBackend::Pwm;
            }
            StepBackend::Pio => {
                // Switching away from PWM always goes through its stop path.
                self.pwm.stop(&mut self.step);
                let func = self.pio_function();
                self.step.set_function(func);

                self.pio.reset();
                let duty = timing::hz_to_duty(self.sys_clock_hz, freq_hz as f64);
                self.pio.run_pair(duty, steps);
                self.active = ActiveBackend::PioParam;
            }
            StepBackend::Timer => {
                self.pwm.stop(&mut self.step);
                self.pio.disable();

                if let Some(timer) = self.timer.as_mut() {
                    timer.set_frequency(freq_hz);
                }
                self.active = ActiveBackend::Timer;
            }
        }

        let duration_us = steps as u64 * 1_000_000 / freq_hz as u64;
        self.slot
            .begin(self.clock.now_us().wrapping_add(duration_us));
        Ok(())
    }

    /// Run at `freq_hz` for `duration_ms`, time-bounded. Equivalent to
    /// `run_steps(duration_to_steps(ms / 1000, hz), hz, backend)`.
    pub fn run_velocity(&mut self, freq_hz: u32, duration_ms: u32, backend: StepBackend) -> Result<()> {
        let steps = timing::duration_to_steps(duration_ms as f64 / 1000.0, freq_hz as f64);
        self.run_steps(steps, freq_hz, backend)
    }

    /// Feed a pre-built `(duty, steps)` word stream to the PIO slot via
    /// DMA. `words` must end with the `(0, 0)` marker and stay alive until
    /// the stream finishes or the motor is stopped.
    ///
    /// `estimated_duration_us` is the caller's wall-clock estimate for the
    /// whole stream (see
    /// [`ScurveStream::estimated_duration_us`](crate::profile::ScurveStream::estimated_duration_us)).
    ///
    /// On DMA exhaustion the command is dropped — COM2 stays Empty and COM1
    /// reads Completed — and the error is surfaced so the caller can log it.
    pub fn run_pio_stream(&mut self, words: &[u32], estimated_duration_us: u64) -> Result<()> {
        self.update();

        if words.is_empty() || estimated_duration_us == 0 {
            self.slot.complete_noop();
            self.active = ActiveBackend::None;
            self.step.force_low();
            return Ok(());
        }

        if self.slot.is_running() {
            self.terminate_hardware();
            self.slot.interrupt();
        }

        self.pwm.stop(&mut self.step);
        let func = self.pio_function();
        self.step.set_function(func);
        self.pio.reset();

        if let Err(e) = self.pio.start_stream(words) {
            self.slot.complete_noop();
            self.active = ActiveBackend::None;
            self.step.force_low();
            return Err(e.into());
        }

        self.active = ActiveBackend::PioStream;
        self.slot
            .begin(self.clock.now_us().wrapping_add(estimated_duration_us));
        Ok(())
    }

    /// Immediate hardware termination. A running command ends with reason
    /// `Stopped`; an idle motor still gets its hardware forced safe.
    pub fn stop(&mut self) {
        self.update();

        if !self.slot.is_running() {
            self.terminate_hardware();
            self.step.force_low();
            return;
        }

        self.terminate_hardware();
        self.slot.stop();
        self.step.force_low();
    }

    /// Service this motor's share of the shared PWM wrap interrupt.
    ///
    /// Call from the platform's wrap handler (or a polling loop) for every
    /// arbiter; motors whose slice has nothing pending return immediately.
    /// Returns true when the countdown finished on this call.
    pub fn service_irq(&mut self) -> bool {
        self.pwm.service_irq(&mut self.step)
    }

    /// Backend currently holding the STEP pin.
    pub fn active_backend(&self) -> ActiveBackend {
        self.active
    }

    /// The (PIO instance, state machine) slot this motor owns.
    pub fn execution_slot(&self) -> (u8, u8) {
        (self.pio.pio_index(), self.pio.sm_index())
    }

    fn pio_function(&self) -> PinFunction {
        if self.pio.pio_index() == 0 {
            PinFunction::Pio0
        } else {
            PinFunction::Pio1
        }
    }

    /// Stop whichever backend is active. Dispatches on the tracker; the
    /// idle case still parks the pin as a fallback.
    fn terminate_hardware(&mut self) {
        match self.active {
            ActiveBackend::Pwm => self.pwm.stop(&mut self.step),
            ActiveBackend::PioParam | ActiveBackend::PioStream => self.pio.hard_stop(),
            ActiveBackend::Timer => {
                if let Some(timer) = self.timer.as_mut() {
                    timer.stop();
                }
                self.step.force_low();
            }
            ActiveBackend::None => self.step.force_low(),
        }

        self.active = ActiveBackend::None;
    }
}

fn set_level<P: OutputPin>(pin: &mut P, high: bool) -> Result<()> {
    let r = if high { pin.set_high() } else { pin.set_low() };
    r.map_err(|_| Error::Motor(MotorError::PinError))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PioProgramCache;
    use crate::hal::mock::{
        MockClock, MockCtcTimer, MockDma, MockOutputPin, MockPio, MockPwmSlice, MockStepPin,
    };

    const F_SYS: u32 = 125_000_000;

    struct Rig {
        step: MockStepPin,
        dir: MockOutputPin,
        slice: MockPwmSlice,
        sm: MockPio,
        clock: MockClock,
        arbiter: MotorArbiter<
            MockStepPin,
            MockOutputPin,
            MockPwmSlice,
            MockPio,
            MockDma,
            MockClock,
            MockOutputPin,
            MockCtcTimer,
        >,
    }

    fn rig() -> Rig {
        rig_with(None, 1)
    }

    fn rig_with(timer: Option<MockCtcTimer>, dma_channels: usize) -> Rig {
        let step = MockStepPin::new();
        let dir = MockOutputPin::new();
        let slice = MockPwmSlice::new(0);
        let sm = MockPio::new(0, 0);
        let dma = MockDma::feeding(&sm, dma_channels);
        let clock = MockClock::new();

        let mut cache = PioProgramCache::new();
        let pio = PioExec::new(sm.clone(), dma, &mut cache, 1.0);
        let mut arbiter = MotorArbiter::assemble(
            step.clone(),
            dir.clone(),
            None::<MockOutputPin>,
            PwmStepper::new(slice.clone()),
            pio,
            timer.map(CtcToggle::new),
            clock.clone(),
            F_SYS,
            false,
            false,
        );
        arbiter.init().unwrap();

        Rig {
            step,
            dir,
            slice,
            sm,
            clock,
            arbiter,
        }
    }

    #[test]
    fn init_parks_step_low() {
        let r = rig();
        assert!(r.step.is_idle_low());
        assert!(!r.slice.is_enabled());
        assert!(!r.sm.is_enabled());
    }

    #[test]
    fn natural_expiry_reports_completed() {
        let mut r = rig();
        // 1000 steps at 1000 Hz = 1 s
        r.arbiter.run_steps(1000, 1000, StepBackend::Pwm).unwrap();
        assert!(r.arbiter.busy());

        r.clock.advance_us(999_999);
        assert!(r.arbiter.busy());

        r.clock.advance_us(1);
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);
    }

    #[test]
    fn new_command_interrupts_running_one() {
        let mut r = rig();
        r.arbiter.run_steps(1000, 1000, StepBackend::Pwm).unwrap();

        r.clock.advance_us(50_000);
        r.arbiter.run_steps(200, 800, StepBackend::Pwm).unwrap();
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Interrupted);
        assert!(r.arbiter.busy());

        // Let the second command expire: 200/800 s = 250 ms.
        r.clock.advance_us(250_000);
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);
    }

    #[test]
    fn stop_reports_stopped_and_parks_pin() {
        let mut r = rig();
        r.arbiter.run_steps(1000, 1000, StepBackend::Pio).unwrap();
        assert!(r.arbiter.busy());

        r.arbiter.stop();
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Stopped);
        assert!(r.step.is_idle_low());
        assert!(!r.sm.is_enabled());
    }

    #[test]
    fn stop_on_idle_motor_still_forces_safe_state() {
        let mut r = rig();
        r.arbiter.stop();
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);
        assert!(r.step.is_idle_low());
    }

    #[test]
    fn zero_step_command_is_a_completed_noop() {
        let mut r = rig();
        r.arbiter.run_steps(0, 1000, StepBackend::Pwm).unwrap();
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);
        assert!(r.step.is_idle_low());

        r.arbiter.run_steps(100, 0, StepBackend::Pwm).unwrap();
        assert!(!r.arbiter.busy());
        assert!(r.step.is_idle_low());
    }

    #[test]
    fn noop_on_running_motor_interrupts_it() {
        let mut r = rig();
        r.arbiter.run_steps(1000, 1000, StepBackend::Pwm).unwrap();
        r.arbiter.run_steps(0, 1000, StepBackend::Pwm).unwrap();
        // The running command was interrupted, then the no-op completed;
        // COM1 reflects the most recent transition.
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);
        assert!(!r.arbiter.busy());
    }

    #[test]
    fn pwm_command_arms_slice_and_mux() {
        let mut r = rig();
        r.arbiter.run_steps(500, 1000, StepBackend::Pwm).unwrap();
        assert_eq!(r.step.function(), PinFunction::Pwm);
        assert!(r.slice.is_enabled());
        assert_eq!(r.arbiter.active_backend(), ActiveBackend::Pwm);
    }

    #[test]
    fn pio_command_resets_machine_and_queues_pair() {
        let mut r = rig();
        r.arbiter.run_steps(200, 800, StepBackend::Pio).unwrap();

        assert_eq!(r.step.function(), PinFunction::Pio0);
        let (restarts, clears, pins_low, _) = r.sm.call_counts();
        assert!(restarts >= 1 && clears >= 1 && pins_low >= 1);

        let words = r.sm.queued_words();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0], timing::hz_to_duty(F_SYS, 800.0));
        assert_eq!(words[1], 200);

        assert_eq!(r.sm.run_until_stalled(), 200);
    }

    #[test]
    fn run_velocity_matches_step_count_conversion() {
        let mut r = rig();
        // 1000 Hz for 10 s = 10 000 steps -> t_end at 10 s.
        r.arbiter.run_velocity(1000, 10_000, StepBackend::Pwm).unwrap();
        r.clock.advance_us(9_999_999);
        assert!(r.arbiter.busy());
        r.clock.advance_us(1);
        assert!(!r.arbiter.busy());
    }

    #[test]
    fn pwm_to_pio_handover_goes_through_pwm_stop() {
        let mut r = rig();
        r.arbiter.run_steps(10_000, 1000, StepBackend::Pwm).unwrap();
        r.arbiter.run_steps(100, 1000, StepBackend::Pio).unwrap();

        assert!(!r.slice.is_enabled());
        assert_eq!(r.step.function(), PinFunction::Pio0);

        // The mux history shows PWM -> SIO (stop path) -> PIO.
        let hist = r.step.mux_history();
        let pwm_at = hist.iter().position(|&f| f == PinFunction::Pwm).unwrap();
        let pio_at = hist.iter().rposition(|&f| f == PinFunction::Pio0).unwrap();
        assert!(hist[pwm_at..pio_at].contains(&PinFunction::Sio));
    }

    #[test]
    fn stream_runs_and_completes_on_schedule() {
        let mut r = rig();
        let words = [1000, 50, 500, 100, 0, 0];
        r.arbiter.run_pio_stream(&words, 300_000).unwrap();
        assert!(r.arbiter.busy());
        assert_eq!(r.arbiter.active_backend(), ActiveBackend::PioStream);

        assert_eq!(r.sm.run_until_stalled(), 150);
        assert!(r.sm.pin_low());

        r.clock.advance_us(300_000);
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);

        // The slot is free for the next command.
        r.arbiter.run_steps(10, 1000, StepBackend::Pio).unwrap();
        assert!(r.arbiter.busy());
    }

    #[test]
    fn empty_stream_is_a_noop() {
        let mut r = rig();
        r.arbiter.run_pio_stream(&[], 1000).unwrap();
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);

        r.arbiter.run_pio_stream(&[0, 0], 0).unwrap();
        assert!(!r.arbiter.busy());
    }

    #[test]
    fn dma_exhaustion_drops_command_and_surfaces_error() {
        let mut r = rig_with(None, 0);
        let words = [1000, 50, 0, 0];
        let err = r.arbiter.run_pio_stream(&words, 100_000).unwrap_err();
        assert_eq!(err, Error::Backend(crate::error::BackendError::DmaExhausted));

        // Motion-wise the drop looks like an instantly-completed command.
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);
        assert!(r.step.is_idle_low());
    }

    #[test]
    fn timer_backend_requires_a_bound_timer() {
        let mut r = rig();
        let err = r.arbiter.run_steps(100, 1000, StepBackend::Timer).unwrap_err();
        assert_eq!(err, Error::Motor(MotorError::TimerNotBound));
        assert!(!r.arbiter.busy());
    }

    #[test]
    fn timer_backend_runs_and_stops_on_duration() {
        let timer = MockCtcTimer::avr16();
        let mut r = rig_with(Some(timer.clone()), 1);

        r.arbiter.run_steps(1000, 1000, StepBackend::Timer).unwrap();
        assert!(timer.is_running());
        assert_eq!(r.arbiter.active_backend(), ActiveBackend::Timer);

        // The timer free-runs; the arbiter enforces the duration on poll.
        r.clock.advance_us(999_999);
        r.arbiter.poll();
        assert!(timer.is_running());

        r.clock.advance_us(1);
        r.arbiter.poll();
        assert!(!r.arbiter.busy());
        assert_eq!(r.arbiter.last_completion(), CompletionReason::Completed);
        assert!(!timer.is_running());
        assert!(r.step.is_idle_low());
    }

    #[test]
    fn unbound_timer_error_preserves_running_command() {
        let mut r = rig();
        r.arbiter.run_steps(1000, 1000, StepBackend::Pwm).unwrap();
        let _ = r.arbiter.run_steps(10, 10, StepBackend::Timer).unwrap_err();
        // The PWM command is untouched.
        assert!(r.arbiter.busy());
        assert!(r.slice.is_enabled());
    }

    #[test]
    fn direction_follows_polarity() {
        let mut r = rig();
        r.arbiter.set_direction(true).unwrap();
        assert!(r.dir.is_high());
        r.arbiter.set_direction(false).unwrap();
        assert!(!r.dir.is_high());
    }

    #[test]
    fn pwm_completion_via_irq_parks_pin_before_t_end() {
        let mut r = rig();
        r.arbiter.run_steps(3, 1000, StepBackend::Pwm).unwrap();

        // Pump wraps until the countdown finishes.
        while r.slice.is_enabled() {
            r.slice.wrap();
            r.arbiter.service_irq();
        }
        assert_eq!(r.slice.pulses(), 3);
        assert!(r.step.is_idle_low());

        // The slot still reports Running until t_end; that is the
        // time-based truth the arbiter mirrors.
        assert!(r.arbiter.busy());
        r.clock.advance_us(3_000);
        assert!(!r.arbiter.busy());
    }
}
