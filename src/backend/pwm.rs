//! PWM slice backend.
//!
//! Generates exactly N step pulses at frequency f on a PWM-capable pin: the
//! slice free-runs at a 50% duty cycle while the wrap interrupt counts
//! pulses and halts the slice when the count reaches zero.
//!
//! One wrap IRQ line serves all slices, so the platform's handler fans out
//! to every [`PwmStepper`]; [`service_irq`] filters on its own active flag
//! and pending status, leaving unrelated PWM users untouched.
//!
//! A disabled PWM slice leaves its pin level indeterminate, so every exit
//! path (stop, countdown reaching zero) reclaims the pin for GPIO and
//! drives it low.
//!
//! [`service_irq`]: PwmStepper::service_irq

use crate::hal::{PwmSlice, StepPin};
use crate::timing;

/// Step-counting pulse generator over one PWM slice.
#[derive(Debug)]
pub struct PwmStepper<P: PwmSlice> {
    slice: P,
    remaining_steps: u32,
    active: bool,
}

impl<P: PwmSlice> PwmStepper<P> {
    /// Take ownership of a slice.
    pub fn new(slice: P) -> Self {
        Self {
            slice,
            remaining_steps: 0,
            active: false,
        }
    }

    /// Park the slice: counter halted, IRQ off, countdown cleared.
    pub fn init(&mut self) {
        self.slice.set_enabled(false);
        self.slice.set_irq_enabled(false);
        self.slice.set_level(0);
        self.remaining_steps = 0;
        self.active = false;
    }

    /// Emit `steps` pulses at `freq_hz`, non-blocking. No-op for zero
    /// frequency or zero steps.
    ///
    /// The divider/wrap pair comes from the scored chooser in [`timing`];
    /// the level is half the wrap for a 50% duty cycle.
    pub fn run(&mut self, sys_hz: u32, freq_hz: u32, steps: u32) {
        if freq_hz == 0 || steps == 0 {
            return;
        }

        let clk_div = timing::choose_clk_div(sys_hz, freq_hz);
        let wrap = timing::wrap_for(sys_hz, clk_div, freq_hz);

        self.slice.set_enabled(false); // reconfigure safely
        self.slice.set_divider(timing::div_to_8p4(clk_div));
        self.slice.set_wrap(wrap);
        self.slice.set_level(wrap / 2);
        self.slice.reset_counter();

        self.remaining_steps = steps;
        self.active = true;

        self.slice.clear_irq();
        self.slice.set_irq_enabled(true);
        self.slice.set_enabled(true);
    }

    /// Immediate stop: slice and IRQ off, countdown cleared, pin parked
    /// GPIO-low.
    pub fn stop<S: StepPin>(&mut self, pin: &mut S) {
        self.slice.set_enabled(false);
        self.slice.set_irq_enabled(false);
        self.remaining_steps = 0;
        self.active = false;
        pin.force_low();
    }

    /// Service one wrap interrupt for this slice.
    ///
    /// Called from the platform's shared wrap handler for every stepper.
    /// Inactive steppers and steppers whose slice has no pending IRQ return
    /// immediately, so foreign slices are never disturbed.
    ///
    /// Returns true when this call finished the countdown.
    pub fn service_irq<S: StepPin>(&mut self, pin: &mut S) -> bool {
        if !self.active || !self.slice.irq_pending() {
            return false;
        }

        self.slice.clear_irq();

        if self.remaining_steps > 0 {
            self.remaining_steps -= 1;
            if self.remaining_steps == 0 {
                self.slice.set_enabled(false);
                self.slice.set_irq_enabled(false);
                self.active = false;
                pin.force_low();
                return true;
            }
        }

        false
    }

    /// Is a countdown in progress?
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Pulses still owed.
    #[inline]
    pub fn remaining_steps(&self) -> u32 {
        self.remaining_steps
    }

    /// Access the underlying slice.
    pub fn slice(&self) -> &P {
        &self.slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockPwmSlice, MockStepPin};

    const F_SYS: u32 = 125_000_000;

    /// Pump wrap events through the stepper until it halts itself.
    fn run_to_completion(
        stepper: &mut PwmStepper<MockPwmSlice>,
        slice: &MockPwmSlice,
        pin: &mut MockStepPin,
    ) -> u64 {
        let mut guard = 0u64;
        while stepper.is_active() {
            slice.wrap();
            stepper.service_irq(pin);
            guard += 1;
            assert!(guard < 1_000_000, "stepper never halted");
        }
        slice.pulses()
    }

    #[test]
    fn emits_exactly_n_pulses() {
        for steps in [1u32, 2, 10, 1000, 65536] {
            let slice = MockPwmSlice::new(0);
            let mut pin = MockStepPin::new();
            let mut stepper = PwmStepper::new(slice.clone());
            stepper.init();

            stepper.run(F_SYS, 1000, steps);
            let pulses = run_to_completion(&mut stepper, &slice, &mut pin);
            assert_eq!(pulses, steps as u64, "steps={}", steps);
        }
    }

    #[test]
    fn completion_parks_pin_low_and_disables_irq() {
        let slice = MockPwmSlice::new(3);
        let mut pin = MockStepPin::new();
        let mut stepper = PwmStepper::new(slice.clone());
        stepper.init();

        stepper.run(F_SYS, 800, 5);
        run_to_completion(&mut stepper, &slice, &mut pin);

        assert!(pin.is_idle_low());
        assert!(!slice.is_enabled());
        assert!(!slice.irq_enabled());
        assert_eq!(stepper.remaining_steps(), 0);
    }

    #[test]
    fn run_programs_half_wrap_level() {
        let slice = MockPwmSlice::new(0);
        let mut stepper = PwmStepper::new(slice.clone());
        stepper.init();

        stepper.run(F_SYS, 1000, 10);
        let (_, wrap, level) = slice.programmed();
        assert_eq!(level, wrap / 2);
        assert!(wrap >= 2);
        assert_eq!(slice.counter_resets(), 1);
        assert!(slice.is_enabled());
    }

    #[test]
    fn zero_requests_are_ignored() {
        let slice = MockPwmSlice::new(0);
        let mut stepper = PwmStepper::new(slice.clone());
        stepper.init();

        stepper.run(F_SYS, 0, 100);
        stepper.run(F_SYS, 1000, 0);
        assert!(!stepper.is_active());
        assert!(!slice.is_enabled());
    }

    #[test]
    fn stop_mid_run_parks_pin() {
        let slice = MockPwmSlice::new(0);
        let mut pin = MockStepPin::new();
        let mut stepper = PwmStepper::new(slice.clone());
        stepper.init();

        stepper.run(F_SYS, 1000, 1000);
        slice.wrap();
        stepper.service_irq(&mut pin);
        assert!(stepper.is_active());

        stepper.stop(&mut pin);
        assert!(!stepper.is_active());
        assert_eq!(stepper.remaining_steps(), 0);
        assert!(!slice.is_enabled());
        assert!(pin.is_idle_low());
    }

    #[test]
    fn foreign_slice_irq_is_untouched() {
        // Two steppers share the wrap IRQ line; only the pending, active
        // one reacts when the handler fans out.
        let slice_a = MockPwmSlice::new(0);
        let slice_b = MockPwmSlice::new(1);
        let mut pin_a = MockStepPin::new();
        let mut pin_b = MockStepPin::new();
        let mut stepper_a = PwmStepper::new(slice_a.clone());
        let mut stepper_b = PwmStepper::new(slice_b.clone());
        stepper_a.init();
        stepper_b.init();

        stepper_a.run(F_SYS, 1000, 3);
        stepper_b.run(F_SYS, 2000, 100);

        // Only slice A wraps; B must not lose a step.
        slice_a.wrap();
        stepper_a.service_irq(&mut pin_a);
        stepper_b.service_irq(&mut pin_b);

        assert_eq!(stepper_a.remaining_steps(), 2);
        assert_eq!(stepper_b.remaining_steps(), 100);
        assert!(slice_b.is_enabled());
    }

    #[test]
    fn inactive_stepper_ignores_stray_irq() {
        let slice = MockPwmSlice::new(0);
        let mut pin = MockStepPin::new();
        let mut stepper = PwmStepper::new(slice.clone());
        stepper.init();

        // Enable the slice behind the stepper's back and wrap it; the
        // stepper is inactive so the event must be left alone.
        {
            let mut raw = slice.clone();
            raw.set_enabled(true);
            raw.set_irq_enabled(true);
        }
        slice.wrap();
        assert!(!stepper.service_irq(&mut pin));
        assert!(slice.irq_pending());
    }
}
