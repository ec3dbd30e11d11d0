//! Builder pattern for MotorArbiter.

use embedded_hal::digital::OutputPin;

use crate::backend::{CtcToggle, PioExec, PioProgramCache, PwmStepper};
use crate::config::MotorConfig;
use crate::error::{ConfigError, Error, Result};
use crate::hal::{Clock, CtcTimer, DmaChannel, NoPin, NoTimer, PioStateMachine, PwmSlice, StepPin};

use super::arbiter::MotorArbiter;

/// Builder for creating [`MotorArbiter`] instances.
///
/// Pins and peripherals are hardware objects supplied by the caller; the
/// optional [`MotorConfig`] contributes polarities and the PIO clock
/// divider. The PIO pulse program is loaded through the shared
/// [`PioProgramCache`] at build time, once per PIO instance.
pub struct MotorBuilder<STEP, DIR, PWM, SM, DMA, CLK, EN = NoPin, TIM = NoTimer>
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
    step: Option<STEP>,
    dir: Option<DIR>,
    enable: Option<EN>,
    pwm: Option<PWM>,
    sm: Option<SM>,
    dma: Option<DMA>,
    clock: Option<CLK>,
    timer: Option<TIM>,
    sys_clock_hz: Option<u32>,
    dir_invert: bool,
    enable_invert: bool,
    pio_clk_div: f32,
}

impl<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM> Default
    for MotorBuilder<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>
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
    fn default() -> Self {
        Self::new()
    }
}

impl<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM> MotorBuilder<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>
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
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            step: None,
            dir: None,
            enable: None,
            pwm: None,
            sm: None,
            dma: None,
            clock: None,
            timer: None,
            sys_clock_hz: None,
            dir_invert: false,
            enable_invert: false,
            pio_clk_div: 1.0,
        }
    }

    /// Set the STEP pin.
    pub fn step_pin(mut self, pin: STEP) -> Self {
        self.step = Some(pin);
        self
    }

    /// Set the DIR pin.
    pub fn dir_pin(mut self, pin: DIR) -> Self {
        self.dir = Some(pin);
        self
    }

    /// Set the optional ENABLE pin.
    pub fn enable_pin(mut self, pin: EN) -> Self {
        self.enable = Some(pin);
        self
    }

    /// Set the PWM slice bound to the STEP pin.
    pub fn pwm_slice(mut self, slice: PWM) -> Self {
        self.pwm = Some(slice);
        self
    }

    /// Set the PIO state machine slot.
    pub fn state_machine(mut self, sm: SM) -> Self {
        self.sm = Some(sm);
        self
    }

    /// Set the DMA channel pool feeding the state machine.
    pub fn dma_channel(mut self, dma: DMA) -> Self {
        self.dma = Some(dma);
        self
    }

    /// Set the monotonic microsecond clock.
    pub fn clock(mut self, clock: CLK) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the optional CTC timer whose compare output is wired to STEP.
    pub fn ctc_timer(mut self, timer: TIM) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Set the system clock driving the PWM and PIO blocks.
    pub fn sys_clock_hz(mut self, hz: u32) -> Self {
        self.sys_clock_hz = Some(hz);
        self
    }

    /// Set direction pin inversion.
    pub fn dir_invert(mut self, invert: bool) -> Self {
        self.dir_invert = invert;
        self
    }

    /// Set enable pin inversion.
    pub fn enable_invert(mut self, invert: bool) -> Self {
        self.enable_invert = invert;
        self
    }

    /// Set the PIO state machine clock divider.
    pub fn pio_clk_div(mut self, div: f32) -> Self {
        self.pio_clk_div = div;
        self
    }

    /// Apply polarities and the PIO divider from a [`MotorConfig`].
    pub fn from_motor_config(mut self, config: &MotorConfig) -> Self {
        self.dir_invert = config.dir_invert;
        self.enable_invert = config.enable_invert;
        self.pio_clk_div = config.pio_clk_div;
        self
    }

    /// Build and initialize the arbiter.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or initialization
    /// fails on a pin.
    pub fn build(
        self,
        cache: &mut PioProgramCache,
    ) -> Result<MotorArbiter<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>> {
        let step = self.step.ok_or_else(|| missing("step_pin"))?;
        let dir = self.dir.ok_or_else(|| missing("dir_pin"))?;
        let pwm = self.pwm.ok_or_else(|| missing("pwm_slice"))?;
        let sm = self.sm.ok_or_else(|| missing("state_machine"))?;
        let dma = self.dma.ok_or_else(|| missing("dma_channel"))?;
        let clock = self.clock.ok_or_else(|| missing("clock"))?;
        let sys_clock_hz = self.sys_clock_hz.ok_or_else(|| missing("sys_clock_hz"))?;

        let pio = PioExec::new(sm, dma, cache, self.pio_clk_div);

        let mut arbiter = MotorArbiter::assemble(
            step,
            dir,
            self.enable,
            PwmStepper::new(pwm),
            pio,
            self.timer.map(CtcToggle::new),
            clock,
            sys_clock_hz,
            self.dir_invert,
            self.enable_invert,
        );
        arbiter.init()?;
        Ok(arbiter)
    }
}

fn missing(field: &str) -> Error {
    Error::Config(ConfigError::MissingField(
        heapless::String::try_from(field).unwrap_or_default(),
    ))
}
