//! Multi-motor command dispatch.
//!
//! [`MotorBank`] is the device main loop's view of its motors: arbiters are
//! registered in motor-index order (bit i of a command's `motor_mask`
//! addresses slot i), and each decoded [`Command`] fans out to every
//! addressed motor within one call, so motors named by the same frame start
//! together.

use embedded_hal::digital::OutputPin;
use heapless::Vec;

use crate::backend::StepBackend;
use crate::error::{Error, MotorError, Result};
use crate::frame::{Command, CommandMode};
use crate::hal::{Clock, CtcTimer, DmaChannel, NoPin, NoTimer, PioStateMachine, PwmSlice, StepPin};

use super::arbiter::MotorArbiter;

/// Maximum motors per bank (one per `motor_mask` bit).
pub const MAX_MOTORS: usize = 8;

/// An ordered bank of motor arbiters sharing one command stream.
pub struct MotorBank<STEP, DIR, PWM, SM, DMA, CLK, EN = NoPin, TIM = NoTimer>
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
    motors: Vec<MotorArbiter<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>, MAX_MOTORS>,
    default_backend: StepBackend,
}

impl<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM> MotorBank<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>
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
    /// Empty bank dispatching commands to `default_backend`.
    pub fn new(default_backend: StepBackend) -> Self {
        Self {
            motors: Vec::new(),
            default_backend,
        }
    }

    /// Register the next motor. The first registered motor is motor 0.
    pub fn push(&mut self, arbiter: MotorArbiter<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>) -> Result<()> {
        self.motors
            .push(arbiter)
            .map_err(|_| Error::Motor(MotorError::BankFull))
    }

    /// Fan a decoded command out to every addressed motor.
    ///
    /// For each set bit in `motor_mask`: the motor's direction follows its
    /// `direction_mask` bit (0 = forward), then the command starts on the
    /// bank's default backend — time-bounded commands through
    /// `run_velocity`, step-bounded through `run_steps`. Mask bits beyond
    /// the registered motors are ignored, mirroring the wire protocol's
    /// tolerance.
    pub fn dispatch(&mut self, cmd: &Command) -> Result<()> {
        for (index, motor) in self.motors.iter_mut().enumerate() {
            if !cmd.addresses(index as u8) {
                continue;
            }

            motor.set_direction(!cmd.direction_bit(index as u8))?;

            match cmd.mode {
                CommandMode::TimeBounded => {
                    motor.run_velocity(cmd.speed_hz, cmd.magnitude, self.default_backend)?
                }
                CommandMode::StepBounded => {
                    motor.run_steps(cmd.magnitude, cmd.speed_hz, self.default_backend)?
                }
            }
        }
        Ok(())
    }

    /// Service every motor's slot and timer expiry. Call from the main loop.
    pub fn poll(&mut self) {
        for motor in self.motors.iter_mut() {
            motor.poll();
        }
    }

    /// Fan the shared PWM wrap interrupt out to every motor.
    pub fn service_irqs(&mut self) {
        for motor in self.motors.iter_mut() {
            motor.service_irq();
        }
    }

    /// Stop every motor immediately.
    pub fn stop_all(&mut self) {
        for motor in self.motors.iter_mut() {
            motor.stop();
        }
    }

    /// Is any motor running? (update-on-read)
    pub fn busy_any(&mut self) -> bool {
        self.motors.iter_mut().any(|m| m.busy())
    }

    /// Access a motor by index.
    pub fn motor(
        &mut self,
        index: usize,
    ) -> Option<&mut MotorArbiter<STEP, DIR, PWM, SM, DMA, CLK, EN, TIM>> {
        self.motors.get_mut(index)
    }

    /// Registered motor count.
    pub fn len(&self) -> usize {
        self.motors.len()
    }

    /// Is the bank empty?
    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }
}
