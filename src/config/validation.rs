//! Configuration validation.

use crate::error::{ConfigError, Result};

use super::system::SystemConfig;

/// Validate a parsed configuration.
///
/// Checks the hardware-facing invariants that TOML types cannot express:
/// PIO/SM indices in range, direction signs in {-1, +1}, positive step
/// sizes, and uniqueness of pins and (PIO, SM) execution slots across
/// motors.
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    let mut used_pins: heapless::Vec<u8, 24> = heapless::Vec::new();
    let mut used_slots: heapless::Vec<(u8, u8), 8> = heapless::Vec::new();

    for (_, motor) in config.motors.iter() {
        if motor.pio > 1 {
            return Err(ConfigError::InvalidPioIndex(motor.pio).into());
        }
        if motor.sm > 3 {
            return Err(ConfigError::InvalidStateMachine(motor.sm).into());
        }

        let slot = motor.execution_slot();
        if used_slots.contains(&slot) {
            return Err(ConfigError::DuplicateExecutionSlot {
                pio: slot.0,
                sm: slot.1,
            }
            .into());
        }
        let _ = used_slots.push(slot);

        let mut pins: heapless::Vec<u8, 3> = heapless::Vec::new();
        let _ = pins.push(motor.step_pin);
        let _ = pins.push(motor.dir_pin);
        if let Some(en) = motor.enable_pin {
            let _ = pins.push(en);
        }

        for &pin in pins.iter() {
            if used_pins.contains(&pin) {
                return Err(ConfigError::PinConflict(pin).into());
            }
            let _ = used_pins.push(pin);
        }
    }

    for sign in [config.rail.dir_bit0_sign, config.rail.dir_bit1_sign] {
        if sign != 1 && sign != -1 {
            return Err(ConfigError::InvalidDirectionSign(sign).into());
        }
    }

    for step in [config.rail.step_x_m, config.rail.step_y_m] {
        if step <= 0.0 {
            return Err(ConfigError::InvalidStepSize(step).into());
        }
    }

    Ok(())
}
