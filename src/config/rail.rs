//! Rail geometry and direction-sign mapping.
//!
//! The host-side trajectory engine reconstructs positions in steps; this
//! config maps steps to meters per axis and wire direction bits to motion
//! signs.

use serde::Deserialize;

/// The two rail axes. Motor 0 drives X, motor 1 drives Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// Horizontal axis (+x right), driven by motor 0.
    X,
    /// Vertical axis (+y down), driven by motor 1.
    Y,
}

impl Axis {
    /// The motor index driving this axis.
    #[inline]
    pub fn motor_index(self) -> u8 {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// Rail geometry configuration.
///
/// Coordinate frame: origin with both axes at mechanical zero, +x right,
/// +y down, translation only, Z constant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RailConfig {
    /// Meters per step on the X axis.
    pub step_x_m: f64,

    /// Meters per step on the Y axis.
    pub step_y_m: f64,

    /// Constant Z coordinate in meters.
    pub z_m: f64,

    /// Sign of motion when a command's direction bit is 0.
    pub dir_bit0_sign: i8,

    /// Sign of motion when a command's direction bit is 1.
    pub dir_bit1_sign: i8,
}

impl Default for RailConfig {
    fn default() -> Self {
        // 0.5 m of travel over 320 000 steps on both axes.
        Self {
            step_x_m: 0.5 / 320_000.0,
            step_y_m: 0.5 / 320_000.0,
            z_m: 0.0,
            dir_bit0_sign: 1,
            dir_bit1_sign: -1,
        }
    }
}

impl RailConfig {
    /// Meters per step for an axis.
    #[inline]
    pub fn step_size_m(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.step_x_m,
            Axis::Y => self.step_y_m,
        }
    }

    /// Motion sign for a direction bit value.
    #[inline]
    pub fn dir_sign(&self, bit: bool) -> f64 {
        if bit {
            self.dir_bit1_sign as f64
        } else {
            self.dir_bit0_sign as f64
        }
    }
}
