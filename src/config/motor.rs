//! Motor configuration from TOML.

use heapless::String;
use serde::Deserialize;

/// Complete motor configuration from TOML.
///
/// Immutable after construction; pin numbers identify the hardware objects
/// the caller binds when building the arbiter.
#[derive(Debug, Clone, Deserialize)]
pub struct MotorConfig {
    /// Human-readable name (max 32 chars).
    pub name: String<32>,

    /// STEP pin number.
    pub step_pin: u8,

    /// DIR pin number.
    pub dir_pin: u8,

    /// Optional ENABLE pin number.
    #[serde(default)]
    pub enable_pin: Option<u8>,

    /// Invert direction pin logic.
    #[serde(default)]
    pub dir_invert: bool,

    /// Invert enable pin logic.
    #[serde(default)]
    pub enable_invert: bool,

    /// PIO instance index (0 or 1).
    #[serde(default)]
    pub pio: u8,

    /// State machine index within the instance (0..=3).
    #[serde(default)]
    pub sm: u8,

    /// PIO state machine clock divider.
    #[serde(default = "default_pio_clk_div")]
    pub pio_clk_div: f32,
}

fn default_pio_clk_div() -> f32 {
    1.0
}

impl MotorConfig {
    /// The (PIO instance, state machine) execution slot this motor claims.
    #[inline]
    pub fn execution_slot(&self) -> (u8, u8) {
        (self.pio, self.sm)
    }
}
