//! Configuration module for rail-motion.
//!
//! Provides types for loading and validating motor and rail configurations
//! from TOML files (with `std` feature) or pre-parsed data.

mod motor;
mod rail;
mod system;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use motor::MotorConfig;
pub use rail::{Axis, RailConfig};
pub use system::SystemConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};
