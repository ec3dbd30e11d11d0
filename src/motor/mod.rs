//! Motor arbitration.
//!
//! The per-motor [`MotorArbiter`] plus the [`MotorBank`] that fans decoded
//! command frames out across motors.

pub mod arbiter;
pub mod bank;
pub mod builder;
pub mod slot;

pub use arbiter::MotorArbiter;
pub use bank::{MotorBank, MAX_MOTORS};
pub use builder::MotorBuilder;
pub use slot::{time_reached, CommandSlot, CommandState, CompletionReason};
