//! # rail-motion
//!
//! Pulse-mode stepper motion control for DM542-style drivers on a rail
//! positioner, with host-side trajectory reconstruction for mmWave SAR
//! imaging.
//!
//! Two halves share one motion model:
//!
//! - **Motion execution** (device side): a [`FrameDecoder`](frame::FrameDecoder)
//!   turns serial bytes into [`Command`](frame::Command)s, a
//!   [`MotorBank`](motor::MotorBank) fans them out, and each
//!   [`MotorArbiter`](motor::MotorArbiter) converts them into precisely
//!   timed STEP/DIR waveforms through one of three backends: a CTC-toggle
//!   timer, a hardware PWM slice with IRQ step counting, or a PIO pulse
//!   engine fed parametrically or by DMA.
//! - **Trajectory reconstruction** (host side): a
//!   [`RailPoseEngine`](trajectory::RailPoseEngine) consumes the same
//!   command stream with send timestamps and answers "where was the rail at
//!   time t?" for the imaging pipeline.
//!
//! Hardware access goes through the trait seams in [`hal`], so the whole
//! motion core runs (and is tested) on the host against
//! [`hal::mock`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rail_motion::backend::{PioProgramCache, StepBackend};
//! use rail_motion::motor::{MotorBank, MotorBuilder};
//! use rail_motion::frame::FrameDecoder;
//!
//! let mut cache = PioProgramCache::new();
//! let motor = MotorBuilder::new()
//!     .step_pin(step).dir_pin(dir)
//!     .pwm_slice(slice).state_machine(sm).dma_channel(dma)
//!     .clock(clock).sys_clock_hz(125_000_000)
//!     .build(&mut cache)?;
//!
//! let mut bank = MotorBank::new(StepBackend::Pwm);
//! bank.push(motor)?;
//!
//! let mut decoder = FrameDecoder::new();
//! // main loop: feed serial bytes, dispatch commands, poll
//! if let Some(cmd) = decoder.push(byte) {
//!     bank.dispatch(&cmd)?;
//! }
//! bank.poll();
//! ```
//!
//! ## Feature flags
//!
//! - `std` (default): TOML config loading, the trajectory engine with its
//!   exports and event log, mock HAL, `log`-based logging
//! - `alloc`: trajectory engine storage for no_std targets with a heap
//! - `defmt`: `defmt::Format` derives on core types for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod backend;
pub mod config;
pub mod error;
pub mod frame;
pub mod hal;
pub mod motor;
pub mod profile;
pub mod timing;

#[cfg(feature = "alloc")]
pub mod trajectory;

// Re-exports for ergonomic API
pub use backend::{PioProgramCache, StepBackend};
pub use config::{Axis, MotorConfig, RailConfig, SystemConfig, validate_config};
pub use error::{Error, Result};
pub use frame::{Command, CommandMode, FrameDecoder};
pub use motor::{CompletionReason, MotorArbiter, MotorBank, MotorBuilder};
pub use profile::{scurve_stream, ScurveStream};

#[cfg(feature = "alloc")]
pub use trajectory::RailPoseEngine;

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::load_config;
