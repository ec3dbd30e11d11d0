//! Error types for rail-motion.
//!
//! Provides unified error handling across configuration, frame decoding,
//! motor arbitration, hardware backends, and trajectory reconstruction.
//!
//! The device-side motion path is deliberately forgiving: malformed frames
//! are absorbed by the decoder and zero-length commands complete as no-ops.
//! Errors surface only where a caller can act on them (configuration,
//! missing resources, DMA exhaustion, host-side I/O).

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all rail-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Command frame decoding error
    Frame(FrameError),
    /// Motor arbitration error
    Motor(MotorError),
    /// Hardware backend error
    Backend(BackendError),
    /// Trajectory engine or export error
    Trajectory(TrajectoryError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Required builder/config field was not provided
    MissingField(heapless::String<32>),
    /// Motor name not found in configuration
    MotorNotFound(heapless::String<32>),
    /// PIO instance index out of range (must be 0 or 1)
    InvalidPioIndex(u8),
    /// State machine index out of range (must be 0..=3)
    InvalidStateMachine(u8),
    /// Direction sign must be -1 or +1
    InvalidDirectionSign(i8),
    /// Axis step size must be positive
    InvalidStepSize(f64),
    /// Two motors claim the same (PIO, SM) execution slot
    DuplicateExecutionSlot {
        /// PIO instance index
        pio: u8,
        /// State machine index
        sm: u8,
    },
    /// A pin number is used twice within or across motor configs
    PinConflict(u8),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Command frame errors (strict parse paths only; the streaming decoder
/// absorbs malformed input silently).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// First byte is not a known command header
    UnknownHeader(u8),
    /// Buffer is not exactly one frame long
    Truncated {
        /// Expected byte count
        expected: usize,
        /// Bytes actually provided
        got: usize,
    },
}

/// Motor arbitration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// DIR or ENABLE pin operation failed
    PinError,
    /// Timer backend requested but no timer is bound to this motor
    TimerNotBound,
    /// Motor bank is at capacity
    BankFull,
}

/// Hardware backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// No free DMA channel for a PIO stream; the command was dropped
    /// (COM1 reports Completed, COM2 stays Empty)
    DmaExhausted,
}

/// Trajectory engine and export errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    /// Adaptive sampling window is invalid (non-positive or min > max)
    InvalidSampleWindow {
        /// Requested minimum sample spacing in seconds
        min_dt: f64,
        /// Requested maximum sample spacing in seconds
        max_dt: f64,
    },
    /// Uniform export step must be positive
    InvalidSampleStep(f64),
    /// Event log line could not be parsed
    MalformedLogLine(usize),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Frame(e) => write!(f, "Frame error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Backend(e) => write!(f, "Backend error: {}", e),
            Error::Trajectory(e) => write!(f, "Trajectory error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::MissingField(name) => write!(f, "Missing field: {}", name),
            ConfigError::MotorNotFound(name) => write!(f, "Motor '{}' not found", name),
            ConfigError::InvalidPioIndex(v) => {
                write!(f, "Invalid PIO index: {}. Must be 0 or 1", v)
            }
            ConfigError::InvalidStateMachine(v) => {
                write!(f, "Invalid state machine index: {}. Must be 0..=3", v)
            }
            ConfigError::InvalidDirectionSign(v) => {
                write!(f, "Invalid direction sign: {}. Must be -1 or +1", v)
            }
            ConfigError::InvalidStepSize(v) => {
                write!(f, "Invalid step size: {}. Must be > 0", v)
            }
            ConfigError::DuplicateExecutionSlot { pio, sm } => {
                write!(f, "Execution slot pio{}/sm{} claimed twice", pio, sm)
            }
            ConfigError::PinConflict(pin) => write!(f, "Pin {} used more than once", pin),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::UnknownHeader(b) => write!(f, "Unknown frame header: 0x{:02X}", b),
            FrameError::Truncated { expected, got } => {
                write!(f, "Frame truncated: expected {} bytes, got {}", expected, got)
            }
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
            MotorError::TimerNotBound => {
                write!(f, "Timer backend requested but no timer is bound")
            }
            MotorError::BankFull => write!(f, "Motor bank is full"),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::DmaExhausted => write!(f, "No free DMA channel; stream dropped"),
        }
    }
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryError::InvalidSampleWindow { min_dt, max_dt } => {
                write!(f, "Invalid sample window: min_dt={}, max_dt={}", min_dt, max_dt)
            }
            TrajectoryError::InvalidSampleStep(dt) => {
                write!(f, "Invalid sample step: {}. Must be > 0", dt)
            }
            TrajectoryError::MalformedLogLine(n) => {
                write!(f, "Malformed event log line {}", n)
            }
            #[cfg(feature = "std")]
            TrajectoryError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        Error::Backend(e)
    }
}

impl From<TrajectoryError> for Error {
    fn from(e: TrajectoryError) -> Self {
        Error::Trajectory(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}

#[cfg(feature = "std")]
impl std::error::Error for BackendError {}

#[cfg(feature = "std")]
impl std::error::Error for TrajectoryError {}
