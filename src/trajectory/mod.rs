//! Host-side trajectory reconstruction.
//!
//! The engine that mirrors the device's motion model in software, plus the
//! export and event-log tooling the imaging workflow consumes. Requires the
//! `alloc` feature; file I/O requires `std`.

mod engine;
mod segment;

#[cfg(feature = "std")]
mod event_log;
#[cfg(feature = "std")]
mod export;

pub use engine::{LoggedCommand, RailPoseEngine};
pub use segment::Segment;

#[cfg(feature = "std")]
pub use event_log::{load_events, replay_log, EventLogWriter};
#[cfg(feature = "std")]
pub use export::SampleTimes;
