//! Unit test harness for rail-motion.
//!
//! Public-API level tests for each component; finer-grained cases live in
//! the crate's inline `#[cfg(test)]` modules.

mod direction_polarity;
mod frame_stream;
mod trajectory_model;
