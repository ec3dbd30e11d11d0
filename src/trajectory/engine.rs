//! Continuous-time rail pose reconstruction.
//!
//! [`RailPoseEngine`] mirrors the device's motion model on the host: fed the
//! same command frames with their send timestamps, it maintains the rail's
//! continuous trajectory `x(t), y(t)` as piecewise-linear functions of time
//! and answers "where was the radar at time t?" for arbitrary sample times.
//!
//! Overwrite semantics match the arbiter's last-command-wins rule: a new
//! command on an axis truncates that axis's running segment at the command's
//! send time, and the new segment starts from the position reached there, so
//! the reconstructed trajectory stays continuous across arbitrarily
//! interleaved commands.
//!
//! All internal times are relative to the session start; the caller pins
//! every timestamp to one monotonic source chosen at session start.

use alloc::vec::Vec;

use crate::config::{Axis, RailConfig};
use crate::frame::Command;

use super::segment::Segment;

/// A command as the engine recorded it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoggedCommand {
    /// Send time, relative to session start.
    pub t_rel: f64,
    /// The decoded command.
    pub command: Command,
}

/// Host-side trajectory reconstruction engine.
#[derive(Debug, Clone)]
pub struct RailPoseEngine {
    rail: RailConfig,
    started: bool,
    t0_abs: Option<f64>,
    preset_steps: [f64; 2],
    axes: [Vec<Segment>; 2],
    log: Vec<LoggedCommand>,
}

impl Default for RailPoseEngine {
    fn default() -> Self {
        Self::new(RailConfig::default())
    }
}

impl RailPoseEngine {
    /// Engine over a rail geometry.
    pub fn new(rail: RailConfig) -> Self {
        Self {
            rail,
            started: false,
            t0_abs: None,
            preset_steps: [0.0, 0.0],
            axes: [Vec::new(), Vec::new()],
            log: Vec::new(),
        }
    }

    /// The rail geometry in use.
    pub fn rail(&self) -> &RailConfig {
        &self.rail
    }

    /// Start a session. With `None` the time base anchors on the first
    /// [`feed`](Self::feed).
    pub fn start(&mut self, t_start_abs: Option<f64>) {
        self.started = true;
        if let Some(t) = t_start_abs {
            self.t0_abs = Some(t);
        }
    }

    /// Has the session started?
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Absolute anchor of the session time base, once known.
    pub fn session_start_abs(&self) -> Option<f64> {
        self.t0_abs
    }

    /// Set the initial offset in steps. Pure offset applied to every
    /// query; creates no motion. Call before feeding commands.
    pub fn set_preset_steps(&mut self, x0_steps: f64, y0_steps: f64) {
        self.preset_steps = [x0_steps, y0_steps];
    }

    /// Feed one `(t_send_abs, raw_packet)` event.
    ///
    /// Returns the decoded command for a valid frame, `None` otherwise
    /// (wrong length or unknown header; nothing else can go wrong).
    pub fn feed(&mut self, t_send_abs: f64, raw_packet: &[u8]) -> Option<Command> {
        let command = Command::parse(raw_packet).ok()?;
        self.feed_command(t_send_abs, command);
        Some(command)
    }

    /// Feed an already-decoded command.
    pub fn feed_command(&mut self, t_send_abs: f64, command: Command) {
        let t0 = self.to_rel_time(t_send_abs);
        let t1 = t0 + command.duration_secs();

        self.log.push(LoggedCommand {
            t_rel: t0,
            command,
        });

        for axis in [Axis::X, Axis::Y] {
            let motor = axis.motor_index();
            if !command.addresses(motor) {
                continue;
            }

            let sign = self.rail.dir_sign(command.direction_bit(motor));
            let v = sign * command.speed_hz as f64;

            self.truncate_axis_at(axis, t0);
            let p0 = self.pose_axis_at(axis, t0);
            self.append_segment(axis, t0, t1, v, p0);
        }
    }

    /// Position of one axis at relative time `t_rel`, in steps.
    pub fn pose_axis_at(&self, axis: Axis, t_rel: f64) -> f64 {
        let idx = axis.motor_index() as usize;
        let segments = &self.axes[idx];
        let preset = self.preset_steps[idx];

        if segments.is_empty() || t_rel <= segments[0].t0 {
            return preset;
        }

        // Segments are t0-ordered by construction; find the last one
        // starting at or before t_rel. Its clamped evaluation also covers
        // stationary gaps and times past the final segment.
        let pos = segments.partition_point(|s| s.t0 <= t_rel);
        segments[pos - 1].pos_at(t_rel)
    }

    /// `(x_steps, y_steps)` at relative time `t_rel`.
    pub fn pose_at(&self, t_rel: f64) -> (f64, f64) {
        (
            self.pose_axis_at(Axis::X, t_rel),
            self.pose_axis_at(Axis::Y, t_rel),
        )
    }

    /// Batched [`pose_at`](Self::pose_at), typically at radar frame
    /// timestamps.
    pub fn sample(&self, times_rel: &[f64]) -> Vec<(f64, f64)> {
        times_rel.iter().map(|&t| self.pose_at(t)).collect()
    }

    /// End of the last commanded motion, relative seconds.
    pub fn end_time(&self) -> f64 {
        self.log
            .iter()
            .map(|c| c.t_rel + c.command.duration_secs())
            .fold(0.0, f64::max)
    }

    /// The axis's segments, for debugging and export.
    pub fn segments(&self, axis: Axis) -> &[Segment] {
        &self.axes[axis.motor_index() as usize]
    }

    /// Every command fed so far, in order.
    pub fn command_log(&self) -> &[LoggedCommand] {
        &self.log
    }

    fn ensure_time_base(&mut self, t_send_abs: f64) {
        // Auto-start on first feed if the caller didn't call start().
        self.started = true;
        if self.t0_abs.is_none() {
            self.t0_abs = Some(t_send_abs);
        }
    }

    fn to_rel_time(&mut self, t_send_abs: f64) -> f64 {
        self.ensure_time_base(t_send_abs);
        t_send_abs - self.t0_abs.unwrap_or(t_send_abs)
    }

    /// Overwrite semantics: cut the axis's trajectory at `t_new`.
    ///
    /// Segments starting at or after `t_new` are discarded (they describe
    /// an overwritten future), and a segment still running past `t_new` is
    /// truncated in place.
    fn truncate_axis_at(&mut self, axis: Axis, t_new: f64) {
        let segments = &mut self.axes[axis.motor_index() as usize];

        while let Some(last) = segments.last() {
            if last.t0 >= t_new {
                segments.pop();
            } else {
                break;
            }
        }

        if let Some(last) = segments.last_mut() {
            if t_new < last.t1 {
                last.t1 = t_new; // immediate cut
            }
        }
    }

    fn append_segment(&mut self, axis: Axis, t0: f64, t1: f64, v: f64, p0: f64) {
        // Zero-length segments carry no information.
        if t1 <= t0 {
            return;
        }
        self.axes[axis.motor_index() as usize].push(Segment { t0, t1, v, p0 });
    }
}
