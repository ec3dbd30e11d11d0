//! Trajectory export for downstream pipelines (std only).
//!
//! Three artifacts the imaging workflow consumes:
//!
//! - a pose CSV (`frame,time_abs,x,y,z,qx,qy,qz,qw`) with translation in
//!   meters and the quaternion fixed at identity (the rail only translates),
//! - a dense trajectory CSV with step/meter positions and finite-difference
//!   velocities at a uniform time step,
//! - a minimal fake ffmpeg-style log that downstream tools use to align
//!   rail time with camera time.
//!
//! Pose sampling is either caller-supplied (radar frame timestamps),
//! adaptive (non-uniform, but bounded spacing with every command boundary
//! included), or at command boundaries only (debug).

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::vec::Vec;

use log::info;

use crate::error::{Error, Result, TrajectoryError};

use super::engine::RailPoseEngine;

/// Sample-time selection for [`RailPoseEngine::export_pose_csv`].
#[derive(Debug, Clone)]
pub enum SampleTimes {
    /// One row per command start/end time (debug).
    CommandBoundaries,
    /// Exactly these relative times, in the given order.
    Provided(Vec<f64>),
    /// Adaptive non-uniform sampling: command boundaries always included,
    /// spacing kept within `[min_dt, max_dt]`, stationary periods sampled
    /// by `max_dt` stepping.
    Adaptive {
        /// Minimum spacing between adjacent samples, seconds.
        min_dt: f64,
        /// Maximum spacing between adjacent samples, seconds.
        max_dt: f64,
        /// Window start, relative seconds.
        t_start: f64,
        /// Window end; `None` infers the last commanded motion's end.
        t_end: Option<f64>,
    },
}

impl RailPoseEngine {
    /// Export a workflow pose CSV: `frame,time_abs,x,y,z,qx,qy,qz,qw`.
    ///
    /// `time_abs` is actually time since session start (kept under that
    /// name for pipeline compatibility); x/y/z are meters; the quaternion
    /// is fixed at `(0,0,0,1)` in the rail-only model.
    pub fn export_pose_csv<P: AsRef<Path>>(&self, out_path: P, times: &SampleTimes) -> Result<()> {
        let times = self.resolve_sample_times(times)?;

        let mut w = create_writer(out_path.as_ref())?;
        wln(&mut w, "frame,time_abs,x,y,z,qx,qy,qz,qw")?;

        for (frame, &t) in times.iter().enumerate() {
            let (x_step, y_step) = self.pose_at(t);
            let x = x_step * self.rail().step_x_m;
            let y = y_step * self.rail().step_y_m;
            let z = self.rail().z_m;

            wln(
                &mut w,
                &format!(
                    "{},{:.6},{:.6},{:.6},{:.6},0.000000,0.000000,0.000000,1.000000",
                    frame, t, x, y, z
                ),
            )?;
        }

        w.flush().map_err(io_err)?;
        info!(
            "exported {} pose samples to {}",
            times.len(),
            out_path.as_ref().display()
        );
        Ok(())
    }

    /// Export the continuous trajectory at a fixed time step.
    ///
    /// Columns: `t, x_step, y_step, x_m, y_m, vx_step_s, vy_step_s,
    /// vx_m_s, vy_m_s`, with velocities as backward finite differences
    /// (zero on the first row).
    pub fn export_trajectory_csv<P: AsRef<Path>>(
        &self,
        out_path: P,
        dt: f64,
        t_start: f64,
        t_end: Option<f64>,
    ) -> Result<()> {
        if dt <= 0.0 {
            return Err(TrajectoryError::InvalidSampleStep(dt).into());
        }

        let t_end = t_end.unwrap_or_else(|| self.end_time()).max(t_start);
        let rows = ((t_end - t_start) / dt).floor() as usize + 1;

        let mut w = create_writer(out_path.as_ref())?;
        wln(
            &mut w,
            "t,x_step,y_step,x_m,y_m,vx_step_s,vy_step_s,vx_m_s,vy_m_s",
        )?;

        let (mut prev_x, mut prev_y) = self.pose_at(t_start);
        for i in 0..rows {
            let t = t_start + i as f64 * dt;
            let (x, y) = self.pose_at(t);

            let (vx, vy) = if i > 0 {
                ((x - prev_x) / dt, (y - prev_y) / dt)
            } else {
                (0.0, 0.0)
            };

            wln(
                &mut w,
                &format!(
                    "{:.6},{:.3},{:.3},{:.6},{:.6},{:.3},{:.3},{:.6},{:.6}",
                    t,
                    x,
                    y,
                    x * self.rail().step_x_m,
                    y * self.rail().step_y_m,
                    vx,
                    vy,
                    vx * self.rail().step_x_m,
                    vy * self.rail().step_y_m,
                ),
            )?;

            prev_x = x;
            prev_y = y;
        }

        w.flush().map_err(io_err)?;
        info!(
            "exported {} trajectory rows to {}",
            rows,
            out_path.as_ref().display()
        );
        Ok(())
    }

    /// Export the minimal fake ffmpeg-style log downstream pipelines use to
    /// align rail time with camera time.
    pub fn export_ffmpeg_debug_log<P: AsRef<Path>>(&self, out_path: P) -> Result<()> {
        // A stub with t0 = 0 is still useful before any feed.
        let t0 = self.session_start_abs().unwrap_or(0.0);

        let mut w = create_writer(out_path.as_ref())?;
        wln(&mut w, "[ffmpeg_debug_fake] rail session time base")?;
        wln(&mut w, &format!("start:{:.6}", t0))?;
        wln(&mut w, "time_origin_rel=0.0")?;
        wln(
            &mut w,
            "note=this is a fake log to align rail pose timeline with camera workflow",
        )?;
        w.flush().map_err(io_err)
    }

    /// Build adaptive sampling times for non-uniform rail frames.
    ///
    /// Guarantees: every command boundary is included, adjacent samples are
    /// at least `min_dt` apart after filtering, and stationary periods are
    /// sampled by `max_dt` stepping.
    pub fn adaptive_sample_times(
        &self,
        min_dt: f64,
        max_dt: f64,
        t_start: f64,
        t_end: Option<f64>,
    ) -> Result<Vec<f64>> {
        if min_dt <= 0.0 || max_dt <= 0.0 || min_dt > max_dt {
            return Err(TrajectoryError::InvalidSampleWindow { min_dt, max_dt }.into());
        }

        let t_end = t_end.unwrap_or_else(|| self.end_time()).max(t_start);

        let mut times = vec![t_start, t_end];

        for cmd in self.command_log() {
            times.push(cmd.t_rel);
            times.push(cmd.t_rel + cmd.command.duration_secs());
        }

        let mut t = t_start;
        while t < t_end {
            times.push(t);
            t += max_dt;
        }

        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup();

        // Forward min_dt filter.
        let mut filtered = Vec::with_capacity(times.len());
        filtered.push(times[0]);
        for &tt in &times[1..] {
            if tt - filtered.last().copied().unwrap_or(t_start) >= min_dt {
                filtered.push(tt);
            }
        }

        // Keep the window's end exactly (helpful for downstream).
        match filtered.last().copied() {
            Some(last) if last != t_end => {
                if t_end - last >= min_dt {
                    filtered.push(t_end);
                } else if let Some(slot) = filtered.last_mut() {
                    *slot = t_end;
                }
            }
            _ => {}
        }

        Ok(filtered)
    }

    fn resolve_sample_times(&self, times: &SampleTimes) -> Result<Vec<f64>> {
        match times {
            SampleTimes::Provided(ts) => Ok(ts.clone()),
            SampleTimes::Adaptive {
                min_dt,
                max_dt,
                t_start,
                t_end,
            } => self.adaptive_sample_times(*min_dt, *max_dt, *t_start, *t_end),
            SampleTimes::CommandBoundaries => {
                let mut ts: Vec<f64> = Vec::new();
                for cmd in self.command_log() {
                    ts.push(cmd.t_rel);
                    ts.push(cmd.t_rel + cmd.command.duration_secs());
                }
                if ts.is_empty() {
                    ts.push(0.0);
                }
                ts.sort_by(|a, b| a.total_cmp(b));
                ts.dedup();
                Ok(ts)
            }
        }
    }
}

fn create_writer(path: &Path) -> Result<BufWriter<fs::File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    Ok(BufWriter::new(fs::File::create(path).map_err(io_err)?))
}

fn wln<W: Write>(w: &mut W, line: &str) -> Result<()> {
    writeln!(w, "{}", line).map_err(io_err)
}

fn io_err(e: std::io::Error) -> Error {
    let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
    Error::Trajectory(TrajectoryError::IoError(msg))
}
