//! Rail command event log (std only).
//!
//! Records only facts: when a command frame was sent and its raw bytes, as
//! `t_send_abs,packet_hex` CSV rows. A recorded log replays into a
//! [`RailPoseEngine`] to reconstruct the session offline.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::string::String;
use std::vec::Vec;

use log::{info, warn};

use crate::error::{Error, Result, TrajectoryError};

use super::engine::RailPoseEngine;

const HEADER: &str = "t_send_abs,packet_hex";

/// Append-only writer for rail command events.
#[derive(Debug)]
pub struct EventLogWriter {
    writer: BufWriter<File>,
}

impl EventLogWriter {
    /// Open (or create) a log file for appending. Writes the CSV header
    /// when the file is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let is_empty = file.metadata().map_err(io_err)?.len() == 0;

        let mut writer = BufWriter::new(file);
        if is_empty {
            writeln!(writer, "{}", HEADER).map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }

        Ok(Self { writer })
    }

    /// Record one sent packet. Flushes immediately so a crash loses at most
    /// the row being written.
    pub fn log_packet(&mut self, t_send_abs: f64, raw_packet: &[u8]) -> Result<()> {
        writeln!(
            self.writer,
            "{:.9},{}",
            t_send_abs,
            hex_encode(raw_packet)
        )
        .map_err(io_err)?;
        self.writer.flush().map_err(io_err)
    }
}

/// Load a recorded event log as `(t_send_abs, raw_packet)` pairs.
pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<(f64, Vec<u8>)>> {
    let file = File::open(path.as_ref()).map_err(io_err)?;
    let reader = BufReader::new(file);

    let mut events = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if lineno == 0 && line == HEADER {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let parsed = (|| {
            let (t, hex) = line.split_once(',')?;
            let t: f64 = t.trim().parse().ok()?;
            let raw = hex_decode(hex.trim())?;
            Some((t, raw))
        })();

        match parsed {
            Some(ev) => events.push(ev),
            None => {
                return Err(TrajectoryError::MalformedLogLine(lineno + 1).into());
            }
        }
    }

    Ok(events)
}

/// Replay a recorded event log into an engine.
///
/// Returns how many events decoded into commands; events whose packets the
/// engine rejects (foreign traffic in the log) are counted and skipped.
pub fn replay_log<P: AsRef<Path>>(path: P, engine: &mut RailPoseEngine) -> Result<usize> {
    let events = load_events(path.as_ref())?;
    let total = events.len();

    let mut fed = 0usize;
    for (t_send_abs, raw) in &events {
        if engine.feed(*t_send_abs, raw).is_some() {
            fed += 1;
        }
    }

    if fed < total {
        warn!(
            "replay: {} of {} events were not valid command frames",
            total - fed,
            total
        );
    }
    info!(
        "replayed {} commands from {}",
        fed,
        path.as_ref().display()
    );
    Ok(fed)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

fn io_err(e: std::io::Error) -> Error {
    let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
    Error::Trajectory(TrajectoryError::IoError(msg))
}
