//! S-curve stream profiles.
//!
//! Pure computation turning a `(v_max, total_steps, ramp)` request into the
//! `(duty_period, steps)` pair stream the PIO backend consumes, shaped as a
//! smooth bell ramp on each side of an optional constant-speed cruise.
//!
//! The ramp is discretized into at most [`MAX_SEGMENTS`] segments per side.
//! Segment weights follow `g(u) = 6u(1-u)` sampled at segment midpoints,
//! steps are allocated proportionally with largest-remainder rounding so the
//! ramp sums exactly, and the deceleration side mirrors the acceleration
//! side. Strokes too short for the nominal ramp collapse to a symmetric
//! S-curve with the peak speed scaled down to keep the shape smooth.

use heapless::Vec;
use libm::{floorf, roundf};

use crate::timing;

/// Maximum ramp segments per side.
pub const MAX_SEGMENTS: usize = 32;

/// Word capacity of a generated stream:
/// two ramps + cruise + end marker, two words per pair.
pub const STREAM_WORDS: usize = (2 * MAX_SEGMENTS + 2) * 2;

/// A generated `(duty, steps)` pair stream, terminated by the `(0, 0)`
/// end marker and ready for DMA submission.
#[derive(Debug, Clone)]
pub struct ScurveStream {
    words: Vec<u32, STREAM_WORDS>,
    total_steps: u32,
    estimated_duration_us: u64,
}

impl ScurveStream {
    /// Raw words, end marker included.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Command pairs, end marker included.
    pub fn pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.words.chunks_exact(2).map(|c| (c[0], c[1]))
    }

    /// Steps the stream will emit.
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Wall-clock estimate for the whole stream, in microseconds.
    ///
    /// Computed from the same duty counts the hardware executes, so the
    /// arbiter's completion clock and the host's reconstruction agree.
    pub fn estimated_duration_us(&self) -> u64 {
        self.estimated_duration_us
    }
}

/// Build an S-curve stream.
///
/// * `v_max` - cruise speed in steps/sec (ramp peaks are shaped around it)
/// * `total_steps` - stroke length in steps
/// * `ramp_steps_per_side` - nominal steps spent in each ramp
///
/// Returns `None` for empty requests (`v_max == 0`, `total_steps == 0`, or
/// a stroke too short to discretize). Odd short strokes round the ramp down
/// on both sides, emitting `2 * (total_steps / 2)` steps.
pub fn scurve_stream(
    sys_hz: u32,
    v_max: u32,
    total_steps: u32,
    ramp_steps_per_side: u32,
) -> Option<ScurveStream> {
    if v_max == 0 || total_steps == 0 {
        return None;
    }

    // Ramp length in step space
    let sr_nominal = ramp_steps_per_side;
    let mut sr = sr_nominal;
    let mut has_cruise = true;

    if sr_nominal == 0 || total_steps <= 2 * sr_nominal {
        // Short stroke: symmetric S-curve, no cruise phase
        sr = total_steps / 2;
        has_cruise = false;
    }

    let cruise_steps = if has_cruise { total_steps - 2 * sr } else { 0 };

    let m = (sr as usize).min(MAX_SEGMENTS);
    if m == 0 {
        return None;
    }

    // Bell-shape speed template at segment midpoints
    let mut w = [0.0f32; MAX_SEGMENTS];
    let mut weight_sum = 0.0f32;
    for (i, wi) in w.iter_mut().enumerate().take(m) {
        let u = (i as f32 + 0.5) / m as f32;
        let g = 6.0 * u * (1.0 - u);
        *wi = g;
        weight_sum += g;
    }
    if weight_sum <= 0.0 {
        return None;
    }

    // Short-stroke peak scaling keeps the curve shape when the ramp shrank
    let mut alpha = 1.0f32;
    if !has_cruise && sr_nominal > 0 {
        alpha = (sr as f32 / sr_nominal as f32).min(1.0);
    }

    // Proportional step allocation, floor first
    let mut steps_acc = [0u32; MAX_SEGMENTS];
    let mut rem = [0u32; MAX_SEGMENTS];
    let mut allocated = 0u32;
    for i in 0..m {
        let exact = (w[i] / weight_sum) * sr as f32;
        let s = floorf(exact) as u32;
        steps_acc[i] = s;
        rem[i] = ((exact - s as f32) * 1e6) as u32;
        allocated += s;
    }

    // Largest-remainder redistribution until the ramp sums exactly
    while allocated < sr {
        let mut best = 0;
        for i in 1..m {
            if rem[i] > rem[best] {
                best = i;
            }
        }
        steps_acc[best] += 1;
        rem[best] = 0;
        allocated += 1;
    }

    let mut words: Vec<u32, STREAM_WORDS> = Vec::new();
    let mut emitted_steps = 0u32;
    let mut duration_us = 0.0f64;

    let mut emit = |words: &mut Vec<u32, STREAM_WORDS>, duty: u32, steps: u32| {
        let _ = words.push(duty);
        let _ = words.push(steps);
        emitted_steps += steps;
        duration_us += steps as f64 * timing::step_period_s(sys_hz, duty) * 1e6;
    };

    let segment_duty = |i: usize| {
        let speed = roundf(v_max as f32 * alpha * w[i]).max(1.0) as u32;
        timing::hz_to_duty(sys_hz, speed as f64)
    };

    // Acceleration ramp
    for i in 0..m {
        if steps_acc[i] == 0 {
            continue;
        }
        emit(&mut words, segment_duty(i), steps_acc[i]);
    }

    // Cruise
    if has_cruise && cruise_steps > 0 {
        emit(
            &mut words,
            timing::hz_to_duty(sys_hz, v_max as f64),
            cruise_steps,
        );
    }

    // Deceleration ramp (acceleration reversed)
    for i in (0..m).rev() {
        if steps_acc[i] == 0 {
            continue;
        }
        emit(&mut words, segment_duty(i), steps_acc[i]);
    }

    // End marker
    let _ = words.push(0);
    let _ = words.push(0);

    Some(ScurveStream {
        words,
        total_steps: emitted_steps,
        estimated_duration_us: duration_us as u64,
    })
}
