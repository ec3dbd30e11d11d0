//! Time-model helpers.
//!
//! Pure conversions between step frequency, period, RPM, and the counts the
//! hardware backends consume: PIO delay-loop counts (`duty`) and PWM
//! divider/wrap pairs.
//!
//! The PIO pulse program spends `2 * duty + PIO_OVERHEAD_CYCLES` cycles per
//! step, so the step period is
//!
//! ```text
//! T_step = (2 * duty + K) / f_sys
//! ```
//!
//! with `K = 3` fixed by the loaded program (see `PIO_OVERHEAD_CYCLES`).

use libm::{fabsf, round};

/// Non-loop instruction overhead of the PIO pulse program, in cycles.
///
/// Must match the loaded program exactly; a different program revision needs
/// a different constant, never an average.
pub const PIO_OVERHEAD_CYCLES: u32 = 3;

/// Recommended lower bound for the PWM wrap value (resolution/jitter).
pub const WRAP_MIN: u32 = 400;
/// Recommended upper bound for the PWM wrap value (responsiveness).
pub const WRAP_MAX: u32 = 20_000;

/// Weight of the normalized frequency error in the divider score.
const W_FREQ: f32 = 1.0;
/// Weight of the soft wrap-band penalty in the divider score.
const W_WRAP: f32 = 0.02;

/// Convert a desired step frequency to a PIO delay-loop count.
///
/// Returns 0 only for `hz <= 0`; 0 is reserved as the stream end-marker and
/// is never produced for a valid speed. Counts clamp to at least 1.
pub fn hz_to_duty(sys_hz: u32, hz: f64) -> u32 {
    if hz <= 0.0 {
        return 0;
    }

    let d = (sys_hz as f64 / hz - PIO_OVERHEAD_CYCLES as f64) * 0.5;
    if d <= 0.0 {
        return 1;
    }

    round(d) as u32
}

/// Convert a step period in seconds to a PIO delay-loop count.
pub fn period_to_duty(sys_hz: u32, period_s: f64) -> u32 {
    if period_s <= 0.0 {
        return 0;
    }

    let cycles = period_s * sys_hz as f64;
    let d = (cycles - PIO_OVERHEAD_CYCLES as f64) * 0.5;
    if d <= 0.0 {
        return 1;
    }

    round(d) as u32
}

/// Convert a shaft speed in RPM to a PIO delay-loop count.
pub fn rpm_to_duty(sys_hz: u32, rpm: f64, pulses_per_rev: u32) -> u32 {
    if rpm <= 0.0 || pulses_per_rev == 0 {
        return 0;
    }

    let hz = (rpm / 60.0) * pulses_per_rev as f64;
    hz_to_duty(sys_hz, hz)
}

/// Number of steps emitted over `duration_s` seconds at `hz` steps/sec.
pub fn duration_to_steps(duration_s: f64, hz: f64) -> u32 {
    if duration_s <= 0.0 || hz <= 0.0 {
        return 0;
    }

    round(duration_s * hz) as u32
}

/// Convert a pulse width in microseconds to a PIO loop count (2 cycles/loop).
pub fn pulse_us_to_cycles(sys_hz: u32, pulse_us: u32) -> u32 {
    if pulse_us == 0 {
        return 0;
    }

    let cycles = pulse_us as f64 * 1e-6 * sys_hz as f64;
    round(cycles * 0.5) as u32
}

/// Actual step period in seconds produced by a given duty count.
pub fn step_period_s(sys_hz: u32, duty: u32) -> f64 {
    (2 * duty + PIO_OVERHEAD_CYCLES) as f64 / sys_hz as f64
}

/// Choose a PWM clock divider for a target step frequency.
///
/// Scans the full 8.4 fixed-point divider range `[1, 256]` in 1/16 steps and
/// scores each legal candidate (`wrap` within `[2, 65535]`) by normalized
/// frequency error plus a soft penalty for wraps outside
/// `[WRAP_MIN, WRAP_MAX]`. Falls back to a clamped direct division when no
/// candidate is legal, so the result is always usable.
pub fn choose_clk_div(sys_hz: u32, freq_hz: u32) -> f32 {
    if freq_hz == 0 {
        return 1.0;
    }

    let mut best_div = 1.0f32;
    let mut best_score = f32::MAX;

    // clk_div is 8.4 fixed-point -> step = 1/16
    for i in 16..=(256 * 16) {
        let div = i as f32 / 16.0;

        // continuous wrap estimate
        let wrap_f = sys_hz as f32 / (div * freq_hz as f32) - 1.0;

        // hard legality check
        if !(2.0..=65535.0).contains(&wrap_f) {
            continue;
        }

        // nearest integer wrap (matches PWM reality)
        let wrap = (wrap_f + 0.5) as u32;

        let real_freq = sys_hz as f32 / (div * (wrap + 1) as f32);
        let freq_err = fabsf(real_freq - freq_hz as f32) / freq_hz as f32;

        let wrap_penalty = if wrap < WRAP_MIN {
            (WRAP_MIN - wrap) as f32 / WRAP_MIN as f32
        } else if wrap > WRAP_MAX {
            (wrap - WRAP_MAX) as f32 / WRAP_MAX as f32
        } else {
            0.0
        };

        let score = W_FREQ * freq_err + W_WRAP * wrap_penalty;

        if score < best_score {
            best_score = score;
            best_div = div;
        }
    }

    // Fallback: guarantee legality (never fail)
    if best_score == f32::MAX {
        let div = sys_hz as f32 / (freq_hz as f32 * 65536.0);
        best_div = div.clamp(1.0, 256.0);
    }

    best_div
}

/// Wrap value for a chosen divider and target frequency, clamped to the
/// hardware-legal range.
pub fn wrap_for(sys_hz: u32, div: f32, freq_hz: u32) -> u16 {
    if freq_hz == 0 {
        return 2;
    }

    let wrap = (sys_hz as f32 / (div * freq_hz as f32)) as u32;
    wrap.saturating_sub(1).clamp(2, 65535) as u16
}

/// Encode a divider as the hardware's 8.4 fixed-point representation.
pub fn div_to_8p4(div: f32) -> u16 {
    let fixed = round((div * 16.0) as f64) as u32;
    fixed.clamp(16, 256 * 16) as u16
}
