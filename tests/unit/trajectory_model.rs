//! Trajectory-model properties over the public API: round-trip integration,
//! overwrite correctness, preset purity, continuity.

use rail_motion::frame::{Command, CommandMode};
use rail_motion::trajectory::RailPoseEngine;
use rail_motion::{Axis, RailConfig};

fn time_cmd(mask: u8, dir: u8, hz: u32, ms: u32) -> Command {
    Command {
        mode: CommandMode::TimeBounded,
        motor_mask: mask,
        direction_mask: dir,
        speed_hz: hz,
        magnitude: ms,
    }
}

#[test]
fn overwrite_correctness_reference_case() {
    // Feed (t=0, +X at 1000 Hz for 2 s), then (t=1 s, -X at 500 Hz for 2 s):
    //   pose(0.5) = 500
    //   pose(1.5) = 1000 - 500 * 0.5 = 750
    //   pose(3.0) = 1000 * 1 - 500 * 2 = 0
    let mut engine = RailPoseEngine::default();
    engine.start(Some(0.0));
    engine.feed_command(0.0, time_cmd(0x01, 0x00, 1000, 2000));
    engine.feed_command(1.0, time_cmd(0x01, 0x01, 500, 2000));

    assert_eq!(engine.pose_at(0.5).0, 500.0);
    assert_eq!(engine.pose_at(1.5).0, 750.0);
    assert_eq!(engine.pose_at(3.0).0, 0.0);
}

#[test]
fn preset_offset_purity() {
    let mut engine = RailPoseEngine::default();
    engine.set_preset_steps(42.0, -17.0);
    engine.start(Some(0.0));

    for t in [0.0, 0.001, 1.0, 3600.0] {
        assert_eq!(engine.pose_at(t), (42.0, -17.0));
    }
}

#[test]
fn trajectory_is_continuous_at_every_command_boundary() {
    let mut engine = RailPoseEngine::default();
    engine.start(Some(0.0));

    let feeds = [
        (0.00, time_cmd(0x03, 0x00, 1000, 1500)),
        (0.75, time_cmd(0x01, 0x01, 2000, 500)),
        (1.00, time_cmd(0x02, 0x02, 800, 2000)),
        (1.10, time_cmd(0x03, 0x01, 100, 400)),
    ];
    for (t, cmd) in feeds {
        engine.feed_command(t, cmd);
    }

    let eps = 1e-7;
    for (t, _) in feeds {
        let (xl, yl) = engine.pose_at(t - eps);
        let (xr, yr) = engine.pose_at(t + eps);
        assert!((xl - xr).abs() < 1.0, "x jump at t={}: {} vs {}", t, xl, xr);
        assert!((yl - yr).abs() < 1.0, "y jump at t={}: {} vs {}", t, yl, yr);
    }
}

#[test]
fn round_trip_against_cumulative_integral() {
    // Independent trapezoid-rule integration of the commanded velocity
    // profile must match pose_at everywhere.
    let mut engine = RailPoseEngine::default();
    engine.start(Some(0.0));

    let feeds = [
        (0.0, time_cmd(0x01, 0x00, 1000, 3000)),
        (1.0, time_cmd(0x01, 0x00, 250, 1000)),
        (2.5, time_cmd(0x01, 0x01, 600, 1000)),
    ];
    for (t, cmd) in feeds {
        engine.feed_command(t, cmd);
    }

    // Velocity as a function of time, straight from the command list.
    let v_at = |t: f64| -> f64 {
        if t < 1.0 {
            1000.0
        } else if t < 2.0 {
            250.0
        } else if t < 2.5 {
            0.0
        } else if t < 3.5 {
            -600.0
        } else {
            0.0
        }
    };

    let dt = 1e-4;
    let mut x = 0.0;
    let mut t = 0.0;
    while t < 4.0 {
        let got = engine.pose_at(t).0;
        assert!(
            (got - x).abs() < 0.5,
            "diverged at t={}: engine={} integral={}",
            t,
            got,
            x
        );
        x += v_at(t) * dt;
        t += dt;
    }
}

#[test]
fn custom_direction_signs_apply_per_bit() {
    let rail = RailConfig {
        dir_bit0_sign: -1,
        dir_bit1_sign: 1,
        ..RailConfig::default()
    };
    let mut engine = RailPoseEngine::new(rail);
    engine.start(Some(0.0));

    engine.feed_command(0.0, time_cmd(0x01, 0x00, 1000, 1000));
    assert_eq!(engine.pose_at(1.0).0, -1000.0);

    engine.feed_command(2.0, time_cmd(0x01, 0x01, 1000, 1000));
    assert_eq!(engine.pose_at(3.0).0, 0.0);
}

#[test]
fn wire_frames_feed_like_decoded_commands() {
    let mut from_wire = RailPoseEngine::default();
    let mut from_struct = RailPoseEngine::default();
    from_wire.start(Some(0.0));
    from_struct.start(Some(0.0));

    let cmd = time_cmd(0x01, 0x00, 1000, 2000);
    assert_eq!(from_wire.feed(0.0, &cmd.encode()), Some(cmd));
    from_struct.feed_command(0.0, cmd);

    for t in [0.0, 0.5, 1.0, 2.0, 3.0] {
        assert_eq!(from_wire.pose_at(t), from_struct.pose_at(t));
    }
}

#[test]
fn segments_expose_the_reconstruction() {
    let mut engine = RailPoseEngine::default();
    engine.start(Some(0.0));
    engine.feed_command(0.0, time_cmd(0x01, 0x00, 1000, 2000));
    engine.feed_command(1.0, time_cmd(0x01, 0x01, 500, 2000));

    let segs = engine.segments(Axis::X);
    assert_eq!(segs.len(), 2);
    assert_eq!(segs[0].t1, 1.0); // truncated in place
    assert_eq!(segs[1].t0, 1.0);
    assert_eq!(segs[1].v, -500.0);
    assert!(engine.segments(Axis::Y).is_empty());
}
