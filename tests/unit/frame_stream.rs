//! Frame-boundary robustness of the streaming decoder.

use rail_motion::frame::{Command, CommandMode, FrameDecoder, FRAME_LEN};

const E1_FRAME: [u8; 11] = [
    0xBF, 0x03, 0x01, 0xE8, 0x03, 0x00, 0x00, 0x10, 0x27, 0x00, 0x00,
];
const E2_FRAME: [u8; 11] = [
    0xAF, 0x01, 0x00, 0x20, 0x03, 0x00, 0x00, 0xC8, 0x00, 0x00, 0x00,
];

fn decode_chunked(frames: &[u8], chunk: usize) -> Vec<Command> {
    let mut decoder = FrameDecoder::new();
    let mut out = Vec::new();
    for piece in frames.chunks(chunk.max(1)) {
        for &b in piece {
            if let Some(cmd) = decoder.push(b) {
                out.push(cmd);
            }
        }
    }
    out
}

#[test]
fn every_chunk_size_decodes_exactly_once() {
    for chunk in 1..=FRAME_LEN {
        let cmds = decode_chunked(&E1_FRAME, chunk);
        assert_eq!(cmds.len(), 1, "chunk={}", chunk);
        assert_eq!(cmds[0], Command::parse(&E1_FRAME).unwrap());
    }
}

#[test]
fn every_three_way_split_decodes_exactly_once() {
    for a in 1..FRAME_LEN {
        for b in (a + 1)..FRAME_LEN {
            let mut decoder = FrameDecoder::new();
            let mut count = 0;
            for part in [&E2_FRAME[..a], &E2_FRAME[a..b], &E2_FRAME[b..]] {
                for &byte in part {
                    if decoder.push(byte).is_some() {
                        count += 1;
                    }
                }
            }
            assert_eq!(count, 1, "split at {}/{}", a, b);
        }
    }
}

#[test]
fn back_to_back_frames_with_noise_decode_in_order() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&[0x00, 0x11, 0x22]); // line noise
    stream.extend_from_slice(&E1_FRAME);
    stream.extend_from_slice(&E2_FRAME); // immediately adjacent
    stream.push(0x99);
    stream.extend_from_slice(&E1_FRAME);

    for chunk in [1, 2, 3, 5, 7, 64] {
        let cmds = decode_chunked(&stream, chunk);
        assert_eq!(cmds.len(), 3, "chunk={}", chunk);
        assert_eq!(cmds[0].mode, CommandMode::TimeBounded);
        assert_eq!(cmds[1].mode, CommandMode::StepBounded);
        assert_eq!(cmds[2].mode, CommandMode::TimeBounded);
    }
}

#[test]
fn truncated_frame_absorbs_until_next_header() {
    let mut decoder = FrameDecoder::new();

    // Nine bytes of a frame, then the stream restarts with a fresh frame.
    // The decoder fills the partial frame's tail with the new frame's first
    // two bytes (fixed-length absorption), then resynchronizes on the next
    // header.
    for &b in &E1_FRAME[..9] {
        assert!(decoder.push(b).is_none());
    }
    let mut decoded = Vec::new();
    for &b in E2_FRAME.iter().chain(E2_FRAME.iter()) {
        if let Some(cmd) = decoder.push(b) {
            decoded.push(cmd);
        }
    }

    // The first E2 frame's leading bytes were consumed by the partial
    // frame; the second one decodes cleanly.
    assert!(!decoded.is_empty());
    assert_eq!(decoded.last().unwrap().mode, CommandMode::StepBounded);
    assert_eq!(decoded.last().unwrap().magnitude, 200);
}
