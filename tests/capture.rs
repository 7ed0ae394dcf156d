//! Silence-gate behavior tests, driven without audio hardware

use reverie::voice::{chunk_peak, max_frames, pcm_to_wav, GateConfig, SilenceGate};

const CHUNK: usize = 1024;

fn gate_config() -> GateConfig {
    GateConfig {
        chunk_size: CHUNK,
        silence_threshold: 2000,
        min_frames: 18,
        max_silent_frames: 10,
    }
}

fn loud() -> Vec<i16> {
    vec![3000; CHUNK]
}

fn quiet() -> Vec<i16> {
    vec![50; CHUNK]
}

/// Feed chunks until the gate confirms silence; panics past a safety limit
fn drive_to_silence(gate: &mut SilenceGate, chunk: &[i16]) {
    for _ in 0..1000 {
        if gate.push(chunk) {
            return;
        }
    }
    panic!("gate never confirmed silence");
}

#[test]
fn speech_then_silence_terminates_and_trims() {
    let mut gate = SilenceGate::new(gate_config());

    for _ in 0..5 {
        assert!(!gate.push(&quiet()));
    }
    for _ in 0..20 {
        assert!(!gate.push(&loud()));
    }
    drive_to_silence(&mut gate, &quiet());

    // 5 leading quiet + 20 speech + 11 trailing quiet (the run must exceed
    // the limit of 10 to confirm)
    assert_eq!(gate.chunks_read(), 36);

    let recording = gate.finish();
    assert!(recording.valid);
    assert_eq!(recording.chunks_read, 36);
    // The trailing max_silent_frames chunks are trimmed
    assert_eq!(recording.pcm.len(), (36 - 10) * CHUNK * 2);
}

#[test]
fn pure_silence_is_invalid() {
    let mut gate = SilenceGate::new(gate_config());
    drive_to_silence(&mut gate, &quiet());

    // The first chunk has no predecessor and never joins a run, so the run
    // reaches 11 on the twelfth chunk
    assert_eq!(gate.chunks_read(), 12);

    let recording = gate.finish();
    assert!(!recording.valid);
    assert_eq!(recording.pcm.len(), 2 * CHUNK * 2);
}

#[test]
fn silent_run_resets_on_speech() {
    let mut gate = SilenceGate::new(gate_config());

    gate.push(&loud());
    for _ in 0..10 {
        assert!(!gate.push(&quiet()));
    }
    // Speech before the run exceeds the limit starts the count over
    assert!(!gate.push(&loud()));
    for _ in 0..10 {
        assert!(!gate.push(&quiet()));
    }
    assert!(gate.push(&quiet()));
}

#[test]
fn duration_cap_still_trims_into_speech() {
    // A speaker who never pauses: the recorder stops at the cap and the
    // trailing trim removes speech chunks
    let cap = 30;
    let mut gate = SilenceGate::new(gate_config());
    for _ in 0..cap {
        assert!(!gate.push(&loud()));
    }

    let recording = gate.finish();
    assert!(recording.valid);
    assert_eq!(recording.pcm.len(), (cap - 10) * CHUNK * 2);
}

#[test]
fn cap_below_min_frames_is_always_invalid() {
    let config = GateConfig {
        min_frames: 50,
        ..gate_config()
    };
    let cap = max_frames(1.0, 16_000, CHUNK);
    assert!(cap < config.min_frames);

    let mut gate = SilenceGate::new(config);
    for _ in 0..cap {
        gate.push(&loud());
    }

    assert!(!gate.finish().valid);
}

#[test]
fn session_shorter_than_trim_yields_empty_pcm() {
    let mut gate = SilenceGate::new(gate_config());
    for _ in 0..5 {
        gate.push(&loud());
    }

    let recording = gate.finish();
    assert!(!recording.valid);
    assert!(recording.pcm.is_empty());
    assert_eq!(recording.chunks_read, 5);
}

#[test]
fn zero_trim_keeps_everything() {
    let config = GateConfig {
        max_silent_frames: 0,
        min_frames: 1,
        ..gate_config()
    };

    let mut gate = SilenceGate::new(config);
    gate.push(&loud());
    // With a zero-length silence limit, any counted silent chunk confirms
    assert!(gate.push(&quiet()));

    let recording = gate.finish();
    assert!(recording.valid);
    assert_eq!(recording.pcm.len(), 2 * CHUNK * 2);
}

#[test]
fn threshold_is_exclusive() {
    let mut gate = SilenceGate::new(gate_config());
    gate.push(&loud());

    // Exactly at the threshold counts as speech
    let at_threshold = vec![2000i16; CHUNK];
    for _ in 0..50 {
        assert!(!gate.push(&at_threshold));
    }
}

#[test]
fn chunk_peak_handles_extremes() {
    assert_eq!(chunk_peak(&[]), 0);
    assert_eq!(chunk_peak(&[0, -5, 3]), 5);
    assert_eq!(chunk_peak(&[i16::MIN]), 32_768);
    assert_eq!(chunk_peak(&[i16::MAX]), 32_767);
}

#[test]
fn max_frames_floors() {
    assert_eq!(max_frames(10.0, 16_000, 1024), 156);
    assert_eq!(max_frames(1.0, 16_000, 1024), 15);
    assert_eq!(max_frames(0.0, 16_000, 1024), 0);
}

#[test]
fn wav_wrapping_produces_riff_header() {
    let pcm: Vec<u8> = (0..64u8).collect();
    let wav = pcm_to_wav(&pcm, 16_000).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    // 44-byte canonical header plus the samples
    assert_eq!(wav.len(), 44 + pcm.len());
}
