//! End-to-end ranging tests: synthetic chirp trains through the full
//! capture pipeline, from PCM samples to ranging updates and fixes.

use std::sync::mpsc;

use chirploc::{spawn_capture, Channel, MemorySource, RangingConfig, RangingUpdate};

/// Reference configuration with a shorter symbol (882 samples) so the
/// heavier multi-burst scenarios stay fast.
fn quick_config() -> RangingConfig {
    RangingConfig {
        cycle_time: 0.02,
        fft_length: 1024,
        ..RangingConfig::default()
    }
}

/// Repeat each channel's symbol `count` times, mix, and quantize to PCM.
fn build_stimulus(config: &RangingConfig, channels: &[Channel], count: usize, amplitude: f32) -> Vec<i16> {
    let n = config.symbol_length();
    let mut samples = vec![0.0f32; count * n];
    for &channel in channels {
        let symbol = config.symbol(channel);
        for rep in 0..count {
            for (i, &v) in symbol.iter().enumerate() {
                samples[rep * n + i] += v * amplitude;
            }
        }
    }
    samples
        .iter()
        .map(|&v| (v.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}

fn run_pipeline(config: &RangingConfig, stimulus: Vec<i16>) -> Vec<RangingUpdate> {
    let (tx, rx) = mpsc::channel();
    let device_buffer = 2 * config.symbol_length();
    let handle = spawn_capture(MemorySource::new(stimulus), config, device_buffer, tx)
        .expect("spawn capture worker");
    let updates: Vec<RangingUpdate> = rx.iter().collect();
    handle.join().expect("capture worker failed");
    updates
}

#[test]
fn test_clean_train_locks_and_ranges() {
    let config = RangingConfig::default();
    let stimulus = build_stimulus(&config, &[Channel::One], 20, 0.8);

    let updates = run_pipeline(&config, stimulus);

    let positions: Vec<f32> = updates
        .iter()
        .filter_map(|u| match u {
            RangingUpdate::Range {
                channel: Channel::One,
                position,
            } => Some(*position),
            _ => None,
        })
        .collect();

    // The detector needs buffer_length full windows to lock, then drains
    // two chunks per window; 20 clean symbols leave plenty of margin.
    assert!(
        positions.len() >= 2,
        "expected demodulation events, got {:?}",
        updates
    );
    // Self-correlation: the spectral peak sits within a few bins of DC,
    // so the distance stays well under a meter.
    for &p in &positions {
        assert!((0.0..1.0).contains(&p), "implausible position {} m", p);
    }
    // One channel alone never produces a fix.
    assert!(!updates.iter().any(|u| matches!(u, RangingUpdate::Fix(_))));
}

#[test]
fn test_no_updates_from_silence() {
    let config = quick_config();
    let stimulus = vec![0i16; 20 * config.symbol_length()];

    let updates = run_pipeline(&config, stimulus);
    assert!(updates.is_empty(), "silence produced {:?}", updates);
}

#[test]
fn test_two_channel_trains_produce_fixes() {
    let config = RangingConfig {
        two_dimension_enabled: true,
        ..quick_config()
    };
    // Both bands mixed at reduced amplitude to stay inside full scale.
    let stimulus = build_stimulus(&config, &[Channel::One, Channel::Two], 20, 0.45);

    let updates = run_pipeline(&config, stimulus);

    let mut seen = [false; 2];
    let mut fixes = Vec::new();
    for update in &updates {
        match update {
            RangingUpdate::Range { channel, .. } => {
                seen[(channel.number() - 1) as usize] = true;
            }
            RangingUpdate::Fix(fix) => fixes.push(*fix),
        }
    }

    assert!(seen[0], "no ranging updates on channel 1");
    assert!(seen[1], "no ranging updates on channel 2");
    assert!(!fixes.is_empty(), "no fixes from paired estimates");
    // Both trains arrive with the same alignment, so the ranges agree and
    // the fix sits near the baseline's perpendicular bisector.
    for fix in &fixes {
        assert!(fix.x.abs() < 0.5, "fix drifted to x = {}", fix.x);
        assert!(fix.y >= 0.0);
    }
}

#[test]
fn test_dropout_unlocks_and_relocks() {
    let config = quick_config();
    let n = config.symbol_length();

    // Train, a gap of silence longer than the statistics window, train again.
    let mut stimulus = build_stimulus(&config, &[Channel::One], 16, 0.8);
    let mut rng_state = 1u32;
    // Low-level uniform noise in the gap keeps the correlation statistics
    // defined (pure zeros make the intensity ratio 0/0).
    for _ in 0..14 * n {
        rng_state = rng_state.wrapping_mul(1103515245).wrapping_add(12345);
        let v = (rng_state >> 16) as i16 % 64;
        stimulus.push(v);
    }
    stimulus.extend(build_stimulus(&config, &[Channel::One], 16, 0.8));

    let updates = run_pipeline(&config, stimulus);
    let positions = updates
        .iter()
        .filter(|u| matches!(u, RangingUpdate::Range { .. }))
        .count();

    // Both bursts are long enough to lock and demodulate.
    assert!(positions >= 4, "expected ranging from both bursts, got {:?}", updates);
}
