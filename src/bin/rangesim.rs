//! Acoustic ranging simulator - offline pipeline exercise
//!
//! Builds a synthetic chirp-train stimulus, optionally degrades it with
//! noise, and runs it through the full capture pipeline with an in-memory
//! source. Lock, unlock, and ranging events are logged; updates are printed
//! as they arrive.
//!
//! Usage:
//!   cargo run --bin rangesim -- [OPTIONS]
//!
//! Options:
//!   -c, --count <N>       Number of repeated symbols per train (default: 20)
//!   -a, --amplitude <A>   Train amplitude, 0..1 (default: 0.8)
//!   -n, --noise           Add white Gaussian noise
//!   -s, --sigma <S>       Noise standard deviation (default: 0.02)
//!       --silence <sec>   Leading silence in seconds (default: 0.25)
//!   -2, --two-dimension   Mix both channel trains and solve for fixes
//!   -o, --output <path>   Also write the stimulus to a WAV file
//!   -h, --help            Show this help message

use std::sync::mpsc;

use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use chirploc::{
    spawn_capture, tracing_init, wav, Channel, MemorySource, RangingConfig, RangingUpdate,
};

struct SimConfig {
    count: usize,
    amplitude: f32,
    add_noise: bool,
    sigma: f32,
    silence: f32,
    two_dimension: bool,
    output_path: Option<String>,
}

impl SimConfig {
    fn parse_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();

        let mut count = 20;
        let mut amplitude = 0.8f32;
        let mut add_noise = false;
        let mut sigma = 0.02f32;
        let mut silence = 0.25f32;
        let mut two_dimension = false;
        let mut output_path = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-c" | "--count" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("Missing value for --count".to_string());
                    }
                    count = args[i]
                        .parse()
                        .map_err(|_| format!("Invalid count: {}", args[i]))?;
                }
                "-a" | "--amplitude" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("Missing value for --amplitude".to_string());
                    }
                    amplitude = args[i]
                        .parse()
                        .map_err(|_| format!("Invalid amplitude: {}", args[i]))?;
                }
                "-n" | "--noise" => add_noise = true,
                "-s" | "--sigma" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("Missing value for --sigma".to_string());
                    }
                    sigma = args[i]
                        .parse()
                        .map_err(|_| format!("Invalid sigma: {}", args[i]))?;
                }
                "--silence" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("Missing value for --silence".to_string());
                    }
                    silence = args[i]
                        .parse()
                        .map_err(|_| format!("Invalid silence: {}", args[i]))?;
                }
                "-2" | "--two-dimension" => two_dimension = true,
                "-o" | "--output" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("Missing value for --output".to_string());
                    }
                    output_path = Some(args[i].clone());
                }
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => return Err(format!("Unknown option: {}", other)),
            }
            i += 1;
        }

        Ok(Self {
            count,
            amplitude,
            add_noise,
            sigma,
            silence,
            two_dimension,
            output_path,
        })
    }
}

fn print_usage() {
    eprintln!("Usage: rangesim [OPTIONS]");
    eprintln!("  -c, --count <N>       symbols per train (default 20)");
    eprintln!("  -a, --amplitude <A>   train amplitude (default 0.8)");
    eprintln!("  -n, --noise           add white Gaussian noise");
    eprintln!("  -s, --sigma <S>       noise standard deviation (default 0.02)");
    eprintln!("      --silence <sec>   leading silence (default 0.25)");
    eprintln!("  -2, --two-dimension   mix both channel trains");
    eprintln!("  -o, --output <path>   write stimulus to WAV");
}

/// Repeat one channel's symbol `count` times into `samples`, starting after
/// the leading silence.
fn mix_train(samples: &mut [f32], symbol: &[f32], start: usize, count: usize, amplitude: f32) {
    for rep in 0..count {
        let base = start + rep * symbol.len();
        for (i, &v) in symbol.iter().enumerate() {
            if let Some(slot) = samples.get_mut(base + i) {
                *slot += v * amplitude;
            }
        }
    }
}

fn build_stimulus(sim: &SimConfig, config: &RangingConfig) -> Vec<i16> {
    let symbol1 = config.symbol(Channel::One);
    let lead = (sim.silence * config.sample_rate).round() as usize;
    let total = lead + sim.count * symbol1.len() + lead;

    let mut samples = vec![0.0f32; total];
    mix_train(&mut samples, &symbol1, lead, sim.count, sim.amplitude);
    if sim.two_dimension {
        let symbol2 = config.symbol(Channel::Two);
        mix_train(&mut samples, &symbol2, lead, sim.count, sim.amplitude);
    }

    if sim.add_noise {
        let normal = Normal::new(0.0f32, sim.sigma).expect("valid sigma");
        let mut rng = StdRng::seed_from_u64(42);
        for v in samples.iter_mut() {
            *v += normal.sample(&mut rng);
        }
    }

    samples
        .iter()
        .map(|&v| (v.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}

fn main() {
    tracing_init::init_tracing();

    let sim = match SimConfig::parse_args() {
        Ok(sim) => sim,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage();
            std::process::exit(1);
        }
    };

    let mut config = RangingConfig::default();
    config.two_dimension_enabled = sim.two_dimension;
    if sim.two_dimension && sim.amplitude > 0.5 {
        eprintln!("Note: mixed trains at amplitude {} will clip", sim.amplitude);
    }
    if let Err(error) = config.validate() {
        eprintln!("Error: invalid configuration: {}", error);
        std::process::exit(1);
    }

    let stimulus = build_stimulus(&sim, &config);
    println!(
        "Stimulus: {} samples ({:.2} s), {} symbols per train",
        stimulus.len(),
        stimulus.len() as f32 / config.sample_rate,
        sim.count
    );

    if let Some(path) = &sim.output_path {
        if let Err(error) = wav::write_wav(path, config.sample_rate as u32, &stimulus) {
            eprintln!("Error: failed to write {}: {}", path, error);
            std::process::exit(1);
        }
        println!("Wrote stimulus to {}", path);
    }

    let (tx, rx) = mpsc::channel();
    let device_buffer = 4 * config.symbol_length();
    let handle = match spawn_capture(MemorySource::new(stimulus), &config, device_buffer, tx) {
        Ok(handle) => handle,
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    };

    let mut ranges = [0usize; 2];
    let mut fixes = 0usize;
    for update in rx {
        match update {
            RangingUpdate::Range { channel, position } => {
                ranges[(channel.number() - 1) as usize] += 1;
                println!("Position@{}: {:.3} m", channel.number(), position);
            }
            RangingUpdate::Fix(fix) => {
                fixes += 1;
                println!("Fix: ({:.3}, {:.3})", fix.x, fix.y);
            }
        }
    }

    if let Err(error) = handle.join() {
        eprintln!("Error: capture worker failed: {}", error);
        std::process::exit(1);
    }

    println!(
        "Done: {} updates on channel 1, {} on channel 2, {} fixes",
        ranges[0], ranges[1], fixes
    );
}
