//! Streaming capture and playback workers.
//!
//! The capture worker drains an [`AudioSource`] in device-buffer-sized
//! blocking reads, slices the stream into non-overlapping symbol-length
//! windows, feeds every window through each active channel detector in
//! order (channel 1 strictly before channel 2), and pushes ranging updates
//! into an `mpsc` sender. The playback worker keeps a staging buffer topped
//! up with the active symbol at 80% amplitude and blocking-writes it to an
//! [`AudioSink`].
//!
//! Workers stop cooperatively: [`WorkerHandle::stop`] flips a shared flag
//! and joins. The flag is checked before and inside each device wait, but
//! the blocking call itself is uninterruptible, so shutdown latency is
//! bounded by one device-buffer period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use snafu::Snafu;
use tracing::{debug, info, warn};

use crate::config::RangingConfig;
use crate::detector::{Channel, ChannelDetector, DetectorEvent};
use crate::solver::{Fix, PositionSolver};

/// Full scale of a 16-bit PCM sample.
const PCM_FULL_SCALE: f32 = 32768.0;

/// Playback level relative to full scale.
const PLAYBACK_AMPLITUDE: f32 = 0.8;

/// Fatal device failure, the equivalent of a negative return from the
/// underlying read/write call.
#[derive(Debug, Snafu)]
#[snafu(display("audio device error: {message}"))]
pub struct DeviceError {
    pub message: String,
}

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("error when reading audio: {source}"))]
    Read { source: DeviceError },

    #[snafu(display("error when writing audio: {source}"))]
    Write { source: DeviceError },

    #[snafu(display("failed to spawn {name} worker: {source}"))]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    #[snafu(display("{name} worker panicked"))]
    Panicked { name: &'static str },
}

/// Blocking mono 16-bit PCM capture collaborator.
pub trait AudioSource: Send {
    /// Read up to `buf.len()` samples, blocking until at least one is
    /// available. `Ok(0)` means the stream has ended (offline sources);
    /// a [`DeviceError`] is fatal to the capture worker.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, DeviceError>;
}

/// Blocking mono 16-bit PCM playback collaborator.
pub trait AudioSink: Send {
    /// Write up to `buf.len()` samples, returning how many were accepted.
    fn write(&mut self, buf: &[i16]) -> Result<usize, DeviceError>;
}

/// One per-channel or combined result pushed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangingUpdate {
    Range { channel: Channel, position: f32 },
    Fix(Fix),
}

/// Handle to a running worker thread. Dropping the handle detaches the
/// worker; use [`WorkerHandle::stop`] for an orderly shutdown.
pub struct WorkerHandle {
    name: &'static str,
    running: Arc<AtomicBool>,
    thread: JoinHandle<Result<(), PipelineError>>,
}

impl WorkerHandle {
    /// Signal the worker to stop and wait for it to finish.
    pub fn stop(self) -> Result<(), PipelineError> {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    /// Wait for the worker to finish on its own (an offline source running
    /// dry, or a device error).
    pub fn join(self) -> Result<(), PipelineError> {
        let WorkerHandle { name, thread, .. } = self;
        match thread.join() {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Panicked { name }),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Start the capture worker: one detector per active channel, one solver,
/// updates pushed into `updates`.
///
/// `device_buffer` is the number of samples per blocking read; each
/// iteration fills exactly one device buffer before slicing.
pub fn spawn_capture<S: AudioSource + 'static>(
    source: S,
    config: &RangingConfig,
    device_buffer: usize,
    updates: Sender<RangingUpdate>,
) -> Result<WorkerHandle, PipelineError> {
    let mut detectors = vec![config.detector(Channel::One)];
    if config.two_dimension_enabled {
        detectors.push(config.detector(Channel::Two));
    }
    let symbol_length = config.symbol_length();

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let thread = thread::Builder::new()
        .name("capture".into())
        .spawn(move || capture_loop(source, detectors, symbol_length, device_buffer, flag, updates))
        .map_err(|source| PipelineError::Spawn {
            name: "capture",
            source,
        })?;

    Ok(WorkerHandle {
        name: "capture",
        running,
        thread,
    })
}

/// Start the playback worker emitting the active symbol in a loop. The
/// second sender's symbol is used when `use_second_sender` is set.
pub fn spawn_playback<S: AudioSink + 'static>(
    sink: S,
    config: &RangingConfig,
) -> Result<WorkerHandle, PipelineError> {
    let channel = if config.use_second_sender {
        Channel::Two
    } else {
        Channel::One
    };
    let symbol = config.symbol(channel);

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let thread = thread::Builder::new()
        .name("playback".into())
        .spawn(move || playback_loop(sink, symbol, flag))
        .map_err(|source| PipelineError::Spawn {
            name: "playback",
            source,
        })?;

    Ok(WorkerHandle {
        name: "playback",
        running,
        thread,
    })
}

fn capture_loop<S: AudioSource>(
    mut source: S,
    mut detectors: Vec<ChannelDetector>,
    symbol_length: usize,
    device_buffer: usize,
    running: Arc<AtomicBool>,
    updates: Sender<RangingUpdate>,
) -> Result<(), PipelineError> {
    let mut solver = PositionSolver::new();
    let mut leftover: Vec<i16> = Vec::new();
    let mut device = vec![0i16; device_buffer];

    info!(device_buffer, symbol_length, "capture worker started");
    let mut end_of_stream = false;
    while running.load(Ordering::SeqCst) && !end_of_stream {
        // Fill exactly one device buffer, checking the stop flag between
        // partial reads.
        let mut read = 0;
        while running.load(Ordering::SeqCst) && read != device_buffer {
            let count = source
                .read(&mut device[read..])
                .map_err(|source| PipelineError::Read { source })?;
            if count == 0 {
                end_of_stream = true;
                break;
            }
            read += count;
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let mut total = std::mem::take(&mut leftover);
        total.extend_from_slice(&device[..read]);

        let mut offset = 0;
        while offset + symbol_length < total.len() {
            let window: Vec<f32> = total[offset..offset + symbol_length]
                .iter()
                .map(|&s| f32::from(s) / PCM_FULL_SCALE)
                .collect();
            for detector in detectors.iter_mut() {
                let channel = detector.channel();
                for event in detector.process_window(&window) {
                    handle_event(channel, event, &mut solver, &updates);
                }
            }
            offset += symbol_length;
        }
        leftover = total.split_off(offset);
    }

    info!("capture worker stopped");
    Ok(())
}

fn handle_event(
    channel: Channel,
    event: DetectorEvent,
    solver: &mut PositionSolver,
    updates: &Sender<RangingUpdate>,
) {
    match event {
        DetectorEvent::Locked {
            mean_intensity,
            index_std,
        } => info!(
            channel = channel.number(),
            mean_intensity, index_std, "receiver locked"
        ),
        DetectorEvent::Unlocked {
            mean_intensity,
            index_std,
        } => info!(
            channel = channel.number(),
            mean_intensity, index_std, "receiver unlocked"
        ),
        DetectorEvent::Range { position } => {
            debug!(channel = channel.number(), position, "position update");
            if updates
                .send(RangingUpdate::Range { channel, position })
                .is_err()
            {
                warn!("result sink disconnected, dropping position update");
            }
            if let Some(fix) = solver.update(channel, position) {
                if updates.send(RangingUpdate::Fix(fix)).is_err() {
                    warn!("result sink disconnected, dropping fix");
                }
            }
        }
    }
}

fn playback_loop<S: AudioSink>(
    mut sink: S,
    symbol: Vec<f32>,
    running: Arc<AtomicBool>,
) -> Result<(), PipelineError> {
    let symbol_length = symbol.len();
    let scaled: Vec<i16> = symbol
        .iter()
        .map(|&v| (v * PLAYBACK_AMPLITUDE * PCM_FULL_SCALE).round() as i16)
        .collect();

    info!(symbol_length, "playback worker started");
    let mut data: Vec<i16> = Vec::new();
    while running.load(Ordering::SeqCst) {
        if data.len() < symbol_length {
            data.extend_from_slice(&scaled);
        }
        let written = sink
            .write(&data)
            .map_err(|source| PipelineError::Write { source })?;
        data.drain(..written);
    }

    info!("playback worker stopped");
    Ok(())
}

/// In-memory capture source for tests and offline simulation. Reads run
/// dry (`Ok(0)`) once the samples are exhausted, which ends the capture
/// worker gracefully.
pub struct MemorySource {
    samples: Vec<i16>,
    cursor: usize,
    max_read: usize,
}

impl MemorySource {
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples,
            cursor: 0,
            max_read: usize::MAX,
        }
    }

    /// Cap each read at `max_read` samples to exercise partial-read
    /// handling the way a real device would.
    pub fn with_max_read(samples: Vec<i16>, max_read: usize) -> Self {
        Self {
            samples,
            cursor: 0,
            max_read,
        }
    }
}

impl AudioSource for MemorySource {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, DeviceError> {
        let remaining = self.samples.len() - self.cursor;
        let count = buf.len().min(self.max_read).min(remaining);
        buf[..count].copy_from_slice(&self.samples[self.cursor..self.cursor + count]);
        self.cursor += count;
        Ok(count)
    }
}

/// Playback sink that accepts and discards everything.
#[derive(Default)]
pub struct NullSink {
    pub written: usize,
}

impl AudioSink for NullSink {
    fn write(&mut self, buf: &[i16]) -> Result<usize, DeviceError> {
        self.written += buf.len();
        Ok(buf.len())
    }
}
