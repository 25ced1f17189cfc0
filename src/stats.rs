//! Rolling correlation statistics.
//!
//! The detector keeps the most recent correlation results in a bounded FIFO
//! and evaluates its lock conditions against the rolling mean intensity and
//! the spread of the peak positions.

use std::collections::VecDeque;

/// One matched-filter result: the peak-to-mean intensity ratio and the lag
/// at which the peak occurred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationSample {
    pub intensity: f32,
    pub peak_index: usize,
}

/// Fixed-capacity FIFO of the most recent [`CorrelationSample`]s.
///
/// Pushing onto a full window evicts the oldest sample, so the length never
/// exceeds the capacity. State evaluation only makes sense on a full
/// window; callers check [`StatsWindow::is_full`] first.
#[derive(Debug, Clone)]
pub struct StatsWindow {
    samples: VecDeque<CorrelationSample>,
    capacity: usize,
}

impl StatsWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "stats window capacity must be at least 1");
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest if the window is over capacity.
    pub fn push(&mut self, sample: CorrelationSample) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn mean_intensity(&self) -> f32 {
        self.samples.iter().map(|s| s.intensity).sum::<f32>() / self.samples.len() as f32
    }

    pub fn mean_index(&self) -> f32 {
        self.samples.iter().map(|s| s.peak_index as f32).sum::<f32>() / self.samples.len() as f32
    }

    /// Population standard deviation (divide by N) of the peak indices.
    pub fn std_index(&self) -> f32 {
        let mean = self.mean_index();
        let sum: f32 = self
            .samples
            .iter()
            .map(|s| {
                let diff = s.peak_index as f32 - mean;
                diff * diff
            })
            .sum();
        (sum / self.samples.len() as f32).sqrt()
    }
}
