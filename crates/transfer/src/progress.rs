use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
const DEFAULT_MAX_SAMPLES: usize = 100;

struct Sample {
    bytes: usize,
    timestamp: Instant,
}

/// Estimates receive throughput over a sliding window of samples.
pub struct ThroughputMeter {
    samples: VecDeque<Sample>,
    max_samples: usize,
    window: Duration,
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl ThroughputMeter {
    /// Creates a new meter.
    ///
    /// - `window`: time window for the estimate (default 5 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            max_samples: max_samples.unwrap_or(DEFAULT_MAX_SAMPLES).max(2),
            window: window.unwrap_or(DEFAULT_WINDOW),
        }
    }

    /// Records `bytes` received at the current instant.
    pub fn add_sample(&mut self, bytes: usize) {
        self.add_sample_at(bytes, Instant::now());
    }

    fn add_sample_at(&mut self, bytes: usize, timestamp: Instant) {
        self.samples.push_back(Sample { bytes, timestamp });

        if let Some(cutoff) = timestamp.checked_sub(self.window) {
            while self.samples.front().is_some_and(|s| s.timestamp < cutoff) {
                self.samples.pop_front();
            }
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Average bytes/second within the window. Returns 0.0 with fewer than
    /// two samples.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if self.samples.len() < 2 || elapsed.is_zero() {
            return 0.0;
        }

        let total: usize = self.samples.iter().map(|s| s.bytes).sum();
        total as f64 / elapsed.as_secs_f64()
    }

    /// Clears all recorded samples.
    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
