//! Generation latency tracking
//!
//! Keeps a sliding window of inference durations and derives the average
//! and 95th percentile for the per-turn log line.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// 95th percentile above which a warning is logged
pub const SLOW_GENERATION_P95_MS: u128 = 30_000;

/// Maximum number of samples kept for percentile calculation
const MAX_SAMPLES: usize = 100;

pub struct GenerationMetrics {
    samples: Mutex<VecDeque<Duration>>,
}

impl GenerationMetrics {
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(MAX_SAMPLES)),
        }
    }

    fn samples(&self) -> MutexGuard<'_, VecDeque<Duration>> {
        self.samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records one generation duration
    pub fn record(&self, duration: Duration) {
        let mut samples = self.samples();
        samples.push_back(duration);
        if samples.len() > MAX_SAMPLES {
            samples.pop_front();
        }
    }

    /// 95th percentile in milliseconds
    pub fn percentile_95(&self) -> Option<u128> {
        let samples = self.samples();
        if samples.is_empty() {
            return None;
        }

        let mut times_ms: Vec<u128> = samples.iter().map(Duration::as_millis).collect();
        times_ms.sort_unstable();

        let index = ((times_ms.len() as f64 * 0.95).ceil() as usize).saturating_sub(1);
        Some(times_ms[index])
    }

    pub fn average(&self) -> Option<u128> {
        let samples = self.samples();
        if samples.is_empty() {
            return None;
        }

        let sum: u128 = samples.iter().map(Duration::as_millis).sum();
        Some(sum / samples.len() as u128)
    }

    pub fn sample_count(&self) -> usize {
        self.samples().len()
    }
}

impl Default for GenerationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_calculation() {
        let metrics = GenerationMetrics::new();
        for i in 1..=100 {
            metrics.record(Duration::from_millis(i * 100));
        }

        assert_eq!(metrics.percentile_95(), Some(9500));
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = GenerationMetrics::new();
        assert_eq!(metrics.percentile_95(), None);
        assert_eq!(metrics.average(), None);
        assert_eq!(metrics.sample_count(), 0);
    }

    #[test]
    fn test_sample_window() {
        let metrics = GenerationMetrics::new();
        for i in 1..=150 {
            metrics.record(Duration::from_millis(i * 10));
        }

        assert_eq!(metrics.sample_count(), MAX_SAMPLES);
        // Oldest 50 samples (10..=500 ms) are gone
        assert_eq!(metrics.average(), Some(1005));
    }

    #[test]
    fn test_average_calculation() {
        let metrics = GenerationMetrics::new();
        metrics.record(Duration::from_millis(1000));
        metrics.record(Duration::from_millis(2000));
        metrics.record(Duration::from_millis(3000));

        assert_eq!(metrics.average(), Some(2000));
    }
}
