//! Frame statistics

use std::collections::VecDeque;
use std::time::Duration;

/// Per-frame traversal statistics
#[derive(Debug)]
pub struct FrameStats {
    /// Traversal time history for averaging
    traversal_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Average traversal time in milliseconds
    avg_traversal_ms: f32,
    /// Slowest traversal in the history window
    max_traversal_ms: f32,
    /// Total frames rendered
    frames_rendered: u64,
    /// Lights collected by the last frame
    lights: usize,
    /// Collider probes collected by the last frame
    probes: usize,
    /// Draw calls issued by the last frame
    draw_calls: usize,
}

impl FrameStats {
    /// Create a new frame stats tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            traversal_times: VecDeque::with_capacity(120),
            max_samples: 120,
            avg_traversal_ms: 0.0,
            max_traversal_ms: 0.0,
            frames_rendered: 0,
            lights: 0,
            probes: 0,
            draw_calls: 0,
        }
    }

    /// Record one completed traversal
    pub fn record_frame(&mut self, elapsed: Duration, lights: usize, probes: usize, draw_calls: usize) {
        self.frames_rendered += 1;
        self.lights = lights;
        self.probes = probes;
        self.draw_calls = draw_calls;

        if self.traversal_times.len() >= self.max_samples {
            self.traversal_times.pop_front();
        }
        self.traversal_times.push_back(elapsed);

        let total: Duration = self.traversal_times.iter().sum();
        let max = self.traversal_times.iter().max().copied().unwrap_or_default();
        let count = self.traversal_times.len() as f32;

        self.avg_traversal_ms = total.as_secs_f32() * 1000.0 / count;
        self.max_traversal_ms = max.as_secs_f32() * 1000.0;
    }

    /// Total frames rendered
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Lights collected by the last frame
    #[must_use]
    pub fn lights(&self) -> usize {
        self.lights
    }

    /// Collider probes collected by the last frame
    #[must_use]
    pub fn probes(&self) -> usize {
        self.probes
    }

    /// Draw calls issued by the last frame
    #[must_use]
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Average traversal time in milliseconds
    #[must_use]
    pub fn avg_traversal_ms(&self) -> f32 {
        self.avg_traversal_ms
    }

    /// Slowest traversal in the history window, in milliseconds
    #[must_use]
    pub fn max_traversal_ms(&self) -> f32 {
        self.max_traversal_ms
    }

    /// Get a formatted stats string
    #[must_use]
    pub fn format_stats(&self) -> String {
        format!(
            "Frames: {} | Traversal: {:.2}ms (max: {:.2}) | Lights: {} | Probes: {} | Draws: {}",
            self.frames_rendered,
            self.avg_traversal_ms,
            self.max_traversal_ms,
            self.lights,
            self.probes,
            self.draw_calls
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_frame_counts() {
        let mut stats = FrameStats::new();
        stats.record_frame(Duration::from_millis(2), 1, 2, 3);
        stats.record_frame(Duration::from_millis(4), 0, 0, 5);

        assert_eq!(stats.frames_rendered(), 2);
        assert_eq!(stats.lights(), 0);
        assert_eq!(stats.draw_calls(), 5);
        assert!((stats.avg_traversal_ms() - 3.0).abs() < 0.01);
        assert!((stats.max_traversal_ms() - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_history_window_is_bounded() {
        let mut stats = FrameStats::new();
        stats.record_frame(Duration::from_millis(100), 0, 0, 0);
        for _ in 0..120 {
            stats.record_frame(Duration::from_millis(1), 0, 0, 0);
        }

        assert_eq!(stats.frames_rendered(), 121);
        assert!((stats.max_traversal_ms() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_format_stats() {
        let stats = FrameStats::default();
        assert!(stats.format_stats().starts_with("Frames: 0"));
    }
}
