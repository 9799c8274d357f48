use std::collections::VecDeque;

/// Number of recent face centers averaged for the crop position.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 15;

/// Moving average over the most recent horizontal face centers.
///
/// One tracker belongs to one clip render. The history never holds more than
/// `window` entries.
#[derive(Debug, Clone)]
pub struct CropTracker {
    history: VecDeque<f64>,
    window: usize,
}

impl Default for CropTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

impl CropTracker {
    /// A window of zero is treated as one (no smoothing).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            history: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Record a candidate center and return the smoothed center.
    pub fn observe(&mut self, center_x: f64) -> f64 {
        self.history.push_back(center_x);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_returned_as_is() {
        let mut tracker = CropTracker::default();
        assert_eq!(tracker.observe(640.0), 640.0);
        assert_eq!(tracker.history_len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = CropTracker::new(15);
        for i in 0..100 {
            tracker.observe(i as f64);
            assert!(tracker.history_len() <= 15);
        }
        assert_eq!(tracker.history_len(), 15);
    }

    #[test]
    fn test_mean_of_last_window_observations() {
        let mut tracker = CropTracker::new(15);
        let mut last = 0.0;
        for i in 1..=20 {
            last = tracker.observe(i as f64);
        }
        // Mean of 6..=20
        assert!((last - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_history_mean() {
        let mut tracker = CropTracker::new(15);
        tracker.observe(100.0);
        tracker.observe(200.0);
        assert!((tracker.observe(600.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_window_is_one() {
        let mut tracker = CropTracker::new(0);
        tracker.observe(10.0);
        assert_eq!(tracker.observe(30.0), 30.0);
        assert_eq!(tracker.window(), 1);
    }
}
