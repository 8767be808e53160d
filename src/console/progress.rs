use std::time::Duration;

/// Estimated upload progress.
///
/// The browser cannot see how far the server is through embedding a file, so
/// the bar advances a fixed step per tick and holds at [`ESTIMATE_CAP`] until
/// the request completes. It never reflects transferred bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEstimator {
    percent: u8,
    step: u8,
    complete: bool,
}

/// Highest estimate shown before the server answers.
pub const ESTIMATE_CAP: u8 = 90;
pub const DEFAULT_STEP: u8 = 5;
/// How often the browser advances the estimate.
pub const TICK_INTERVAL: Duration = Duration::from_millis(400);

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_STEP)
    }
}

impl ProgressEstimator {
    pub fn new(step: u8) -> Self {
        Self {
            percent: 0,
            step: step.max(1),
            complete: false,
        }
    }

    /// Advance one tick and return the new estimate.
    pub fn tick(&mut self) -> u8 {
        if !self.complete {
            self.percent = self.percent.saturating_add(self.step).min(ESTIMATE_CAP);
        }
        self.percent
    }

    /// Mark the upload as finished.
    pub fn complete(&mut self) -> u8 {
        self.complete = true;
        self.percent = 100;
        self.percent
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn label(&self) -> String {
        if self.complete {
            "Upload complete".to_string()
        } else {
            format!("Uploading... about {}% (estimated)", self.percent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_caps_until_complete() {
        let mut progress = ProgressEstimator::new(25);
        assert_eq!(progress.tick(), 25);
        assert_eq!(progress.tick(), 50);
        assert_eq!(progress.tick(), 75);
        assert_eq!(progress.tick(), ESTIMATE_CAP);
        assert_eq!(progress.tick(), ESTIMATE_CAP);
        assert!(!progress.is_complete());

        assert_eq!(progress.complete(), 100);
        assert_eq!(progress.tick(), 100);
        assert_eq!(progress.label(), "Upload complete");
    }

    #[test]
    fn test_zero_step_still_moves() {
        let mut progress = ProgressEstimator::new(0);
        assert_eq!(progress.tick(), 1);
    }

    #[test]
    fn test_label_says_estimated() {
        let mut progress = ProgressEstimator::default();
        progress.tick();
        assert_eq!(progress.label(), "Uploading... about 5% (estimated)");
    }
}
