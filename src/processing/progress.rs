//! Progress tracking for background tasks

/// Passive sink for progress percentages in `0..=100`.
pub trait ProgressReporter {
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressReporter for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Writes progress to the log at info level.
#[derive(Debug, Default, Clone)]
pub struct LogProgressReporter {
    label: String,
}

impl LogProgressReporter {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self { label: label.into() }
    }
}

impl ProgressReporter for LogProgressReporter {
    fn report(&mut self, percent: u8) {
        if self.label.is_empty() {
            log::info!("Progress: {}%", percent);
        } else {
            log::info!("{}: {}%", self.label, percent);
        }
    }
}

/// Progress of the task currently being displayed.
///
/// Starts at 0, never decreases, and stays at 100 once finished until
/// [`reset`](Self::reset) is called for the next task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    value: u8,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Move forward to `percent` (clamped to 100). Returns `false` and
    /// leaves the state alone when `percent` would go backwards.
    pub fn advance(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if percent < self.value {
            return false;
        }
        self.value = percent;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.value >= 100
    }

    /// Whether a progress indicator should be on screen.
    pub fn indicator_visible(&self) -> bool {
        self.value < 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut state = ProgressState::new();
        assert!(state.advance(10));
        assert!(state.advance(40));
        assert!(!state.advance(20));
        assert_eq!(state.value(), 40);
        assert!(state.advance(40));
        assert!(state.advance(250));
        assert_eq!(state.value(), 100);
        assert!(state.is_complete());
        assert!(!state.indicator_visible());

        state.reset();
        assert_eq!(state.value(), 0);
        assert!(state.indicator_visible());
    }

    #[test]
    fn test_closure_reporter() {
        let mut seen = Vec::new();
        {
            let mut reporter = |p: u8| seen.push(p);
            reporter.report(10);
            reporter.report(80);
        }
        assert_eq!(seen, vec![10, 80]);
    }
}
