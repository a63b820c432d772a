use std::time::Duration;
use tokio::time::Instant;

/// Debounced hide deadline for the on-screen controls.
#[derive(Debug, Clone)]
pub struct AutoHide {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl AutoHide {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// Replaces any pending deadline; only arms a new one while playing.
    pub fn reset(&mut self, now: Instant, is_playing: bool) {
        self.deadline = is_playing.then(|| now + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once when the deadline has passed, clearing it.
    pub fn expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_rearms_from_latest_activity() {
        let start = Instant::now();
        let mut hide = AutoHide::new(Duration::from_millis(3000));

        hide.reset(start, true);
        hide.reset(start + Duration::from_millis(2000), true);

        assert!(!hide.expired(start + Duration::from_millis(3000)));
        assert!(hide.expired(start + Duration::from_millis(5000)));
        assert!(!hide.expired(start + Duration::from_millis(6000)));
    }

    #[test]
    fn paused_activity_leaves_no_deadline() {
        let start = Instant::now();
        let mut hide = AutoHide::new(Duration::from_millis(3000));
        hide.reset(start, true);
        hide.reset(start, false);
        assert!(hide.deadline().is_none());
    }
}
