//! Animation time management
//!
//! The engine core never reads a clock itself; the application advances an
//! [`AnimationClock`] once per frame and passes the resulting query time into
//! scene evaluation.

/// Caller-owned animation query time that wraps at a configured duration
#[derive(Debug, Clone)]
pub struct AnimationClock {
    current: f32,
    max_time: f32,
    paused: bool,
}

impl AnimationClock {
    /// Create a clock that wraps at `max_time` seconds
    pub fn new(max_time: f32) -> Self {
        Self {
            current: 0.0,
            max_time,
            paused: false,
        }
    }

    /// Advance by `delta` seconds and return the new query time
    ///
    /// While paused, the query time is held and returned unchanged.
    pub fn advance(&mut self, delta: f32) -> f32 {
        if !self.paused {
            self.current += delta;
            if self.max_time > 0.0 {
                self.current %= self.max_time;
            }
        }
        self.current
    }

    /// Current query time in seconds
    pub fn time(&self) -> f32 {
        self.current
    }

    /// Toggle between paused and running
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Whether the clock is currently paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clock_wraps_at_max_time() {
        let mut clock = AnimationClock::new(2.0);
        clock.advance(1.5);
        assert_relative_eq!(clock.advance(1.0), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_paused_clock_holds_time() {
        let mut clock = AnimationClock::new(10.0);
        clock.advance(1.0);
        clock.toggle_pause();
        assert_relative_eq!(clock.advance(5.0), 1.0, epsilon = 1e-6);
        clock.toggle_pause();
        assert_relative_eq!(clock.advance(1.0), 2.0, epsilon = 1e-6);
    }
}
