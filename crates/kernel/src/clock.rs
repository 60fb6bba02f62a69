/// Elapsed and delta time for one frame, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    pub elapsed: f32,
    pub delta: f32,
    pub frame: u64,
}

/// Tracks time between frames. The caller supplies elapsed seconds since
/// start, which keeps the clock deterministic under test.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    previous: f32,
    frame: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, elapsed: f32) -> FrameTime {
        let delta = (elapsed - self.previous).max(0.0);
        self.previous = elapsed;
        self.frame += 1;
        FrameTime {
            elapsed,
            delta,
            frame: self.frame,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_difference_of_elapsed() {
        let mut clock = FrameClock::new();
        let t1 = clock.tick(0.5);
        assert_eq!(t1.delta, 0.5);
        let t2 = clock.tick(0.75);
        assert_eq!(t2.delta, 0.25);
        assert_eq!(t2.frame, 2);
    }

    #[test]
    fn time_going_backwards_clamps_delta() {
        let mut clock = FrameClock::new();
        clock.tick(2.0);
        assert_eq!(clock.tick(1.0).delta, 0.0);
    }
}
