use serde::Serialize;

/// Frames released by one `advance` call in play mode are capped so a long
/// stall does not replay seconds of motion at once.
pub const MAX_CATCH_UP_FRAMES: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ClockMode {
    Play,
    DebugStep,
}

/// Play mode releases one frame per `1 / frame_rate` seconds of elapsed time.
/// Debug mode ignores time and releases exactly the requested steps.
#[derive(Clone, Debug, Serialize)]
pub struct FrameClock {
    pub mode: ClockMode,
    frame_seconds: f32,
    accumulator: f32,
    pending_steps: u32,
    frame: u64,
}

impl FrameClock {
    pub fn new(frame_rate: f32, debug_step: bool) -> Self {
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            60.0
        };
        Self {
            mode: if debug_step {
                ClockMode::DebugStep
            } else {
                ClockMode::Play
            },
            frame_seconds: 1.0 / frame_rate,
            accumulator: 0.0,
            pending_steps: 0,
            frame: 0,
        }
    }

    pub fn frame_seconds(&self) -> f32 {
        self.frame_seconds
    }

    /// Frames completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn set_mode(&mut self, mode: ClockMode) {
        self.mode = mode;
        self.accumulator = 0.0;
        self.pending_steps = 0;
    }

    pub fn request_step(&mut self, frames: u32) {
        self.pending_steps = self.pending_steps.saturating_add(frames);
    }

    /// Feeds `dt` seconds and returns how many frames are due now.
    pub fn advance(&mut self, dt: f32) -> u32 {
        match self.mode {
            ClockMode::Play => {
                if dt.is_finite() && dt > 0.0 {
                    self.accumulator += dt;
                }
                let mut due = 0;
                while self.accumulator >= self.frame_seconds && due < MAX_CATCH_UP_FRAMES {
                    self.accumulator -= self.frame_seconds;
                    due += 1;
                }
                if due == MAX_CATCH_UP_FRAMES {
                    self.accumulator = self.accumulator.min(self.frame_seconds);
                }
                due
            }
            ClockMode::DebugStep => std::mem::take(&mut self.pending_steps),
        }
    }

    pub fn mark_frame(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.pending_steps = 0;
        self.frame = 0;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60.0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_mode_releases_frames_at_the_frame_rate() {
        let mut clock = FrameClock::new(60.0, false);
        assert_eq!(clock.advance(0.01), 0);
        assert_eq!(clock.advance(0.01), 1);
        assert_eq!(clock.advance(1.0 / 30.0), 2);
    }

    #[test]
    fn play_mode_caps_catch_up() {
        let mut clock = FrameClock::new(60.0, false);
        assert_eq!(clock.advance(10.0), MAX_CATCH_UP_FRAMES);
        assert!(clock.advance(0.0) <= 1);
    }

    #[test]
    fn debug_step_ignores_time() {
        let mut clock = FrameClock::new(60.0, true);
        assert_eq!(clock.advance(1.0), 0);
        clock.request_step(2);
        assert_eq!(clock.advance(0.0), 2);
        assert_eq!(clock.advance(0.0), 0);
    }

    #[test]
    fn invalid_frame_rate_falls_back_to_sixty() {
        let clock = FrameClock::new(0.0, false);
        assert!((clock.frame_seconds() - 1.0 / 60.0).abs() < 0.0001);
    }
}
