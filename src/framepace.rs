use std::time::{Duration, Instant};

/// Limits the frame rate of the driver loop and keeps a smoothed frame rate.
pub struct FramePacer {
    frame_start: Instant,
    last_frametime: f32,
    average_frametime: f32,
}

impl FramePacer {
    const SMOOTHING: f32 = 0.1;

    pub fn new() -> Self {
        Self {
            frame_start: Instant::now(),
            last_frametime: 0.0,
            average_frametime: 0.0,
        }
    }

    /// Seconds spent in the current frame so far.
    pub fn elapsed(&self) -> f32 {
        self.frame_start.elapsed().as_secs_f32()
    }

    pub fn last_frametime(&self) -> f32 {
        self.last_frametime
    }

    pub fn framerate(&self) -> f32 {
        if self.average_frametime > 0.0 {
            1.0 / self.average_frametime
        } else {
            0.0
        }
    }

    pub fn begin_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Sleeps out the rest of the frame when `target_fps` is non-zero.
    pub fn end_frame(&mut self, target_fps: u32) {
        if target_fps > 0 {
            let limit = 1.0 / target_fps as f32;
            const ACCURACY: f32 = 0.0001; // 100 microseconds
            let sleep_time = limit - self.elapsed() - ACCURACY;

            if sleep_time > 0.0 {
                std::thread::sleep(Duration::from_secs_f32(sleep_time));
            }
            while self.elapsed() < limit {
                std::thread::yield_now();
            }
        }

        self.last_frametime = self.elapsed();
        self.average_frametime = if self.average_frametime == 0.0 {
            self.last_frametime
        } else {
            self.average_frametime + (self.last_frametime - self.average_frametime) * Self::SMOOTHING
        };
    }
}
