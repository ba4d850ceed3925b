use std::time::{Duration, Instant};

const BOUNCE_PERIOD_MS: u128 = 3000;
const BOUNCE_RAMP_MS: u128 = 500; // up, then the same down
const BOUNCE_ACTIVE_MS: u128 = 1000;

/// Which idle animation runs while the viewer is untouched. Exactly one
/// driver is active; the controller never consumes both in one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationMode {
    /// Periodic nudge: a short wiggle every few seconds, frame untouched.
    Bounce,
    /// Continuous rotation through all frames with cross-fade between
    /// neighbors.
    Spin,
}

/// One bounce observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BounceSample {
    /// Nudge strength in `[0, 1]`: ramps 0 to 1 over the first 500 ms of the
    /// period, back to 0 over the next 500 ms, then rests for 2000 ms.
    pub value: f64,
    /// True while inside the active ramp window.
    pub bouncing: bool,
}

/// Periodic attention nudge with a 3 s period. The epoch starts at the first
/// sample after (re-)enabling, so every enable begins a fresh period.
#[derive(Debug)]
pub struct BounceDriver {
    epoch: Option<Instant>,
    enabled: bool,
}

impl BounceDriver {
    pub fn new() -> Self {
        Self {
            epoch: None,
            enabled: true,
        }
    }

    /// Disabling zeroes the output and forgets the epoch; re-enabling
    /// restarts the period at the next sample.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.epoch = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn sample(&mut self, now: Instant) -> BounceSample {
        if !self.enabled {
            return BounceSample {
                value: 0.0,
                bouncing: false,
            };
        }
        let epoch = *self.epoch.get_or_insert(now);
        let phase = now.saturating_duration_since(epoch).as_millis() % BOUNCE_PERIOD_MS;

        let value = if phase < BOUNCE_RAMP_MS {
            phase as f64 / BOUNCE_RAMP_MS as f64
        } else if phase < BOUNCE_ACTIVE_MS {
            1.0 - (phase - BOUNCE_RAMP_MS) as f64 / BOUNCE_RAMP_MS as f64
        } else {
            0.0
        };

        BounceSample {
            value,
            bouncing: phase < BOUNCE_ACTIVE_MS,
        }
    }
}

impl Default for BounceDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// One spin observation: the frame pair to show and how far between them
/// the rotation currently sits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinSample {
    pub frame: u32,
    pub next_frame: u32,
    /// Cross-fade weight toward `next_frame`, in `[0, 1)`.
    pub blend: f64,
    /// Fractional frame position, in `[0, total_frames)`.
    pub exact: f64,
}

/// Continuous full-circle rotation. `duration` and `total_frames` are read
/// live at every sample, so mid-flight parameter changes take effect on the
/// next tick without restarting the rotation.
#[derive(Debug)]
pub struct SpinDriver {
    epoch: Option<Instant>,
    enabled: bool,
}

impl SpinDriver {
    pub fn new() -> Self {
        Self {
            epoch: None,
            enabled: true,
        }
    }

    /// Disabling forgets the epoch; re-enabling restarts from frame 0.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.epoch = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn sample(&mut self, now: Instant, duration: Duration, total_frames: u32) -> SpinSample {
        if !self.enabled || total_frames == 0 || duration.is_zero() {
            return SpinSample {
                frame: 0,
                next_frame: 0,
                blend: 0.0,
                exact: 0.0,
            };
        }
        let epoch = *self.epoch.get_or_insert(now);
        let elapsed = now.saturating_duration_since(epoch).as_secs_f64();
        let progress = (elapsed / duration.as_secs_f64()).fract();
        let exact = progress * f64::from(total_frames);
        let frame = (exact.floor() as u32) % total_frames;
        SpinSample {
            frame,
            next_frame: (frame + 1) % total_frames,
            blend: exact.fract(),
            exact,
        }
    }
}

impl Default for SpinDriver {
    fn default() -> Self {
        Self::new()
    }
}
