//! Automatic gain control

/// Automatic gain control
///
/// Normalizes the receiver input to an average absolute value of 1.0.
/// Both the timing recovery loop and the acquisition correlator assume
/// a known signal level; the `Agc` provides it regardless of how hot
/// or quiet the incoming PCM stream is.
///
/// The gain is a single feedback tap driven by the rectified output
/// level. Once the receiver has acquired a transmission, the gain is
/// locked so that fades within the transmission do not pump the
/// signal level underneath the tracking loops.
#[derive(Clone, Debug)]
pub struct Agc {
    // update bandwidth: higher→faster
    bandwidth: f32,

    // gain limits
    min_gain: f32,
    max_gain: f32,

    // if true, the gain is frozen
    locked: bool,

    gain: f32,
}

impl Agc {
    /// New AGC
    ///
    /// `bandwidth` is the update rate, as a fraction of the sampling
    /// rate: `0.0` never updates, and `1.0` slams the gain on every
    /// sample. The gain is limited to `min_gain ..= max_gain`,
    /// expressed in units of input amplitude.
    pub fn new(bandwidth: f32, min_gain: f32, max_gain: f32) -> Self {
        Self {
            bandwidth: f32::clamp(bandwidth, 0.0f32, 1.0f32),
            min_gain,
            max_gain,
            locked: false,
            gain: f32::clamp(1.0f32, min_gain, max_gain),
        }
    }

    /// Reset to unity gain, unlocked
    pub fn reset(&mut self) {
        self.gain = f32::clamp(1.0f32, self.min_gain, self.max_gain);
        self.locked = false;
    }

    /// Normalize one input sample
    ///
    /// Applies the current gain and, if unlocked, steps the gain
    /// toward the level that brings the rectified output to 1.0.
    #[inline]
    pub fn input(&mut self, input: f32) -> f32 {
        let out = input * self.gain;
        if !self.locked {
            self.gain = f32::clamp(
                self.gain + (1.0f32 - out.abs()) * self.bandwidth,
                self.min_gain,
                self.max_gain,
            );
        }
        out
    }

    /// Freeze or unfreeze the gain
    ///
    /// While locked, [`input()`](Self::input) still applies the gain
    /// but never changes it.
    pub fn lock(&mut self, lock: bool) {
        self.locked = lock;
    }

    /// Current gain value
    pub fn gain(&self) -> f32 {
        self.gain
    }
}
