use crate::mode::WaveformMode;
use crate::modem::Modem;
use crate::waveform;

/// Builds a serial-tone [`Modem`]
///
/// The builder comes with a sensible set of default options.
/// All you really need to provide is the input sampling rate.
/// The modem was designed to work well at a sampling rate of
/// 9600 Hz, however, and you may wish to tweak some of these
/// values.
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release. If you
/// care very strongly about a setting, be sure to configure
/// it here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModemBuilder {
    input_rate: u32,
    mode: WaveformMode,
    agc_bandwidth: f32,
    timing_bandwidth: f32,
    timing_damping: f32,
    timing_max_deviation: f32,
    sync_threshold: f32,
    probes_to_confirm: u32,
    probe_miss_limit: u32,
}

impl ModemBuilder {
    /// New modem with "sensible" defaults
    ///
    /// The only mandatory parameter is the input sampling rate,
    /// in Hz. The rate must be at least
    /// [`MIN_SAMPLE_RATE`](crate::waveform::MIN_SAMPLE_RATE):
    /// the symbol interpolator needs a minimum of four samples
    /// per symbol. Integer multiples of the symbol rate make
    /// the timing loop's job easiest, but any rate at or above
    /// the minimum is accepted.
    pub fn new(input_rate: u32) -> Self {
        Self {
            input_rate,
            mode: WaveformMode::default(),
            agc_bandwidth: 0.05f32,
            timing_bandwidth: 0.01f32,
            timing_damping: std::f32::consts::FRAC_1_SQRT_2,
            timing_max_deviation: 0.03f32,
            sync_threshold: 0.50f32,
            probes_to_confirm: 8,
            probe_miss_limit: 32,
        }
    }

    /// Build a modem
    ///
    /// Checks the configuration and builds the processing
    /// chain. Once built, the modem is immediately ready to
    /// process samples.
    pub fn build(&self) -> Result<Modem, ConfigError> {
        if self.input_rate < waveform::MIN_SAMPLE_RATE {
            return Err(ConfigError::SampleRate(self.input_rate));
        }
        if !(self.timing_bandwidth > 0.0f32) {
            return Err(ConfigError::LoopBandwidth(self.timing_bandwidth));
        }
        if !(self.timing_damping > 0.0f32) {
            return Err(ConfigError::Damping(self.timing_damping));
        }
        if !(self.sync_threshold > 0.0f32 && self.sync_threshold <= 1.0f32) {
            return Err(ConfigError::Threshold(self.sync_threshold));
        }
        Ok(Modem::from_builder(self))
    }

    /// Waveform operating mode
    ///
    /// Selects the bit rate and interleave profile. See
    /// [`WaveformMode`] for the available profiles.
    pub fn with_mode(&mut self, mode: WaveformMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Automatic gain control bandwidth (fraction of input rate)
    ///
    /// Controls how fast the AGC is permitted to update. The
    /// AGC normalizes the PCM input to an amplitude near 1.0
    /// before demodulation, and its gain is frozen once frame
    /// sync is acquired.
    pub fn with_agc_bandwidth(&mut self, bw: f32) -> &mut Self {
        self.agc_bandwidth = f32::clamp(bw, 0.0, 1.0);
        self
    }

    /// Timing loop bandwidth (fraction of symbol rate)
    ///
    /// The timing loop bandwidth controls how quickly the
    /// symbol timing estimate is allowed to change. The
    /// correlator presets the symbol clock on every frame
    /// detection, so the loop only has to track residual
    /// drift and a narrow bandwidth is appropriate.
    ///
    /// The loop bandwidth is specified as a fraction of the
    /// symbol rate, which is 2400 Hz.
    pub fn with_timing_bandwidth(&mut self, bw: f32) -> &mut Self {
        self.timing_bandwidth = f32::clamp(bw, 0.0, 1.0);
        self
    }

    /// Timing loop damping factor
    ///
    /// Damping factor for the second-order timing loop filter.
    /// The default of `1/sqrt(2)` gives the usual compromise
    /// between response time and overshoot. Values below about
    /// 0.5 ring badly; leave this alone unless you know you
    /// need it.
    pub fn with_timing_damping(&mut self, damping: f32) -> &mut Self {
        self.timing_damping = f32::max(damping, 0.0);
        self
    }

    /// Maximum timing deviation (fraction of symbol rate)
    ///
    /// `max_dev` is the maximum permitted deviation from the
    /// ideal symbol rate, which is 2400 Hz. `max_dev` should be
    /// given in fractions of one symbol, where 0.0 represents
    /// no deviation and 0.5 represents an entire half-symbol of
    /// deviation. Keep this value small!
    pub fn with_timing_max_deviation(&mut self, max_dev: f32) -> &mut Self {
        self.timing_max_deviation = f32::clamp(max_dev, 0.0, 0.5);
        self
    }

    /// Acquisition correlation threshold
    ///
    /// The modem declares frame sync when the normalized probe
    /// correlation exceeds `threshold`. A perfectly clean,
    /// perfectly aligned signal scores 1.0; uncorrelated noise
    /// scores near `1/sqrt(probe_run)`. The scramble sequence
    /// correlated against itself at the wrong alignment can
    /// score as high as 0.46, so thresholds below 0.5 risk
    /// false sync on strong signals.
    pub fn with_sync_threshold(&mut self, threshold: f32) -> &mut Self {
        self.sync_threshold = f32::clamp(threshold, 0.0, 1.0);
        self
    }

    /// Probe symbols required to confirm sync
    ///
    /// After the correlator locates a frame, the modem checks
    /// that received probe symbols decode to their expected
    /// values. `count` consecutive matches promote the modem
    /// from [`Synced`](crate::ModemState::Synced) to
    /// [`Decoding`](crate::ModemState::Decoding).
    pub fn with_probes_to_confirm(&mut self, count: u32) -> &mut Self {
        self.probes_to_confirm = u32::max(count, 1);
        self
    }

    /// Consecutive probe mismatches before dropping sync
    ///
    /// Sustained probe mismatches indicate that the scrambler
    /// alignment is wrong or the signal is gone. After `count`
    /// consecutive mismatches the modem abandons the frame and
    /// returns to [`Acquiring`](crate::ModemState::Acquiring).
    pub fn with_probe_miss_limit(&mut self, count: u32) -> &mut Self {
        self.probe_miss_limit = u32::max(count, 1);
        self
    }

    /// Input sampling rate (Hz)
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Waveform operating mode
    pub fn mode(&self) -> WaveformMode {
        self.mode
    }

    /// AGC bandwidth (fraction of input rate)
    pub fn agc_bandwidth(&self) -> f32 {
        self.agc_bandwidth
    }

    /// Timing loop bandwidth (fraction of symbol rate)
    pub fn timing_bandwidth(&self) -> f32 {
        self.timing_bandwidth
    }

    /// Timing loop damping factor
    pub fn timing_damping(&self) -> f32 {
        self.timing_damping
    }

    /// Timing maximum deviation (fraction of symbol rate)
    pub fn timing_max_deviation(&self) -> f32 {
        self.timing_max_deviation
    }

    /// Acquisition correlation threshold
    pub fn sync_threshold(&self) -> f32 {
        self.sync_threshold
    }

    /// Probe symbols required to confirm sync
    pub fn probes_to_confirm(&self) -> u32 {
        self.probes_to_confirm
    }

    /// Consecutive probe mismatches before dropping sync
    pub fn probe_miss_limit(&self) -> u32 {
        self.probe_miss_limit
    }
}

impl std::default::Default for ModemBuilder {
    fn default() -> Self {
        Self::new(waveform::MIN_SAMPLE_RATE)
    }
}

/// Rejected modem configuration
///
/// Returned by [`ModemBuilder::build`] when the requested
/// configuration cannot produce a working modem. These are
/// programming errors: fix the configuration rather than
/// retrying.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Sampling rate below the supported minimum
    #[error(
        "input sampling rate {0} Hz is below the minimum of {min} Hz",
        min = waveform::MIN_SAMPLE_RATE
    )]
    SampleRate(u32),

    /// Timing loop bandwidth outside `(0, 1]`
    #[error("timing loop bandwidth {0} is not in (0, 1]")]
    LoopBandwidth(f32),

    /// Timing loop damping factor not positive
    #[error("timing loop damping factor {0} is not positive")]
    Damping(f32),

    /// Correlation threshold outside `(0, 1]`
    #[error("sync correlation threshold {0} is not in (0, 1]")]
    Threshold(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let modem = ModemBuilder::new(9600).build();
        assert!(modem.is_ok());

        let modem = ModemBuilder::default()
            .with_mode(WaveformMode::Bps1200Long)
            .with_agc_bandwidth(0.02)
            .build();
        assert!(modem.is_ok());
    }

    #[test]
    fn test_rejects_low_sample_rate() {
        match ModemBuilder::new(8000).build() {
            Err(ConfigError::SampleRate(8000)) => {}
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[test]
    fn test_rejects_degenerate_loops() {
        let mut builder = ModemBuilder::new(9600);
        builder.with_timing_bandwidth(0.0);
        assert_eq!(
            Err(ConfigError::LoopBandwidth(0.0)),
            builder.build().map(|_| ())
        );

        // NaN is not in (0, 1] either, and the reported value
        // names the actual offender
        let mut builder = ModemBuilder::new(9600);
        builder.with_timing_bandwidth(f32::NAN);
        match builder.build() {
            Err(ConfigError::LoopBandwidth(bw)) => assert!(bw.is_nan()),
            other => panic!("unexpected {:?}", other.err()),
        }

        let mut builder = ModemBuilder::new(9600);
        builder.with_timing_damping(0.0);
        assert_eq!(Err(ConfigError::Damping(0.0)), builder.build().map(|_| ()));

        let mut builder = ModemBuilder::new(9600);
        builder.with_sync_threshold(0.0);
        assert_eq!(
            Err(ConfigError::Threshold(0.0)),
            builder.build().map(|_| ())
        );
    }

    #[test]
    fn test_setters_clamp() {
        let mut builder = ModemBuilder::new(48000);
        builder
            .with_timing_bandwidth(7.0)
            .with_timing_max_deviation(3.0)
            .with_sync_threshold(7.0)
            .with_probes_to_confirm(0);

        assert_eq!(1.0, builder.timing_bandwidth());
        assert_eq!(0.5, builder.timing_max_deviation());
        assert_eq!(1.0, builder.sync_threshold());
        assert_eq!(1, builder.probes_to_confirm());

        builder.with_timing_bandwidth(-2.0);
        assert_eq!(0.0, builder.timing_bandwidth());
    }

    #[test]
    fn test_builder_compares() {
        let reference = ModemBuilder::new(9600);
        let mut other = ModemBuilder::new(9600);
        assert_eq!(reference, other);

        other.with_mode(WaveformMode::Bps1200Long);
        assert_ne!(reference, other);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            "input sampling rate 8000 Hz is below the minimum of 9600 Hz",
            format!("{}", ConfigError::SampleRate(8000))
        );
    }
}
