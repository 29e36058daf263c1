//! Serial-tone waveform parameters
//!
//! The serial-tone waveform transmits phase-shift keyed symbols on a
//! single audio-frequency carrier. The symbol rate is constant across
//! all operating modes; modes differ only in constellation order and
//! frame layout. See [`crate::WaveformMode`].

/// Audio carrier frequency (Hz)
pub const CARRIER_HZ: f32 = 1800.0;

/// Symbol rate (Hz)
///
/// All operating modes transmit at this symbol rate. User bit rates
/// vary with constellation order and frame overhead instead.
pub const SYMBOL_RATE_HZ: f32 = 2400.0;

/// Minimum supported input sampling rate (Hz)
///
/// Below four samples per symbol, the fractional interpolator in the
/// timing loop no longer has enough history to place a strobe between
/// two real samples.
pub const MIN_SAMPLE_RATE: u32 = 9600;

/// Full-scale value of an `i16` PCM sample
pub(crate) const PCM_FULL_SCALE: f32 = 32768.0;

/// Symbol period at the given sampling rate, in fractional samples
pub fn samples_per_symbol(fs: u32) -> f32 {
    fs as f32 / SYMBOL_RATE_HZ
}

/// Generate receive filter taps
///
/// Returns the taps of a unity-gain low-pass FIR for the baseband
/// symbol stream at the sampling rate `fs`. The filter passes the
/// symbol spectrum and rejects the double-carrier mixing image, which
/// would otherwise perturb each symbol's phase by several degrees.
///
/// The taps are symmetric. The group delay is `(len - 1) / 2` samples.
pub fn receive_filter(fs: u32) -> Vec<f32> {
    let half = f32::floor(1.5 * samples_per_symbol(fs)) as usize;
    let cutoff = 0.9f32 * SYMBOL_RATE_HZ / fs as f32;
    windowed_sinc(2 * half + 1, cutoff)
}

// Generate windowed-sinc low-pass taps
//
// `cutoff` is the -6 dB frequency as a fraction of the sampling
// rate. The taps are Hamming-windowed and normalized to unity gain
// at DC. `points` must be odd so that the taps are symmetric about
// a center tap.
fn windowed_sinc(points: usize, cutoff: f32) -> Vec<f32> {
    use std::f32::consts::PI;

    let mid = (points - 1) as f32 / 2.0;
    let mut out: Vec<f32> = (0..points)
        .map(|i| {
            let x = i as f32 - mid;
            let sinc = if x == 0.0 {
                2.0 * cutoff
            } else {
                f32::sin(2.0 * PI * cutoff * x) / (PI * x)
            };
            let window = 0.54 - 0.46 * f32::cos(2.0 * PI * i as f32 / (points - 1) as f32);
            sinc * window
        })
        .collect();
    let gain: f32 = out.iter().sum();
    for tap in &mut out {
        *tap /= gain;
    }
    out
}
