//! Carrier generation and mixing
//!
//! The serial-tone waveform rides on a single audio-frequency carrier.
//! [`Nco`] is a phase-continuous oscillator used by the transmitter to
//! place baseband symbols on the carrier and by the receiver to mix
//! the passband back down to complex baseband. Mixing down leaves an
//! image at twice the carrier frequency; the receive lowpass
//! suppresses it.

use num_complex::Complex;

/// Numerically-controlled carrier oscillator
#[derive(Clone, Debug)]
pub struct Nco {
    phase: f32,
    increment: f32,
}

impl Nco {
    /// New oscillator
    ///
    /// `freq_hz` must be below the Nyquist frequency of `sample_rate`.
    pub fn new(freq_hz: f32, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            increment: 2.0 * std::f32::consts::PI * freq_hz / (sample_rate as f32),
        }
    }

    /// Current carrier phasor, advancing one sample time
    pub fn step(&mut self) -> Complex<f32> {
        let (sin, cos) = self.phase.sin_cos();
        self.phase += self.increment;
        if self.phase >= 2.0 * std::f32::consts::PI {
            self.phase -= 2.0 * std::f32::consts::PI;
        }
        Complex::new(cos, sin)
    }

    /// Mix a passband sample down to complex baseband
    pub fn mix_down(&mut self, sample: f32) -> Complex<f32> {
        self.step().conj() * sample
    }

    /// Mix a baseband symbol sample up to the passband
    pub fn mix_up(&mut self, sample: Complex<f32>) -> f32 {
        (sample * self.step()).re
    }

    /// Reset to zero phase
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_unit_magnitude_and_bounded_phase() {
        let mut nco = Nco::new(1800.0, 9600);
        for _ in 0..50000 {
            let phasor = nco.step();
            assert_approx_eq!(1.0f32, phasor.norm(), 1.0e-3);
        }
        assert!(nco.phase >= 0.0);
        assert!(nco.phase < 2.0 * std::f32::consts::PI);
    }

    #[test]
    fn test_carrier_period() {
        // 1800 Hz at 9600 Hz sampling repeats every 16 samples
        let mut nco = Nco::new(1800.0, 9600);
        let first: Vec<Complex<f32>> = (0..16).map(|_| nco.step()).collect();
        for n in 0..16 {
            let again = nco.step();
            assert_approx_eq!(first[n].re, again.re, 1.0e-4);
            assert_approx_eq!(first[n].im, again.im, 1.0e-4);
        }
    }

    #[test]
    fn test_mix_roundtrip_recovers_symbol() {
        // mix a constant symbol up and back down; after averaging out
        // the double-frequency image, the baseband symbol remains at
        // half amplitude
        let symbol = Complex::new(0.6, -0.3);
        let mut up = Nco::new(1800.0, 9600);
        let mut down = Nco::new(1800.0, 9600);

        // 16 samples is one full carrier cycle, which nulls the image
        let mut acc = Complex::new(0.0f32, 0.0);
        for _ in 0..16 {
            let passband = up.mix_up(symbol);
            acc += down.mix_down(passband);
        }
        acc /= 16.0;

        assert_approx_eq!(0.5 * symbol.re, acc.re, 1.0e-3);
        assert_approx_eq!(0.5 * symbol.im, acc.im, 1.0e-3);
    }

    #[test]
    fn test_reset() {
        let mut nco = Nco::new(1800.0, 9600);
        let first = nco.step();
        for _ in 0..7 {
            nco.step();
        }
        nco.reset();
        let again = nco.step();
        assert_approx_eq!(first.re, again.re);
        assert_approx_eq!(first.im, again.im);
    }
}
