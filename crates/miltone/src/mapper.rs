//! Gray-coded PSK constellation mapping
//!
//! Channel symbols are phase-shift keyed: each tribit selects one of
//! eight (or, for QPSK modes, four) unit-magnitude points spaced
//! evenly around the unit circle. The tribit value on the channel is
//! the sum, modulo the constellation order, of the data tribit and the
//! whitening sequence tribit. A Gray-code permutation assigns tribit
//! values to angular positions so that the most likely demodulation
//! errors, those between angular neighbors, corrupt only one bit.
//!
//! Demodulation is nearest-point classification: correlate the
//! received point against every candidate and keep the best. The
//! correlation value doubles as a soft confidence for downstream
//! decoding stages.

use std::f32::consts::FRAC_1_SQRT_2;

use num_complex::Complex;

use crate::mode::Modulation;

// Constellation points, angle = position × 2π/N
const PSK8_POINTS: [Complex<f32>; 8] = [
    Complex::new(1.0, 0.0),
    Complex::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Complex::new(0.0, 1.0),
    Complex::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Complex::new(-1.0, 0.0),
    Complex::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    Complex::new(0.0, -1.0),
    Complex::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
];

const PSK4_POINTS: [Complex<f32>; 4] = [
    Complex::new(1.0, 0.0),
    Complex::new(0.0, 1.0),
    Complex::new(-1.0, 0.0),
    Complex::new(0.0, -1.0),
];

// Tribit value → angular position. Inverse of the binary-reflected
// Gray sequence, so walking the circle steps the tribit one bit at a
// time.
const GRAY8: [u8; 8] = [0, 1, 3, 2, 7, 6, 4, 5];
const GRAY4: [u8; 4] = [0, 1, 3, 2];

// Angular position → tribit value
const GRAY8_INVERSE: [u8; 8] = [0, 1, 3, 2, 6, 7, 5, 4];
const GRAY4_INVERSE: [u8; 4] = [0, 1, 3, 2];

/// A demodulated symbol decision with soft confidence
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftDecision {
    /// Decided data tribit, whitening already removed
    pub value: u8,

    /// Correlation against the winning constellation point
    ///
    /// Non-negative. Approaches 1.0 for a clean, unit-power symbol
    /// and drops toward zero as noise rotates the received point off
    /// its decision axis.
    pub confidence: f32,
}

/// Tribit to/from constellation point mapper
///
/// Stateless except for the chosen modulation. Whitening is the
/// caller's responsibility: `encode()` and `decode()` accept the
/// current whitening tribit as an argument so that transmitter and
/// receiver drive their own [`Scrambler`](crate::Scrambler) instances.
#[derive(Clone, Copy, Debug)]
pub struct Mapper {
    modulation: Modulation,
}

impl Mapper {
    /// New mapper for the given modulation
    pub fn new(modulation: Modulation) -> Self {
        Self { modulation }
    }

    /// Modulation in effect
    pub fn modulation(&self) -> Modulation {
        self.modulation
    }

    /// Constellation point for a channel tribit value
    ///
    /// The value is looked up through the Gray permutation to obtain
    /// an angular position. Values at or beyond the modulation order
    /// wrap around.
    pub fn point(&self, value: u8) -> Complex<f32> {
        match self.modulation {
            Modulation::Psk8 => PSK8_POINTS[GRAY8[(value & 0x7) as usize] as usize],
            Modulation::Psk4 => PSK4_POINTS[GRAY4[(value & 0x3) as usize] as usize],
        }
    }

    /// Map a data tribit to its transmitted constellation point
    ///
    /// The channel value is `(data + scramble) mod N` for modulation
    /// order `N`.
    pub fn encode(&self, data: u8, scramble: u8) -> Complex<f32> {
        let order = self.modulation.order();
        self.point((data % order + scramble % order) % order)
    }

    /// Decide the data tribit for a received constellation point
    ///
    /// Classifies the received point by maximum real-part correlation
    /// over all candidate channel values, then removes the whitening
    /// tribit. Exact correlation ties resolve to the lowest channel
    /// value.
    pub fn decode(&self, sample: Complex<f32>, scramble: u8) -> SoftDecision {
        let order = self.modulation.order();
        let mut best_value = 0u8;
        let mut best_corr = f32::MIN;
        for channel in 0..order {
            let corr = (sample * self.point(channel).conj()).re;
            if corr > best_corr {
                best_corr = corr;
                best_value = channel;
            }
        }
        SoftDecision {
            value: (best_value + order - scramble % order) % order,
            confidence: best_corr.max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_gray_inverse() {
        for value in 0..8usize {
            assert_eq!(value, GRAY8_INVERSE[GRAY8[value] as usize] as usize);
        }
        for value in 0..4usize {
            assert_eq!(value, GRAY4_INVERSE[GRAY4[value] as usize] as usize);
        }
    }

    #[test]
    fn test_points_unit_magnitude() {
        let mapper = Mapper::new(Modulation::Psk8);
        for value in 0..8 {
            assert_approx_eq!(1.0f32, mapper.point(value).norm(), 1.0e-6);
        }
    }

    #[test]
    fn test_adjacent_positions_differ_one_bit() {
        for position in 0..8usize {
            let here = GRAY8_INVERSE[position];
            let next = GRAY8_INVERSE[(position + 1) % 8];
            assert_eq!(
                1,
                (here ^ next).count_ones(),
                "positions {} and {}",
                position,
                (position + 1) % 8
            );
        }
    }

    #[test]
    fn test_roundtrip_all_tribits_all_whitening() {
        let mapper = Mapper::new(Modulation::Psk8);
        for data in 0..8 {
            for scramble in 0..8 {
                let point = mapper.encode(data, scramble);
                let decision = mapper.decode(point, scramble);
                assert_eq!(data, decision.value, "data {} scramble {}", data, scramble);
                assert_approx_eq!(1.0f32, decision.confidence, 1.0e-6);
            }
        }
    }

    #[test]
    fn test_roundtrip_qpsk() {
        let mapper = Mapper::new(Modulation::Psk4);
        for data in 0..4 {
            for scramble in 0..8 {
                let point = mapper.encode(data, scramble);
                let decision = mapper.decode(point, scramble);
                assert_eq!(data, decision.value, "data {} scramble {}", data, scramble);
            }
        }
    }

    #[test]
    fn test_whitened_sequence_recovers() {
        // transmitter and receiver each run their own whitening
        // generator in lock-step
        use crate::scrambler::Scrambler;

        const DATA: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7, 0, 1];

        let mapper = Mapper::new(Modulation::Psk8);
        let mut tx = Scrambler::new();
        let mut rx = Scrambler::new();
        for &data in DATA {
            let point = mapper.encode(data, tx.next_tribit());
            let decision = mapper.decode(point, rx.next_tribit());
            assert_eq!(data, decision.value);
        }
    }

    #[test]
    fn test_decode_tie_selects_lowest() {
        // the origin correlates identically (zero) with every point
        let mapper = Mapper::new(Modulation::Psk8);
        let decision = mapper.decode(Complex::new(0.0, 0.0), 0);
        assert_eq!(0, decision.value);
        assert_approx_eq!(0.0f32, decision.confidence);
    }

    #[test]
    fn test_decode_noisy_point() {
        let mapper = Mapper::new(Modulation::Psk8);
        // halfway into the decision region of channel value 3, low power
        let clean = mapper.point(3);
        let noisy = Complex::new(0.6 * clean.re + 0.05, 0.6 * clean.im - 0.02);
        let decision = mapper.decode(noisy, 0);
        assert_eq!(3, decision.value);
        assert!(decision.confidence > 0.0);
        assert!(decision.confidence < 1.0);
    }
}
