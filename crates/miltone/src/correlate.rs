//! Probe sequence correlation
//!
//! The [`ProbeCorrelator`] searches a window of filtered
//! baseband samples for the first probe run of a superframe.
//! Probe symbols carry no data, so their transmitted phases are
//! exactly the scramble sequence and are known in advance. A
//! normalized cross-correlation against this known sequence
//! locates the superframe boundary to within one sample and
//! yields a confidence score that is independent of both signal
//! level and carrier phase. The argument of the complex peak is
//! the carrier phase itself, which the receiver must remove
//! before symbol decisions mean anything.
//!
//! The correlator is sized so that a window of
//! [`window_len()`](ProbeCorrelator::window_len) samples always
//! contains one complete superframe start, no matter how the
//! transmission is aligned to the window. Sweeping every
//! [`hop()`](ProbeCorrelator::hop) samples therefore cannot miss
//! a transmission, at the cost of a detection latency of up to
//! two superframes.

use num_complex::Complex;

use crate::mapper::Mapper;
use crate::mode::WaveformMode;
use crate::scrambler::Scrambler;

/// Best correlation found in one sweep
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SyncCandidate {
    /// Offset of the probe-run start within the window, in samples
    pub offset: usize,

    /// Normalized correlation magnitude, `0.0 ..= 1.0`
    ///
    /// A perfectly clean, perfectly aligned probe run scores
    /// `1.0`. Uncorrelated noise scores near
    /// `1 / sqrt(probe_run)`.
    pub confidence: f32,

    /// Unit phasor of the correlation peak
    ///
    /// The received probe run is the known template rotated by
    /// whatever carrier phase the transmission arrived with.
    /// Multiplying recovered symbols by the conjugate of this
    /// phasor removes that rotation.
    pub phase: Complex<f32>,
}

/// Known-sequence correlator for superframe alignment
#[derive(Clone, Debug)]
pub(crate) struct ProbeCorrelator {
    // expected probe symbols, one per probe position
    template: Vec<Complex<f32>>,

    // sample offset of each probe symbol, relative to the first
    nodes: Vec<usize>,

    // sum of squared template magnitudes
    template_energy: f32,

    // samples between sweeps: one superframe
    hop: usize,

    // samples of history a sweep requires
    window_len: usize,
}

impl ProbeCorrelator {
    /// Create correlator
    ///
    /// Builds the expected-symbol template for the first probe
    /// run of `mode` at a rate of `samples_per_symbol` input
    /// samples per symbol.
    pub fn new(mode: WaveformMode, samples_per_symbol: f32) -> Self {
        let mapper = Mapper::new(mode.modulation());
        let layout = mode.layout();

        let template: Vec<Complex<f32>> = layout
            .first_probe_run()
            .map(|position| mapper.encode(0, Scrambler::sequence_tribit(position)))
            .collect();
        let nodes: Vec<usize> = (0..template.len())
            .map(|k| (k as f32 * samples_per_symbol).round() as usize)
            .collect();
        let template_energy = template.iter().map(|tap| tap.norm_sqr()).sum();

        let span = nodes.last().map(|last| last + 1).unwrap_or(0);
        let hop = (layout.superframe_len() as f32 * samples_per_symbol).round() as usize;

        Self {
            template,
            nodes,
            template_energy,
            hop,
            window_len: hop + span,
        }
    }

    /// Number of samples between sweeps
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Required search window length, in samples
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Search a window for the probe sequence
    ///
    /// `window` must be at least
    /// [`window_len()`](ProbeCorrelator::window_len) samples
    /// long, oldest sample first. Every candidate offset within
    /// one superframe is scored, and the best is returned along
    /// with the carrier phase measured at its offset. The caller
    /// decides whether the confidence clears its detection
    /// threshold.
    pub fn sweep(&self, window: &[Complex<f32>]) -> SyncCandidate {
        let mut best = SyncCandidate {
            offset: 0,
            confidence: -1.0,
            phase: Complex::new(1.0, 0.0),
        };

        for offset in 0..self.hop {
            let mut acc = Complex::<f32>::default();
            let mut energy = 0.0f32;
            for (node, tap) in self.nodes.iter().zip(self.template.iter()) {
                let sample = window[offset + node];
                acc += sample * tap.conj();
                energy += sample.norm_sqr();
            }

            let confidence =
                acc.norm() / f32::max(f32::sqrt(energy * self.template_energy), 1.0e-12);
            if confidence > best.confidence {
                best = SyncCandidate {
                    offset,
                    confidence,
                    phase: Complex::from_polar(1.0, acc.arg()),
                };
            }
        }

        best
    }
}
