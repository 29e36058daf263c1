//! Symbol timing recovery
//!
//! A timing loop for symbol timing recovery. The Timing Error
//! Detector (TED) uses the Gardner method, which does not require
//! a carrier phase estimate. The timing loop is based on GNU
//! Radio's
//! [symbol_sync_cc](https://www.gnuradio.org/doc/doxygen/classgr_1_1digital_1_1symbol__sync__cc.html)
//! block, which uses a proportional integrate (PI) filter to
//! estimate the average and instantaneous symbol clock periods.
//!
//! From the available stream of baseband samples, the
//! [`TimingLoop`] takes two strobes for every symbol: one at the
//! estimated symbol center and one at the midpoint between
//! centers. When the clock is aligned, the midpoint strobe falls
//! on the transition between symbols and the Gardner metric is
//! zero.
//!
//! ```txt
//! Filtered symbol stream x[n]
//!  /\
//!   |     1Ts
//!   |.....x
//!   |      .
//!   |       .
//!   |        .
//!   |         .
//! --|----------x----------> time (Ts)
//!   |           .       .
//!   |            .     .
//!   |             .   .
//!   |              . .
//!   |               x
//!   |               2Ts
//! ```
//!
//! The serial-tone waveform may arrive with as few as four
//! samples per symbol, so strobes rarely coincide with real
//! samples. The `TimingLoop` maintains a fractional sample clock
//! and interpolates each strobe from the four most recent
//! samples with a cubic Lagrange polynomial.
//!
//! For best performance, the inputs to the timing loop should
//! be normalized to a signal value in `±1.0`.

use arraydeque::ArrayDeque;
use num_complex::Complex;

/// Symbol clock tracking loop
///
/// The clock tracking loop is a Proportional Integrate (PI)
/// filter which tracks both the average and instantaneous
/// half-symbol period. The clock phase is normally handed in
/// with [`preset()`](TimingLoop::preset), so the loop only has
/// to track residual drift.
#[derive(Clone, Debug)]
pub struct TimingLoop {
    // half-symbol period at the nominal clock rate, in samples
    half_nominal: f32,

    // minimum permitted half_avg (fastest permitted symbol clock)
    half_min: f32,

    // maximum permitted half_avg (slowest permitted symbol clock)
    half_max: f32,

    // proportional gain of the PI filter
    loop_alpha: f32,

    // integral gain of the PI filter
    loop_beta: f32,

    // average half-symbol period estimate
    half_avg: f32,

    // instantaneous half-symbol period
    half_inst: f32,

    // samples remaining until the next strobe
    clock: f32,

    // true if the next strobe is a midpoint strobe
    midpoint: bool,

    // most recent input samples, newest last
    history: ArrayDeque<Complex<f32>, 4, arraydeque::Wrapping>,

    // strobe value at the last midpoint
    midpoint_sample: Complex<f32>,

    // strobe value at the last symbol center
    prev_symbol: Complex<f32>,
}

impl TimingLoop {
    /// New timing loop
    ///
    /// Creates a new timing loop which expects `samples_per_symbol`
    /// *input* samples per symbol, on average, with a maximum clock
    /// deviation of `max_deviation` symbol periods.
    ///
    /// The tracking loop smooths error estimates with a proportional
    /// integrate (PI) filter with damping factor `damping` and a
    /// bandwidth of `loop_bandwidth`, expressed as a fraction of
    /// the symbol rate.
    pub fn new(
        samples_per_symbol: f32,
        loop_bandwidth: f32,
        damping: f32,
        max_deviation: f32,
    ) -> Self {
        let half_nominal = samples_per_symbol / 2.0;
        let deviation = half_nominal * f32::clamp(max_deviation, 0.0, 0.5);
        let (loop_alpha, loop_beta) = compute_loop_alphabeta(loop_bandwidth, damping);

        let mut out = Self {
            half_nominal,
            half_min: half_nominal - deviation,
            half_max: half_nominal + deviation,
            loop_alpha,
            loop_beta,
            half_avg: half_nominal,
            half_inst: half_nominal,
            clock: half_nominal,
            midpoint: true,
            history: ArrayDeque::default(),
            midpoint_sample: Complex::default(),
            prev_symbol: Complex::default(),
        };
        out.reset();
        out
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.history.clear();
        for _i in 0..self.history.capacity() {
            let _ = self.history.push_back(Complex::default());
        }
        self.half_avg = self.half_nominal;
        self.half_inst = self.half_nominal;
        self.clock = self.half_nominal;
        self.midpoint = true;
        self.midpoint_sample = Complex::default();
        self.prev_symbol = Complex::default();
    }

    /// Reset and schedule the first strobe
    ///
    /// Resets the loop and places the first symbol-center strobe
    /// `delay` input samples in the future. Use this to hand the
    /// loop a clock phase obtained externally, such as from a
    /// correlation peak. A `delay` of `n` strobes on the `n`th
    /// sample pushed after this call, counting from one.
    pub fn preset(&mut self, delay: f32) {
        self.reset();
        self.clock = delay;
        self.midpoint = false;
    }

    /// Process one input sample
    ///
    /// Accepts the next filtered baseband `sample`. Returns the
    /// interpolated symbol estimate if this sample completed a
    /// symbol interval, or `None` otherwise. Symbol estimates are
    /// produced at the recovered symbol rate: about one for every
    /// `samples_per_symbol` inputs.
    pub fn input(&mut self, sample: Complex<f32>) -> Option<Complex<f32>> {
        self.history.push_back(sample);
        self.clock -= 1.0;
        if self.clock > -1.0 {
            return None;
        }

        // the strobe time falls between history[1] and history[2]
        let mu = f32::clamp(self.clock + 2.0, 0.0, 1.0);
        let val = interpolate(&self.history, mu);

        if self.midpoint {
            self.midpoint_sample = val;
            self.midpoint = false;
            self.clock += self.half_inst;
            return None;
        }

        let err = f32::clamp(
            gardner_metric(self.prev_symbol, self.midpoint_sample, val),
            -1.0f32,
            1.0f32,
        );

        // integral arm
        self.half_avg = f32::clamp(
            self.half_avg + self.loop_beta * err,
            self.half_min,
            self.half_max,
        );

        // proportional arm
        // we can't go back in time; we must go forward instead
        self.half_inst = self.half_avg + self.loop_alpha * err;
        if self.half_inst < 0.0f32 {
            self.half_inst = self.half_avg;
        }

        self.prev_symbol = val;
        self.midpoint = true;
        self.clock += self.half_inst;
        Some(val)
    }
}

// Interpolate between history[1] and history[2]
//
// h[0..4] are evenly-spaced samples, newest last. Evaluates the
// cubic Lagrange polynomial through all four at `0 <= t <= 1`
// symbol-clock positions past h[1]. t = 0 reproduces h[1]
// exactly; t = 1 reproduces h[2].
#[inline]
fn interpolate<A>(h: &A, t: f32) -> Complex<f32>
where
    A: std::ops::Index<usize, Output = Complex<f32>> + ?Sized,
{
    let c0 = -t * (t - 1.0) * (t - 2.0) / 6.0;
    let c1 = (t + 1.0) * (t - 1.0) * (t - 2.0) / 2.0;
    let c2 = -t * (t + 1.0) * (t - 2.0) / 2.0;
    let c3 = t * (t + 1.0) * (t - 1.0) / 6.0;
    h[0] * c0 + h[1] * c1 + h[2] * c2 + h[3] * c3
}

// Compute the Gardner metric for one symbol interval
//
// `prev` is the previous symbol-center strobe
// `mid` is the midpoint strobe between the two centers
// `cur` is the most-recent symbol-center strobe
//
// output is the timing error estimate:
//
// `err < 0` → strobes late, the clock period must shrink
// `err > 0` → strobes early, the clock period must grow
//
// the metric needs no phase reference and no decisions, so it
// works before the scrambler alignment is known
#[inline]
fn gardner_metric(prev: Complex<f32>, mid: Complex<f32>, cur: Complex<f32>) -> f32 {
    ((prev - cur) * mid.conj()).re
}

// Compute PI alpha and beta
//
// Computes loop `(alpha, beta)` given the `loop_bandwidth` as a
// fraction of the symbol rate and the damping factor `zeta`.
// Uses the standard second-order loop design from the gnuradio
// symbol_sync blocks.
fn compute_loop_alphabeta(loop_bandwidth: f32, zeta: f32) -> (f32, f32) {
    let omega_n_norm = 2.0f32 * std::f32::consts::PI * loop_bandwidth;
    let denom = 1.0f32 + 2.0f32 * zeta * omega_n_norm + omega_n_norm * omega_n_norm;
    let alpha = 4.0f32 * zeta * omega_n_norm / denom;
    let beta = 4.0f32 * omega_n_norm * omega_n_norm / denom;
    (alpha, beta)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f32::consts::FRAC_1_SQRT_2;

    use assert_approx_eq::assert_approx_eq;

    // generate single period of a sinusoid
    fn gen_sinusoid(period: usize) -> Vec<Complex<f32>> {
        let twopi = 2.0f32 * std::f32::consts::PI;
        (0..period)
            .map(|n| Complex::new(f32::sin(twopi * (n as f32) / (period as f32)), 0.0))
            .collect()
    }

    // feed the circular inp vector for nsamples, return last estimate
    fn timing_test(
        timing: &mut TimingLoop,
        inp: &[Complex<f32>],
        start_sample: usize,
        nsamples: usize,
    ) -> Complex<f32> {
        let mut last_sym = Complex::default();
        for i in 0..nsamples {
            if let Some(sym) = timing.input(inp[(start_sample + i) % inp.len()]) {
                last_sym = sym;
            }
        }
        last_sym
    }

    #[test]
    fn test_compute_loop_alphabeta() {
        let (alpha, beta) = compute_loop_alphabeta(0.0f32, FRAC_1_SQRT_2);
        assert_approx_eq!(alpha, 0.0f32);
        assert_approx_eq!(beta, 0.0f32);

        let (alpha, beta) = compute_loop_alphabeta(0.05f32, FRAC_1_SQRT_2);
        assert_approx_eq!(alpha, 0.575882f32, 1.0e-4);
        assert_approx_eq!(beta, 0.255858f32, 1.0e-4);

        let (alpha, beta) = compute_loop_alphabeta(0.01f32, FRAC_1_SQRT_2);
        assert_approx_eq!(alpha, 0.162623f32, 1.0e-4);
        assert_approx_eq!(beta, 0.014450f32, 1.0e-4);

        let (alpha, beta) = compute_loop_alphabeta(0.10f32, FRAC_1_SQRT_2);
        assert_approx_eq!(alpha, 0.778306f32, 1.0e-4);
        assert_approx_eq!(beta, 0.691584f32, 1.0e-4);
    }

    #[test]
    fn test_gardner_metric() {
        let re = |x: f32| Complex::new(x, 0.0);

        // midpoint on the transition zero: no error
        assert_approx_eq!(0.0f32, gardner_metric(re(1.0), re(0.0), re(-1.0)));

        // constant symbols carry no timing information
        assert_approx_eq!(0.0f32, gardner_metric(re(1.0), re(1.0), re(1.0)));

        // midpoint sampled after the crossing: late
        assert_approx_eq!(-0.36f32, gardner_metric(re(1.0), re(-0.2), re(-0.8)));

        // midpoint sampled before the crossing: early
        assert_approx_eq!(0.36f32, gardner_metric(re(1.0), re(0.2), re(-0.8)));

        // phase rotation does not bias the metric
        let rot = Complex::from_polar(1.0f32, 0.7f32);
        assert_approx_eq!(
            -0.36f32,
            gardner_metric(re(1.0) * rot, re(-0.2) * rot, re(-0.8) * rot),
            1.0e-6
        );
    }

    #[test]
    fn test_interpolate_endpoints() {
        let h = [
            Complex::new(3.0f32, -1.0),
            Complex::new(5.0f32, 2.0),
            Complex::new(-7.0f32, 4.0),
            Complex::new(1.0f32, 1.0),
        ];
        let at0 = interpolate(h.as_slice(), 0.0);
        assert_approx_eq!(h[1].re, at0.re);
        assert_approx_eq!(h[1].im, at0.im);

        let at1 = interpolate(h.as_slice(), 1.0);
        assert_approx_eq!(h[2].re, at1.re);
        assert_approx_eq!(h[2].im, at1.im);
    }

    #[test]
    fn test_preset_places_strobe() {
        let mut timing = TimingLoop::new(4.0f32, 0.05, FRAC_1_SQRT_2, 0.03);
        timing.preset(6.0f32);

        // a ramp makes the strobe position visible in its value
        let mut first = None;
        for i in 0..30 {
            if let Some(sym) = timing.input(Complex::new(i as f32, 0.0)) {
                first = Some((i, sym));
                break;
            }
        }
        let (at, sym) = first.unwrap();
        assert_eq!(6, at);
        assert_approx_eq!(5.0f32, sym.re);
        assert_approx_eq!(0.0f32, sym.im);
    }

    #[test]
    fn test_timing_loop_bestcase() {
        const SAMPLES_PER_SYMBOL: usize = 32;

        // generate one period of a sinusoid
        //   * symbol value +1 at inp[16]
        //   * symbol value -1 at inp[48]
        //   * inp is periodic
        //
        // Here we use a sinusoid to mimic the output of the
        // receive filter. In reality, the filter output does not
        // look particularly sinusoidal, but this is a convenient
        // periodic function we can use.
        let inp = gen_sinusoid(2 * SAMPLES_PER_SYMBOL);
        assert_eq!(2 * SAMPLES_PER_SYMBOL, inp.len());
        assert_approx_eq!(0.0f32, inp[0].re);
        assert_approx_eq!(1.0f32, inp[16].re);
        assert_approx_eq!(-1.0f32, inp[48].re);

        let mut timing = TimingLoop::new(SAMPLES_PER_SYMBOL as f32, 0.05, FRAC_1_SQRT_2, 0.125);

        // best-case timing error: we are synchronized to start with
        let last_sym = timing_test(&mut timing, &inp, 16, 16384);
        assert!(last_sym.norm() > 0.99);
        assert_approx_eq!(timing.half_avg, 16.0f32, 0.05);
    }

    #[test]
    fn test_timing_loop_nearworst() {
        const SAMPLES_PER_SYMBOL: usize = 32;

        let inp = gen_sinusoid(2 * SAMPLES_PER_SYMBOL);

        let mut timing = TimingLoop::new(SAMPLES_PER_SYMBOL as f32, 0.05, FRAC_1_SQRT_2, 0.125);

        // off by almost half a symbol to start with
        let last_sym = timing_test(&mut timing, &inp, 15, 16384);
        assert!(last_sym.norm() > 0.99);
        assert_approx_eq!(timing.half_avg, 16.0f32, 0.05);
    }

    #[test]
    fn test_timing_loop_worstcase() {
        const SAMPLES_PER_SYMBOL: usize = 32;

        let inp = gen_sinusoid(2 * SAMPLES_PER_SYMBOL);

        let mut timing = TimingLoop::new(SAMPLES_PER_SYMBOL as f32, 0.05, FRAC_1_SQRT_2, 0.125);

        // worst-case timing error: strobes start on the transitions
        let last_sym = timing_test(&mut timing, &inp, 0, 16384);
        assert!(last_sym.norm() > 0.99);
        assert_approx_eq!(timing.half_avg, 16.0f32, 0.05);
    }

    #[test]
    fn test_timing_loop_narrow_bandwidth() {
        const SAMPLES_PER_SYMBOL: usize = 32;

        let inp = gen_sinusoid(2 * SAMPLES_PER_SYMBOL);

        // the modem runs this loop narrow, trusting the preset
        // for coarse alignment. A narrow loop must still pull in
        // a residual misalignment of a few samples.
        let mut timing = TimingLoop::new(SAMPLES_PER_SYMBOL as f32, 0.01, FRAC_1_SQRT_2, 0.125);

        let last_sym = timing_test(&mut timing, &inp, 13, 16384);
        assert!(last_sym.norm() > 0.99);
        assert_approx_eq!(timing.half_avg, 16.0f32, 0.05);
    }
}
