//! FIR filtering primitives
//!
//! [`FilterCoeff`] holds an impulse response and performs the
//! multiply-accumulate of an FIR filter against a caller-provided
//! sample history. [`Window`] is the matching fixed-length history:
//! new samples shift onto the end, old samples age off the front, and
//! the whole history is always available as a contiguous slice.
//!
//! To filter a stream, create both with the same length, `push()` each
//! input sample onto the `Window`, and call
//! [`FilterCoeff::filter()`] with the window contents to produce each
//! output sample. The slice convention throughout is oldest sample
//! first, newest sample last.

use std::convert::AsRef;

use nalgebra::base::Scalar;
use nalgebra::DVector;
use num_traits::Zero;
use slice_ring_buffer::SliceRingBuffer;

/// FIR filter coefficients
///
/// Coefficients are stored reversed so that the multiply-accumulate
/// can zip directly against an oldest-first sample history.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoeff<T>(DVector<T>)
where
    T: Copy + Scalar + Zero;

impl<T> FilterCoeff<T>
where
    T: Copy + Scalar + Zero,
{
    /// Create from an impulse response
    ///
    /// `h[0]` is the coefficient applied to the newest input sample.
    pub fn from_slice<S>(h: S) -> Self
    where
        S: AsRef<[T]>,
    {
        let inp = h.as_ref();
        FilterCoeff(DVector::from_iterator(
            inp.len(),
            inp.iter().rev().copied(),
        ))
    }

    /// Number of filter coefficients
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Compute one output sample for the given history
    ///
    /// `history[N-1]` must be the most recent input sample. If the
    /// history is shorter than the filter, the missing oldest samples
    /// are taken as zero; if longer, the excess is ignored.
    pub fn filter<I, In, Out>(&self, history: I) -> Out
    where
        I: AsRef<[In]>,
        In: Copy + Scalar + std::ops::Mul<T, Output = Out>,
        Out: Copy + Scalar + Zero + std::ops::AddAssign,
    {
        multiply_accumulate(history.as_ref(), self.0.as_slice())
    }
}

impl<T> AsRef<[T]> for FilterCoeff<T>
where
    T: Copy + Scalar + Zero,
{
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.0.as_slice()
    }
}

/// Fixed-length sliding sample history
#[derive(Clone, Debug)]
pub struct Window<T>(SliceRingBuffer<T>)
where
    T: Copy + Scalar + Zero;

impl<T> Window<T>
where
    T: Copy + Scalar + Zero,
{
    /// Create a window of the given length, filled with zeros
    pub fn new(len: usize) -> Self {
        let mut out = Self(SliceRingBuffer::with_capacity(len));
        for _i in 0..len {
            out.0.push_front(T::zero());
        }
        out
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        let len = self.0.len();
        self.0.clear();
        for _i in 0..len {
            self.0.push_front(T::zero());
        }
    }

    /// Window length
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Shift new samples onto the end of the window
    ///
    /// The last sample of `input` becomes the last sample of the
    /// window. An equal number of samples age off the front. If
    /// `input` is longer than the window, only its tail is kept.
    pub fn push<S>(&mut self, input: S)
    where
        S: AsRef<[T]>,
    {
        let input = input.as_ref();
        let input = if input.len() > self.0.len() {
            &input[input.len() - self.0.len()..]
        } else {
            input
        };

        std::mem::drop(self.0.drain(0..input.len()));
        self.0.extend_from_slice(input);
    }

    /// Current window contents, oldest sample first
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.0.as_slice()
    }
}

impl<T> AsRef<[T]> for Window<T>
where
    T: Copy + Scalar + Zero,
{
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

// Sum of the element-wise product of history and reversed
// coefficients. history[N-1] is the newest sample; rev_coeff[N-1] is
// the zeroth filter coefficient. Slices of unequal length are aligned
// at their ends.
fn multiply_accumulate<In, Coeff, Out>(history: &[In], rev_coeff: &[Coeff]) -> Out
where
    In: Copy + Scalar + std::ops::Mul<Coeff, Output = Out>,
    Coeff: Copy + Scalar,
    Out: Copy + Scalar + Zero + std::ops::AddAssign,
{
    let mul_len = usize::min(history.len(), rev_coeff.len());
    let history = &history[history.len() - mul_len..];
    let rev_coeff = &rev_coeff[rev_coeff.len() - mul_len..];

    let mut out = Out::zero();
    for (hi, co) in history.iter().zip(rev_coeff.iter()) {
        out += *hi * *co;
    }
    out
}
