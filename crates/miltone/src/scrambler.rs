//! Data sequence randomizing generator
//!
//! Transmitted tribits are summed modulo-8 with a pseudo-random
//! whitening sequence before constellation mapping, and the receiver
//! removes the same sequence after symbol decisions. Both ends run an
//! identical 12-bit shift register generator in lock-step, one tribit
//! per channel symbol. Any divergence between the two registers is a
//! protocol failure, so every parameter of the generator is a literal
//! constant here rather than configuration.
//!
//! The register is clocked eight times per generated tribit. On each
//! clock, the outgoing high bit feeds back into the low end of the
//! register and into three fixed tap positions. After 160 tribits the
//! register is reloaded with its initial fill, making the sequence
//! exactly periodic. Frame layouts are sized so that superframe
//! boundaries coincide with sequence reloads.

use lazy_static::lazy_static;

/// Initial register fill
///
/// Loaded at construction, on [`reset()`](Scrambler::reset), and again
/// after every [`SCRAMBLE_PERIOD`] generated tribits.
const REGISTER_INIT: u16 = 0xBAD;

/// Feedback tap mask for the polynomial x¹² + x⁶ + x⁴ + x + 1
///
/// When the outgoing carry bit is set, these register positions are
/// toggled. Bit 0 reinserts the carry; bits 1, 4, and 6 are the taps.
const FEEDBACK_TAPS: u16 = 0x053;

/// Register width mask
const REGISTER_MASK: u16 = 0x0FFF;

/// Register clocks per generated tribit
const CLOCKS_PER_TRIBIT: u32 = 8;

/// Whitening sequence period, in tribits
pub const SCRAMBLE_PERIOD: usize = 160;

lazy_static! {
    // One full period of the whitening sequence. The generator output
    // is a pure function of tribit index modulo SCRAMBLE_PERIOD, so
    // layout and correlator code may consult this table instead of
    // stepping a register of their own.
    static ref SEQUENCE: [u8; SCRAMBLE_PERIOD] = {
        let mut scrambler = Scrambler::new();
        let mut out = [0u8; SCRAMBLE_PERIOD];
        for tribit in out.iter_mut() {
            *tribit = scrambler.next_tribit();
        }
        out
    };
}

/// Whitening sequence generator
///
/// Produces the repeating tribit sequence that whitens transmitted
/// symbols. Create one per transmit or receive chain; the register is
/// owned state, never shared.
///
/// ```
/// use miltone::Scrambler;
///
/// let mut scrambler = Scrambler::new();
/// let first: Vec<u8> = (0..3).map(|_| scrambler.next_tribit()).collect();
/// assert_eq!(&[4, 2, 5], first.as_slice());
///
/// scrambler.reset();
/// assert_eq!(4, scrambler.next_tribit());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scrambler {
    register: u16,
    count: usize,
}

impl Scrambler {
    /// New generator, loaded with the initial fill
    pub fn new() -> Self {
        Self {
            register: REGISTER_INIT,
            count: 0,
        }
    }

    /// New generator, advanced to the given sequence position
    ///
    /// The returned generator's next output is the tribit at
    /// `position` (modulo the sequence period). The receiver uses this
    /// to join the sequence mid-stream once acquisition has located
    /// the frame start.
    pub fn with_position(position: usize) -> Self {
        let mut out = Self::new();
        for _ in 0..(position % SCRAMBLE_PERIOD) {
            out.next_tribit();
        }
        out
    }

    /// Reset to the initial fill
    pub fn reset(&mut self) {
        self.register = REGISTER_INIT;
        self.count = 0;
    }

    /// Generate the next tribit
    ///
    /// Advances the register by eight shift-and-feedback clocks and
    /// returns the value of the top three register bits.
    pub fn next_tribit(&mut self) -> u8 {
        if self.count == SCRAMBLE_PERIOD {
            self.reset();
        }
        for _ in 0..CLOCKS_PER_TRIBIT {
            let carry = (self.register >> 11) & 1;
            self.register = (self.register << 1) & REGISTER_MASK;
            if carry != 0 {
                self.register ^= FEEDBACK_TAPS;
            }
        }
        self.count += 1;
        ((self.register >> 9) & 0x7) as u8
    }

    /// Sequence position of the next output tribit
    pub fn position(&self) -> usize {
        self.count % SCRAMBLE_PERIOD
    }

    /// Whitening sequence tribit at an arbitrary position
    ///
    /// Position is taken modulo the sequence period. Equivalent to
    /// `Scrambler::with_position(position).next_tribit()` without the
    /// register stepping.
    pub fn sequence_tribit(position: usize) -> u8 {
        SEQUENCE[position % SCRAMBLE_PERIOD]
    }
}

impl Default for Scrambler {
    fn default() -> Self {
        Self::new()
    }
}
