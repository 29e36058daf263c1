//! Serial-tone transmitter
//!
//! The [`Modulator`] is the transmit counterpart of the
//! [`Modem`](crate::Modem): it packs data octets into tribits,
//! scrambles them, maps them onto the phase constellation, and
//! emits carrier-modulated PCM. Probe positions in the frame
//! layout transmit the scramble sequence alone, which is what
//! the receiver's correlator hunts for.
//!
//! The modulator is streaming: octets may be supplied across
//! any number of calls, and partial-tribit state is carried
//! between calls. The scrambler only advances when a symbol is
//! actually emitted, so a transmission split across calls is
//! sample-identical to the same transmission in one call.

use crate::builder::ConfigError;
use crate::carrier::Nco;
use crate::frame::{FrameLayout, SymbolRole};
use crate::mapper::Mapper;
use crate::mode::WaveformMode;
use crate::scrambler::Scrambler;
use crate::waveform;

/// Transmit amplitude of the modulated carrier, in PCM counts
const DEFAULT_AMPLITUDE: f32 = 8192.0;

/// Serial-tone waveform modulator
///
/// Produces headerless signed 16-bit PCM at the configured
/// sampling rate. Feed octets with
/// [`modulate()`](Modulator::modulate); samples are appended to
/// the caller's buffer.
#[derive(Clone, Debug)]
pub struct Modulator {
    mapper: Mapper,
    layout: FrameLayout,
    scrambler: Scrambler,
    carrier: Nco,

    // symbol position within the superframe
    position: usize,

    // fractional symbol period and leftover fraction
    samples_per_symbol: f32,
    pending: f32,

    // bits supplied but not yet transmitted, MSb first
    bit_accumulator: u32,
    bit_count: u32,

    amplitude: f32,
}

impl Modulator {
    /// New modulator
    ///
    /// Creates a modulator for `mode`, producing PCM at
    /// `output_rate` Hz. The rate must be at least
    /// [`MIN_SAMPLE_RATE`](crate::waveform::MIN_SAMPLE_RATE).
    pub fn new(mode: WaveformMode, output_rate: u32) -> Result<Self, ConfigError> {
        if output_rate < waveform::MIN_SAMPLE_RATE {
            return Err(ConfigError::SampleRate(output_rate));
        }
        Ok(Self {
            mapper: Mapper::new(mode.modulation()),
            layout: mode.layout(),
            scrambler: Scrambler::new(),
            carrier: Nco::new(waveform::CARRIER_HZ, output_rate),
            position: 0,
            samples_per_symbol: waveform::samples_per_symbol(output_rate),
            pending: 0.0,
            bit_accumulator: 0,
            bit_count: 0,
            amplitude: DEFAULT_AMPLITUDE,
        })
    }

    /// Restart the transmission
    ///
    /// Returns the scrambler, frame position, and carrier phase
    /// to their start-of-transmission values and discards any
    /// untransmitted bits.
    pub fn reset(&mut self) {
        self.scrambler.reset();
        self.carrier.reset();
        self.position = 0;
        self.pending = 0.0;
        self.bit_accumulator = 0;
        self.bit_count = 0;
    }

    /// Set the transmit amplitude, in PCM counts
    ///
    /// The peak amplitude of the emitted carrier. Clamped to
    /// the `i16` range.
    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = f32::clamp(amplitude, 0.0, i16::MAX as f32);
    }

    /// Modulate octets into PCM samples
    ///
    /// Consumes as many of `octets` as can be transmitted in
    /// whole symbols and appends the modulated samples to `out`.
    /// Probe symbols required by the frame layout are inserted
    /// automatically. Up to two bits may be retained for the
    /// next call; a final partial tribit is only ever flushed by
    /// [`reset()`](Modulator::reset).
    pub fn modulate(&mut self, octets: &[u8], out: &mut Vec<i16>) {
        let bits_per_symbol = u32::from(self.mapper.modulation().bits_per_symbol());
        let mut octets = octets.iter();

        loop {
            let data = match self.layout.classify(self.position) {
                SymbolRole::Data => {
                    while self.bit_count < bits_per_symbol {
                        match octets.next() {
                            Some(&octet) => {
                                self.bit_accumulator = (self.bit_accumulator << 8) | u32::from(octet);
                                self.bit_count += 8;
                            }
                            None => return,
                        }
                    }
                    self.bit_count -= bits_per_symbol;
                    let tribit = (self.bit_accumulator >> self.bit_count) as u8
                        & (self.mapper.modulation().order() - 1);
                    self.bit_accumulator &= (1u32 << self.bit_count) - 1;
                    tribit
                }
                SymbolRole::Probe { .. } => 0,
            };

            let scramble = self.scrambler.next_tribit();
            let point = self.mapper.encode(data, scramble);
            self.position = (self.position + 1) % self.layout.superframe_len();

            self.pending += self.samples_per_symbol;
            let whole = self.pending as usize;
            self.pending -= whole as f32;
            for _i in 0..whole {
                let sample = self.carrier.mix_up(point) * self.amplitude;
                out.push(f32::clamp(sample, i16::MIN as f32, i16::MAX as f32).round() as i16);
            }
        }
    }
}
