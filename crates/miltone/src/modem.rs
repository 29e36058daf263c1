//! Serial-tone receive modem
//!
//! The [`Modem`] accepts signed 16-bit PCM and recovers the data
//! octets of a serial-tone transmission. Internally it is a chain
//! of DSP stages, each fed per-sample:
//!
//! ```txt
//! i16 PCM (input)
//!   │
//!   ├── AGC: normalize to ±1.0, gain frozen once synced
//!   │
//!   ├── NCO: mix the 1800 Hz passband down to complex baseband
//!   │
//!   ├── FIR: low-pass the symbol stream, reject the 2×carrier image
//!   │
//!   ├── while acquiring ──► probe correlator (superframe search)
//!   │
//!   └── once synced ─────► timing loop ──► derotate ──► demap ──► octets
//! ```
//!
//! While [`Acquiring`](ModemState::Acquiring), filtered samples
//! accumulate in a search window that is swept once per superframe
//! for the known probe sequence. A detection seeds the scrambler,
//! the frame position, the carrier phase correction, and the symbol
//! clock, and the whole search window is replayed through the
//! symbol chain so that no symbols are lost to the sweep cadence.
//!
//! After detection the modem is [`Synced`](ModemState::Synced) but
//! not yet trusted: received probe symbols must decode to their
//! expected values. Enough consecutive matches promote the modem to
//! [`Decoding`](ModemState::Decoding), where data symbols are
//! unscrambled, packed MSb-first into octets, and delivered to the
//! caller's [`OctetSink`]. Sustained probe mismatches drop the
//! modem back to `Acquiring`.

use num_complex::Complex;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::agc::Agc;
use crate::builder::ModemBuilder;
use crate::carrier::Nco;
use crate::correlate::ProbeCorrelator;
use crate::filter::{FilterCoeff, Window};
use crate::frame::{FrameLayout, SymbolRole};
use crate::mapper::Mapper;
use crate::mode::WaveformMode;
use crate::scrambler::Scrambler;
use crate::sink::{ModemState, OctetSink, StatusEvent, StatusSink};
use crate::symsync::TimingLoop;
use crate::waveform;

/// Smallest permitted AGC gain
const AGC_GAIN_MIN: f32 = 1.0e-3;

/// Largest permitted AGC gain
const AGC_GAIN_MAX: f32 = 1.0e6;

/// Serial-tone receive modem
///
/// Create with a [`ModemBuilder`](crate::ModemBuilder), then
/// [`enable()`](Modem::enable) and feed PCM blocks of any length to
/// [`process_block()`](Modem::process_block). Decoded octets and
/// status transitions are delivered through the caller's sinks,
/// synchronously, during the call.
///
/// ```
/// use miltone::{ModemBuilder, NullStatus};
///
/// let mut modem = ModemBuilder::new(9600).build().unwrap();
/// modem.enable();
///
/// let mut decoded: Vec<u8> = vec![];
/// let silence = vec![0i16; 1024];
/// let count = modem
///     .process_block(&silence, &mut decoded, &mut NullStatus)
///     .unwrap();
/// assert_eq!(0, count);
/// assert!(decoded.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Modem {
    // configuration
    mode: WaveformMode,
    input_rate: u32,
    sync_threshold: f32,
    probes_to_confirm: u32,
    probe_miss_limit: u32,

    // processing chain, in input order
    agc: Agc,
    carrier: Nco,
    filter: FilterCoeff<f32>,
    filter_window: Window<Complex<f32>>,
    search: ProbeCorrelator,
    search_window: Window<Complex<f32>>,
    sync: TimingLoop,
    mapper: Mapper,
    layout: FrameLayout,
    scrambler: Scrambler,

    // receiver state
    state: ModemState,
    input_sample_counter: u64,

    // samples accumulated since the last correlator sweep
    since_sweep: usize,

    // superframe position of the next symbol
    position: usize,

    // carrier phase correction measured at detection
    derotation: Complex<f32>,

    // consecutive probe symbols which decoded correctly
    probe_ok: u32,

    // consecutive probe symbols which did not
    probe_bad: u32,

    // decoded data bits not yet assembled into an octet, MSb first
    bit_accumulator: u32,
    bit_count: u32,
}

impl Modem {
    /// Create from a checked builder configuration
    pub(crate) fn from_builder(builder: &ModemBuilder) -> Self {
        let samples_per_symbol = waveform::samples_per_symbol(builder.input_rate());
        let filter = FilterCoeff::from_slice(waveform::receive_filter(builder.input_rate()));
        let filter_window = Window::new(filter.len());
        let search = ProbeCorrelator::new(builder.mode(), samples_per_symbol);
        let search_window = Window::new(search.window_len());
        let sync = TimingLoop::new(
            samples_per_symbol,
            builder.timing_bandwidth(),
            builder.timing_damping(),
            builder.timing_max_deviation(),
        );

        Self {
            mode: builder.mode(),
            input_rate: builder.input_rate(),
            sync_threshold: builder.sync_threshold(),
            probes_to_confirm: builder.probes_to_confirm(),
            probe_miss_limit: builder.probe_miss_limit(),
            agc: Agc::new(builder.agc_bandwidth(), AGC_GAIN_MIN, AGC_GAIN_MAX),
            carrier: Nco::new(waveform::CARRIER_HZ, builder.input_rate()),
            filter,
            filter_window,
            search,
            search_window,
            sync,
            mapper: Mapper::new(builder.mode().modulation()),
            layout: builder.mode().layout(),
            scrambler: Scrambler::new(),
            state: ModemState::Idle,
            input_sample_counter: 0,
            since_sweep: 0,
            position: 0,
            derotation: Complex::new(1.0, 0.0),
            probe_ok: 0,
            probe_bad: 0,
            bit_accumulator: 0,
            bit_count: 0,
        }
    }

    /// Begin receive processing
    ///
    /// Moves an [`Idle`](ModemState::Idle) modem to
    /// [`Acquiring`](ModemState::Acquiring). Has no effect if the
    /// modem is already enabled. No status event is emitted; sinks
    /// are only available during
    /// [`process_block()`](Modem::process_block).
    pub fn enable(&mut self) {
        if self.state == ModemState::Idle {
            self.reset_tracking();
            self.state = ModemState::Acquiring;
            debug!("modem enabled");
        }
    }

    /// Stop receive processing
    ///
    /// Passes through [`Flushing`](ModemState::Flushing) and comes
    /// to rest [`Idle`](ModemState::Idle). A trailing partial octet
    /// is dropped. Has no effect if the modem is already idle.
    pub fn disable(&mut self) {
        if self.state == ModemState::Idle {
            return;
        }
        self.state = ModemState::Flushing;
        self.reset_tracking();
        self.agc.reset();
        self.carrier.reset();
        self.filter_window.reset();
        self.state = ModemState::Idle;
        debug!("modem disabled");
    }

    /// Reset to zero initial conditions
    ///
    /// Discards every estimate, every buffered sample, and the
    /// input sample counter. An enabled modem returns to
    /// [`Acquiring`](ModemState::Acquiring); a disabled one stays
    /// [`Idle`](ModemState::Idle).
    pub fn reset(&mut self) {
        self.reset_tracking();
        self.agc.reset();
        self.carrier.reset();
        self.filter_window.reset();
        self.input_sample_counter = 0;
        if self.state != ModemState::Idle {
            self.state = ModemState::Acquiring;
        }
    }

    /// Current operating state
    pub fn state(&self) -> ModemState {
        self.state
    }

    /// Waveform operating mode
    pub fn mode(&self) -> WaveformMode {
        self.mode
    }

    /// Input sampling rate (Hz)
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Lifetime count of input samples processed
    pub fn input_sample_counter(&self) -> u64 {
        self.input_sample_counter
    }

    /// Change the waveform operating mode
    ///
    /// The mode may only be changed while the modem is
    /// [`Idle`](ModemState::Idle); [`disable()`](Modem::disable)
    /// first. Rebuilds the mode-dependent parts of the chain.
    pub fn set_mode(&mut self, mode: WaveformMode) -> Result<(), ModemError> {
        if self.state != ModemState::Idle {
            return Err(ModemError::NotIdle);
        }
        self.mode = mode;
        self.mapper = Mapper::new(mode.modulation());
        self.layout = mode.layout();
        self.search =
            ProbeCorrelator::new(mode, waveform::samples_per_symbol(self.input_rate));
        self.search_window = Window::new(self.search.window_len());
        self.reset_tracking();
        Ok(())
    }

    /// Process a block of input samples
    ///
    /// Accepts any number of signed 16-bit PCM samples at the
    /// configured input rate. Decoded octets are delivered to
    /// `octets` and state transitions to `status`, in stream order,
    /// before the call returns. Returns the number of octets
    /// delivered.
    ///
    /// Block boundaries carry no meaning: a transmission may be
    /// split across calls at any point without affecting the
    /// decoded output.
    pub fn process_block<O, S>(
        &mut self,
        pcm: &[i16],
        octets: &mut O,
        status: &mut S,
    ) -> Result<usize, ModemError>
    where
        O: OctetSink,
        S: StatusSink,
    {
        if self.state == ModemState::Idle {
            return Err(ModemError::NotEnabled);
        }
        if pcm.is_empty() {
            return Err(ModemError::EmptyBlock);
        }

        let mut emitted = 0usize;
        for &sample in pcm {
            self.input_sample_counter += 1;

            let normalized = self.agc.input(f32::from(sample) / waveform::PCM_FULL_SCALE);
            let baseband = self.carrier.mix_down(normalized);
            self.filter_window.push([baseband]);
            let filtered: Complex<f32> = self.filter.filter(&self.filter_window);

            if self.state == ModemState::Acquiring {
                self.search_window.push([filtered]);
                self.since_sweep += 1;
                if self.since_sweep >= self.search.hop() {
                    self.since_sweep = 0;
                    emitted += self.acquire(octets, status);
                }
            } else if let Some(symbol) = self.sync.input(filtered) {
                emitted += self.handle_symbol(symbol, octets, status);
            }
        }

        Ok(emitted)
    }

    // Sweep the search window and, on a detection, join the stream.
    //
    // The detected offset names the first sample of a probe run,
    // which fixes the superframe position and therefore the
    // scrambler position. The complex correlation peak measures
    // the carrier phase of the transmission: the mixer phase is
    // anchored to sample zero of the input stream, not to the
    // arrival time, so a late start leaves every baseband sample
    // rotated by a constant. The conjugate of the peak phasor
    // undoes it. The timing loop is preset so that its first
    // strobe lands on the detected sample, then the entire search
    // window is replayed through the symbol chain: the detected
    // frame began up to one superframe in the past, and those
    // symbols would otherwise be lost.
    fn acquire<O, S>(&mut self, octets: &mut O, status: &mut S) -> usize
    where
        O: OctetSink,
        S: StatusSink,
    {
        let found = self.search.sweep(self.search_window.as_slice());
        if found.confidence < self.sync_threshold {
            return 0;
        }

        debug!(
            "frame sync: window offset {}, confidence {:.3}, carrier phase {:.1} deg, agc gain {:.3e}",
            found.offset,
            found.confidence,
            found.phase.arg().to_degrees(),
            self.agc.gain()
        );

        self.agc.lock(true);
        self.position = self.layout.data_run();
        self.scrambler = Scrambler::with_position(self.position);
        self.derotation = found.phase.conj();
        self.probe_ok = 0;
        self.probe_bad = 0;
        self.sync.preset((found.offset + 1) as f32);
        self.state = ModemState::Synced;

        let frame_start = (self.input_sample_counter + found.offset as u64)
            .saturating_sub(self.search_window.len() as u64);
        status.report(&StatusEvent::detected(
            self.state,
            self.input_sample_counter,
            frame_start,
            found.confidence,
        ));

        // handle_symbol() needs &mut self, so replay from a copy
        let replay: Vec<Complex<f32>> = self.search_window.as_slice().to_vec();
        let mut emitted = 0usize;
        for sample in replay {
            if let Some(symbol) = self.sync.input(sample) {
                emitted += self.handle_symbol(symbol, octets, status);
                if self.state == ModemState::Acquiring {
                    break;
                }
            }
        }
        emitted
    }

    // Demap one recovered symbol and advance the frame position.
    //
    // Symbols still carry the carrier phase measured at detection;
    // the stored derotation removes it ahead of the decision.
    // Probe symbols police the synchronization: their data value
    // must decode to zero. Data symbols contribute bits only in the
    // Decoding state.
    fn handle_symbol<O, S>(&mut self, symbol: Complex<f32>, octets: &mut O, status: &mut S) -> usize
    where
        O: OctetSink,
        S: StatusSink,
    {
        let scramble = self.scrambler.next_tribit();
        let role = self.layout.classify(self.position);
        self.position = (self.position + 1) % self.layout.superframe_len();
        let decision = self.mapper.decode(symbol * self.derotation, scramble);

        match role {
            SymbolRole::Probe { .. } => {
                if decision.value == 0 {
                    self.probe_bad = 0;
                    self.probe_ok += 1;
                    if self.state == ModemState::Synced && self.probe_ok >= self.probes_to_confirm
                    {
                        self.bit_accumulator = 0;
                        self.bit_count = 0;
                        self.state = ModemState::Decoding;
                        debug!("probe check passed; decoding");
                        status.report(&StatusEvent::new(self.state, self.input_sample_counter));
                    }
                } else {
                    self.probe_ok = 0;
                    self.probe_bad += 1;
                    if self.probe_bad >= self.probe_miss_limit {
                        debug!("probe check failed; reacquiring");
                        self.reset_tracking();
                        self.state = ModemState::Acquiring;
                        status.report(&StatusEvent::new(self.state, self.input_sample_counter));
                    }
                }
                0
            }
            SymbolRole::Data => {
                if self.state != ModemState::Decoding {
                    return 0;
                }
                let bits = u32::from(self.mapper.modulation().bits_per_symbol());
                self.bit_accumulator = (self.bit_accumulator << bits) | u32::from(decision.value);
                self.bit_count += bits;

                let mut emitted = 0usize;
                while self.bit_count >= 8 {
                    self.bit_count -= 8;
                    octets.put((self.bit_accumulator >> self.bit_count) as u8);
                    self.bit_accumulator &= (1u32 << self.bit_count) - 1;
                    emitted += 1;
                }
                emitted
            }
        }
    }

    // Return every frame-tracking estimate to its acquisition
    // value. The AGC gain and carrier phase are left running: the
    // input stream continues regardless of sync.
    fn reset_tracking(&mut self) {
        self.agc.lock(false);
        self.sync.reset();
        self.search_window.reset();
        self.since_sweep = 0;
        self.scrambler.reset();
        self.position = 0;
        self.derotation = Complex::new(1.0, 0.0);
        self.probe_ok = 0;
        self.probe_bad = 0;
        self.bit_accumulator = 0;
        self.bit_count = 0;
    }
}

/// Invalid use of a built modem
///
/// Unlike [`ConfigError`](crate::ConfigError), these indicate a
/// sequencing mistake at the call site rather than a bad
/// configuration value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModemError {
    /// A sample block was empty
    #[error("sample block is empty")]
    EmptyBlock,

    /// Processing was requested while the modem is idle
    #[error("modem is not enabled")]
    NotEnabled,

    /// A configuration change was requested while enabled
    #[error("modem is enabled; disable it first")]
    NotIdle,
}
