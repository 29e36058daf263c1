//! # miltone: serial-tone HF data modem
//!
//! This crate modulates and demodulates a military-standard-style
//! serial-tone waveform: phase-shift keyed data at 2400 symbols per
//! second on a single 1800 Hz audio carrier, the scheme used for
//! digital traffic over HF radio channels. It converts between data
//! octets and signed 16-bit PCM, in both directions, with no radio
//! hardware knowledge of its own.
//!
//! ## Disclaimer
//!
//! This crate is an independent implementation of the waveform class
//! and has not been certified for conformance with any standard.
//! Interoperability with deployed equipment is a goal, not a
//! guarantee.
//!
//! ## Example
//!
//! The transmit side is a [`Modulator`]: feed it octets and it
//! appends PCM samples. The receive side is a [`Modem`], created via
//! its [builder](ModemBuilder): feed it PCM blocks of any size and it
//! delivers decoded octets and status transitions to caller-provided
//! sinks.
//!
//! ```
//! use miltone::{ModemBuilder, Modulator, NullStatus, WaveformMode};
//!
//! // modulate a message into 9600 Hz PCM
//! let message = b"CQ CQ CQ de MILTONE";
//! let mut tx = Modulator::new(WaveformMode::Bps2400Short, 9600).unwrap();
//! let mut pcm: Vec<i16> = vec![];
//! for _ in 0..20 {
//!     tx.modulate(message, &mut pcm);
//! }
//!
//! // demodulate it
//! let mut modem = ModemBuilder::new(9600).build().unwrap();
//! modem.enable();
//!
//! let mut decoded: Vec<u8> = vec![];
//! modem.process_block(&pcm, &mut decoded, &mut NullStatus).unwrap();
//!
//! // the decoded stream picks up mid-message, once the modem has
//! // found and confirmed a frame boundary
//! let text = String::from_utf8(decoded).unwrap();
//! assert!(text.contains("CQ de MILTONE"));
//! ```
//!
//! Acquisition costs airtime: the receiver locates the transmission
//! by correlating against the known probe symbols embedded in every
//! frame, so octets sent before the first detected probe run are
//! not recoverable. Real traffic protocols lead with a preamble for
//! exactly this reason.
//!
//! ## Waveform
//!
//! Transmissions are organized into *superframes* of interleaved
//! data and probe symbol runs. Probe symbols carry no data: they
//! transmit the pseudo-random whitening sequence alone, giving the
//! receiver a known pattern for acquisition and sync policing. The
//! operating [mode](WaveformMode) selects the user bit rate and
//! interleave depth; the on-air symbol rate never changes.
//!
//! All modes whiten their data with the same 12-bit shift-register
//! [sequence](Scrambler) and Gray-map tribits onto a PSK
//! constellation ([`Mapper`]). Receive-side processing is documented
//! on [`Modem`].

mod agc;
mod builder;
mod carrier;
mod correlate;
mod filter;
mod frame;
mod mapper;
mod mode;
mod modem;
mod modulator;
mod scrambler;
mod sink;
mod symsync;
pub mod waveform;

pub use builder::{ConfigError, ModemBuilder};
pub use frame::{FrameLayout, SymbolRole};
pub use mapper::{Mapper, SoftDecision};
pub use mode::{Modulation, WaveformMode};
pub use modem::{Modem, ModemError};
pub use modulator::Modulator;
pub use scrambler::{Scrambler, SCRAMBLE_PERIOD};
pub use sink::{ModemState, NullStatus, OctetSink, StatusEvent, StatusSink};
