//! Superframe symbol layout
//!
//! On-air symbols alternate between runs of scrambled user data and
//! runs of known probe symbols. A *mini-frame* is one data run followed
//! by one probe run; a *superframe* is a fixed count of mini-frames.
//! Probe symbols carry no user data: their channel tribit is the
//! whitening sequence output alone, which makes every probe run a known
//! pattern the receiver can correlate against for acquisition and
//! channel tracking.
//!
//! The layout is pure arithmetic over symbol indices. All mutable
//! receiver state lives elsewhere.

use crate::scrambler::Scrambler;

/// Classification of one channel symbol position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolRole {
    /// Carries whitened user data
    Data,

    /// Known probe symbol
    Probe {
        /// Expected channel tribit: whitening sequence output, no data
        tribit: u8,
    },
}

/// Symbol layout of one waveform superframe
///
/// Layouts are immutable and copyable. Obtain the layout for an
/// operating mode from
/// [`WaveformMode::layout()`](crate::WaveformMode::layout).
///
/// ```
/// use miltone::{SymbolRole, WaveformMode};
///
/// let layout = WaveformMode::Bps2400Short.layout();
/// assert_eq!(480, layout.superframe_len());
/// assert_eq!(SymbolRole::Data, layout.classify(0));
/// assert!(matches!(layout.classify(32), SymbolRole::Probe { .. }));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    data_run: usize,
    probe_run: usize,
    mini_frames: usize,
}

impl FrameLayout {
    /// New layout
    ///
    /// Superframe length must be a whole multiple of the whitening
    /// sequence period so that probe tribits repeat identically every
    /// superframe. All layouts constructed by
    /// [`WaveformMode`](crate::WaveformMode) satisfy this.
    pub(crate) const fn new(data_run: usize, probe_run: usize, mini_frames: usize) -> Self {
        Self {
            data_run,
            probe_run,
            mini_frames,
        }
    }

    /// Data symbols per mini-frame
    pub fn data_run(&self) -> usize {
        self.data_run
    }

    /// Probe symbols per mini-frame
    pub fn probe_run(&self) -> usize {
        self.probe_run
    }

    /// Mini-frames per superframe
    pub fn mini_frames(&self) -> usize {
        self.mini_frames
    }

    /// Symbols per mini-frame
    pub fn mini_frame_len(&self) -> usize {
        self.data_run + self.probe_run
    }

    /// Symbols per superframe
    pub fn superframe_len(&self) -> usize {
        self.mini_frame_len() * self.mini_frames
    }

    /// Classify the symbol at the given superframe position
    ///
    /// Indices at or beyond [`superframe_len()`](Self::superframe_len)
    /// wrap around.
    pub fn classify(&self, index: usize) -> SymbolRole {
        let position = index % self.superframe_len();
        if position % self.mini_frame_len() < self.data_run {
            SymbolRole::Data
        } else {
            SymbolRole::Probe {
                tribit: Scrambler::sequence_tribit(position),
            }
        }
    }

    /// Positions of the first probe run in the superframe
    ///
    /// This is the probe run the acquisition correlator builds its
    /// template from.
    pub fn first_probe_run(&self) -> std::ops::Range<usize> {
        self.data_run..self.mini_frame_len()
    }
}
