//! Waveform operating modes

use std::fmt;

use strum::EnumMessage;

use crate::frame::FrameLayout;

/// Serial-tone carrier modulation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modulation {
    /// Eight-phase PSK, three bits per channel symbol
    Psk8,

    /// Four-phase PSK, two bits per channel symbol
    Psk4,
}

impl Modulation {
    /// Number of constellation points
    pub fn order(&self) -> u8 {
        match self {
            Modulation::Psk8 => 8,
            Modulation::Psk4 => 4,
        }
    }

    /// Data bits carried per channel symbol
    pub fn bits_per_symbol(&self) -> u8 {
        match self {
            Modulation::Psk8 => 3,
            Modulation::Psk4 => 2,
        }
    }
}

/// Waveform operating mode
///
/// Selects the user bit rate and interleaver span. The mode fixes the
/// carrier modulation and the superframe layout; the channel symbol
/// rate is the same 2400 baud in every mode. Modes may be parsed
/// `from_str()` using their short designators and `Display` as the
/// same designator.
///
/// ```
/// use miltone::WaveformMode;
///
/// let mode: WaveformMode = "2400S".parse().unwrap();
/// assert_eq!(WaveformMode::Bps2400Short, mode);
/// assert_eq!("2400S", &format!("{}", mode));
/// assert_eq!("2400 bps, short interleave", mode.as_display_str());
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
pub enum WaveformMode {
    /// 2400 bps user data, short interleave
    #[default]
    #[strum(serialize = "2400S", detailed_message = "2400 bps, short interleave")]
    Bps2400Short,

    /// 2400 bps user data, long interleave
    #[strum(serialize = "2400L", detailed_message = "2400 bps, long interleave")]
    Bps2400Long,

    /// 1200 bps user data, short interleave
    #[strum(serialize = "1200S", detailed_message = "1200 bps, short interleave")]
    Bps1200Short,

    /// 1200 bps user data, long interleave
    #[strum(serialize = "1200L", detailed_message = "1200 bps, long interleave")]
    Bps1200Long,
}

impl WaveformMode {
    /// Nominal user bit rate, in bits per second
    pub fn bit_rate(&self) -> u32 {
        match self {
            WaveformMode::Bps2400Short | WaveformMode::Bps2400Long => 2400,
            WaveformMode::Bps1200Short | WaveformMode::Bps1200Long => 1200,
        }
    }

    /// Carrier modulation for this mode
    pub fn modulation(&self) -> Modulation {
        match self {
            WaveformMode::Bps2400Short | WaveformMode::Bps2400Long => Modulation::Psk8,
            WaveformMode::Bps1200Short | WaveformMode::Bps1200Long => Modulation::Psk4,
        }
    }

    /// Superframe layout for this mode
    ///
    /// Longer interleaves use longer superframes. Lower bit rates
    /// trade data symbols for probe symbols within each mini-frame.
    pub fn layout(&self) -> FrameLayout {
        match self {
            WaveformMode::Bps2400Short => FrameLayout::new(32, 16, 10),
            WaveformMode::Bps2400Long => FrameLayout::new(32, 16, 20),
            WaveformMode::Bps1200Short => FrameLayout::new(20, 20, 12),
            WaveformMode::Bps1200Long => FrameLayout::new(20, 20, 24),
        }
    }

    /// Human-readable mode description
    pub fn as_display_str(&self) -> &'static str {
        self.get_detailed_message().unwrap_or_else(|| self.into())
    }
}

impl fmt::Display for WaveformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = self.into();
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;

    use strum::IntoEnumIterator;

    #[test]
    fn test_mode_strings_roundtrip() {
        for mode in WaveformMode::iter() {
            let designator = format!("{}", mode);
            assert_eq!(Ok(mode), WaveformMode::from_str(&designator));
        }
        assert!(WaveformMode::from_str("4800X").is_err());
    }

    #[test]
    fn test_mode_modulation() {
        assert_eq!(Modulation::Psk8, WaveformMode::Bps2400Short.modulation());
        assert_eq!(Modulation::Psk8, WaveformMode::Bps2400Long.modulation());
        assert_eq!(Modulation::Psk4, WaveformMode::Bps1200Short.modulation());
        assert_eq!(Modulation::Psk4, WaveformMode::Bps1200Long.modulation());

        assert_eq!(8, Modulation::Psk8.order());
        assert_eq!(3, Modulation::Psk8.bits_per_symbol());
        assert_eq!(4, Modulation::Psk4.order());
        assert_eq!(2, Modulation::Psk4.bits_per_symbol());
    }

    #[test]
    fn test_mode_layouts() {
        assert_eq!(480, WaveformMode::Bps2400Short.layout().superframe_len());
        assert_eq!(960, WaveformMode::Bps2400Long.layout().superframe_len());
        assert_eq!(480, WaveformMode::Bps1200Short.layout().superframe_len());
        assert_eq!(960, WaveformMode::Bps1200Long.layout().superframe_len());
    }

    #[test]
    fn test_default_mode() {
        assert_eq!(WaveformMode::Bps2400Short, WaveformMode::default());
        assert_eq!(2400, WaveformMode::default().bit_rate());
    }
}
