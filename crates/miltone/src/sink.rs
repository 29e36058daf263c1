//! Decoded output and status delivery
//!
//! The modem delivers its two output streams through capability
//! traits: [`OctetSink`] receives decoded data bytes, and
//! [`StatusSink`] receives [`StatusEvent`] notifications on
//! every state transition. Both are invoked synchronously from
//! within [`process_block`](crate::Modem::process_block), zero
//! or more times per call.
//!
//! Closures implement both traits, so most callers never name
//! them:
//!
//! ```
//! use miltone::StatusEvent;
//!
//! let mut octets: Vec<u8> = vec![];
//! let mut status = |event: &StatusEvent| eprintln!("{}", event);
//! # let _ = (&mut octets, &mut status);
//! ```

/// Modem operating state
///
/// Reported with every [`StatusEvent`]. The modem begins in
/// `Idle`, enters `Acquiring` when receive processing starts,
/// and climbs to `Decoding` as synchronization checks pass.
/// Loss of synchronization drops it back to `Acquiring`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumMessage,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
pub enum ModemState {
    /// Receive processing not yet enabled
    #[strum(detailed_message = "idle")]
    Idle,

    /// Searching the sample stream for a probe sequence
    #[strum(detailed_message = "acquiring")]
    Acquiring,

    /// Frame boundary found; confirming probe symbols
    #[strum(detailed_message = "synced")]
    Synced,

    /// Probes confirmed; data symbols are being decoded
    #[strum(detailed_message = "decoding")]
    Decoding,

    /// Draining buffered history before a reset
    #[strum(detailed_message = "flushing")]
    Flushing,
}

impl ModemState {
    /// Human-readable state name
    pub fn as_display_str(&self) -> &'static str {
        use strum::EnumMessage;
        self.get_detailed_message()
            .unwrap_or_else(|| self.into())
    }
}

impl std::fmt::Display for ModemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_display_str())
    }
}

/// Modem status notification
///
/// Reports a state transition together with the "time" it
/// occurred, measured as a monotonic count of input samples.
/// Transitions out of `Acquiring` additionally report where the
/// frame was found and how confident the correlator was.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusEvent {
    state: ModemState,
    input_sample_counter: u64,
    frame_start: Option<u64>,
    confidence: Option<f32>,
}

impl StatusEvent {
    /// New state, as of this event
    pub fn state(&self) -> ModemState {
        self.state
    }

    /// Event time, measured in input samples
    ///
    /// Reports the "time" of the event using a monotonic count
    /// of input samples. Divide by the sampling rate for
    /// seconds.
    pub fn input_sample_counter(&self) -> u64 {
        self.input_sample_counter
    }

    /// Input sample offset of the detected frame, if known
    ///
    /// Set on the transition to [`ModemState::Synced`]. The
    /// offset locates the first sample of the detected probe
    /// run within the lifetime input stream.
    pub fn frame_start(&self) -> Option<u64> {
        self.frame_start
    }

    /// Correlator confidence in `0.0 ..= 1.0`, if known
    ///
    /// Set on the transition to [`ModemState::Synced`].
    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }
}

impl StatusEvent {
    /// Create from state and time
    pub(crate) fn new(state: ModemState, input_sample_counter: u64) -> Self {
        Self {
            state,
            input_sample_counter,
            frame_start: None,
            confidence: None,
        }
    }

    /// Create for a successful acquisition
    pub(crate) fn detected(
        state: ModemState,
        input_sample_counter: u64,
        frame_start: u64,
        confidence: f32,
    ) -> Self {
        Self {
            state,
            input_sample_counter,
            frame_start: Some(frame_start),
            confidence: Some(confidence),
        }
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.frame_start, self.confidence) {
            (Some(frame_start), Some(confidence)) => write!(
                f,
                "[{:<14}]: {}: frame at {}, confidence {:.2}",
                self.input_sample_counter, self.state, frame_start, confidence
            ),
            _ => write!(f, "[{:<14}]: {}", self.input_sample_counter, self.state),
        }
    }
}

/// Receives decoded data octets
///
/// Implemented for all `FnMut(u8)` closures and for `Vec<u8>`.
pub trait OctetSink {
    /// Accept one decoded octet
    fn put(&mut self, octet: u8);
}

impl<F> OctetSink for F
where
    F: FnMut(u8),
{
    fn put(&mut self, octet: u8) {
        self(octet)
    }
}

impl OctetSink for Vec<u8> {
    fn put(&mut self, octet: u8) {
        self.push(octet)
    }
}

/// Receives status transition events
///
/// Implemented for all `FnMut(&StatusEvent)` closures.
pub trait StatusSink {
    /// Accept one status event
    fn report(&mut self, status: &StatusEvent);
}

impl<F> StatusSink for F
where
    F: FnMut(&StatusEvent),
{
    fn report(&mut self, status: &StatusEvent) {
        self(status)
    }
}

/// Discards status events
///
/// For callers which want decoded octets only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn report(&mut self, _status: &StatusEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        use strum::IntoEnumIterator;

        for state in ModemState::iter() {
            assert!(!state.as_display_str().is_empty());
        }
        assert_eq!("acquiring", format!("{}", ModemState::Acquiring));
    }

    #[test]
    fn test_event_display() {
        let plain = StatusEvent::new(ModemState::Acquiring, 512);
        assert_eq!(None, plain.frame_start());
        assert!(format!("{}", plain).contains("acquiring"));

        let sync = StatusEvent::detected(ModemState::Synced, 4096, 135, 0.97);
        assert_eq!(Some(135), sync.frame_start());
        let text = format!("{}", sync);
        assert!(text.contains("synced"));
        assert!(text.contains("frame at 135"));
    }

    #[test]
    fn test_closure_sinks() {
        let mut collected: Vec<u8> = vec![];
        {
            let mut sink = |octet: u8| collected.push(octet);
            sink.put(0x42);
            sink.put(0x43);
        }
        assert_eq!(&[0x42, 0x43], collected.as_slice());

        let mut states: Vec<ModemState> = vec![];
        {
            let mut sink = |event: &StatusEvent| states.push(event.state());
            sink.report(&StatusEvent::new(ModemState::Decoding, 1));
        }
        assert_eq!(&[ModemState::Decoding], states.as_slice());
    }

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<u8> = vec![];
        sink.put(7);
        assert_eq!(&[7u8], sink.as_slice());
    }
}
