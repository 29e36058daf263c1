use std::fmt::Display;

use clap::{error::ErrorKind, value_parser, CommandFactory, Parser};

use miltone::WaveformMode;

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program accepts raw PCM samples in signed 16-bit little-endian (i16) format, at the given sampling --rate, and decodes any serial-tone data traffic that is present. Decoded octets are written to standard output.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program accepts raw PCM samples in signed 16-bit little-endian (i16) format, at the given sampling --rate, and decodes any serial-tone data traffic that is present. Decoded octets are written to standard output. Sync state transitions are logged to standard error.

You can pipe in an audio file with sox

    sox input.wav -t raw -r 9.6k -e signed -b 16 -c 1 - \
        | mildec -r 9600

The --mode must match the transmitting station. The four interleaver and rate combinations of the waveform are:

    2400S    2400 bps, 8PSK, short interleave (the default)
    2400L    2400 bps, 8PSK, long interleave
    1200S    1200 bps, QPSK, short interleave
    1200L    1200 bps, QPSK, long interleave

Decoding begins once frame sync is acquired and confirmed against the known probe symbols. Audio received before sync, or while sync is lost, produces no output. Run with -v to log sync acquisition and loss to standard error.
"#;

const ADVANCED: &str = "Advanced Modem Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING except decoded octets
    #[arg(short, long)]
    pub quiet: bool,

    /// Sampling rate (Hz)
    ///
    /// Set to the sampling rate of your audio source. The rate
    /// must be at least 9600 Hz. Integer multiples of the 2400 Hz
    /// symbol rate work best. Avoid resampling the audio.
    #[arg(short, long, default_value_t = 9600)]
    pub rate: u32,

    /// Waveform mode of the transmitting station
    #[arg(short, long, default_value_t = WaveformMode::default())]
    pub mode: WaveformMode,

    /// Input file (or "-" for stdin)
    ///
    /// The input must be one-channel (mono), signed 16-bit
    /// little-endian at --rate.
    #[arg(long, default_value_t = STDIN_FILE.to_string())]
    pub file: String,

    /// AGC bandwidth (fraction of input rate)
    #[arg(long, default_value_t = 0.05)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub agc_bw: f32,

    /// Symbol timing loop bandwidth (fsym)
    #[arg(long, default_value_t = 0.01)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub timing_bw: f32,

    /// Symbol timing maximum deviation (fsym)
    #[arg(long, default_value_t = 0.03)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub timing_max_dev: f32,

    /// Correlation req'd for frame sync (0.0 < C ≤ 1.0)
    #[arg(long, default_value_t = 0.50)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub sync_threshold: f32,

    /// Probe symbols req'd to confirm sync (≥1)
    #[arg(long, default_value_t = 8)]
    #[arg(value_parser = value_parser!(u32).range(1..))]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub probes_to_confirm: u32,

    /// Probe misses before sync is dropped (≥1)
    #[arg(long, default_value_t = 32)]
    #[arg(value_parser = value_parser!(u32).range(1..))]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub probe_miss_limit: u32,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIN_FILE
    }
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clap() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_mode_parses() {
        let args = Args::try_parse_from(["mildec", "-r", "9600", "-m", "1200L"]).unwrap();
        assert_eq!(WaveformMode::Bps1200Long, args.mode);
        assert!(args.input_is_stdin());

        assert!(Args::try_parse_from(["mildec", "-m", "4800X"]).is_err());
        assert!(Args::try_parse_from(["mildec", "--probe-miss-limit", "0"]).is_err());
    }
}
