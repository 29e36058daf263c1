use std::io;

use anyhow::{anyhow, Context};
use byteorder::{LittleEndian, ReadBytesExt};
use clap::Parser;
use log::{info, LevelFilter};

use miltone::ModemBuilder;

mod app;
mod cli;

use cli::{Args, CliError};

fn main() {
    match mildec() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn mildec() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // create the modem
    let mut modem = ModemBuilder::new(args.rate)
        .with_mode(args.mode)
        .with_agc_bandwidth(args.agc_bw)
        .with_timing_bandwidth(args.timing_bw)
        .with_timing_max_deviation(args.timing_max_dev)
        .with_sync_threshold(args.sync_threshold)
        .with_probes_to_confirm(args.probes_to_confirm)
        .with_probe_miss_limit(args.probe_miss_limit)
        .build()
        .context("unable to configure modem")?;

    // file setup: locks stdin in case we need it
    let stdin = io::stdin();
    let stdin_handle = stdin.lock();
    let mut inbuf = file_setup(&args, stdin_handle)?;

    let stdout = io::stdout();
    let mut outbuf = stdout.lock();

    // processing: read i16 from the input source until EOF
    app::run(
        &mut modem,
        std::iter::from_fn(|| Some(inbuf.read_i16::<LittleEndian>().ok()?)),
        &mut outbuf,
    )?;

    Ok(())
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            3 | _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("miltone", log_filter)
            .filter_module("mildec", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup<'stdin>(
    args: &Args,
    stdin: std::io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        info!("serial-tone decoder reading standard input");
        if !is_terminal(&std::io::stdin()) {
            Ok(Box::new(io::BufReader::new(stdin)))
        } else {
            Err(anyhow!(
                "cowardly refusing to read audio samples from a terminal.

Pipe a source of raw uncompressed audio from sox, parec, rtl_fm,
or similar into this program."
            ))
        }
    } else {
        info!("serial-tone decoder reading file: \"{}\"", &args.file);
        Ok(Box::new(io::BufReader::new(
            std::fs::File::open(&args.file)
                .with_context(|| format!("Unable to open --file \"{}\"", args.file))?,
        )))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
