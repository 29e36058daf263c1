//! Decoder processing loop
//!
//! Drives a [`Modem`] with blocks of input samples until the input
//! is exhausted. Decoded octets are written to the output as soon
//! as they arrive. Sync status transitions are reported via the
//! `log` facade at info level, which `main` routes to stderr.

use std::io;

use anyhow::Context;
use log::info;

use miltone::{Modem, StatusEvent};

/// Samples handed to the modem per call
const BLOCK_LEN: usize = 1024;

/// Run the decoder
///
/// Enables `modem` and feeds it every sample `input` yields.
/// Decoded octets go to `output`, flushed after every block so
/// that downstream pipes see data promptly. The modem is disabled
/// again before returning.
pub fn run<I, W>(modem: &mut Modem, input: I, output: &mut W) -> Result<(), anyhow::Error>
where
    I: Iterator<Item = i16>,
    W: io::Write,
{
    let mut status = |event: &StatusEvent| info!("{}", event);
    let mut block: Vec<i16> = Vec::with_capacity(BLOCK_LEN);
    let mut octets: Vec<u8> = Vec::with_capacity(BLOCK_LEN);

    modem.enable();

    let mut input = input.peekable();
    while input.peek().is_some() {
        block.clear();
        block.extend(input.by_ref().take(BLOCK_LEN));

        octets.clear();
        modem
            .process_block(&block, &mut octets, &mut status)
            .context("modem rejected sample block")?;

        if !octets.is_empty() {
            output
                .write_all(&octets)
                .context("unable to write decoded octets")?;
            output.flush().context("unable to write decoded octets")?;
        }
    }

    modem.disable();

    Ok(())
}
