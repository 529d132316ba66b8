//! Set radio-controlled clocks using simple audio output.
//!
//! This crate continuously transmits [DCF77], the German longwave time signal, through the
//! device's default audio output. This works by taking advantage of stray RF signals created by
//! audio hardware as a side effect of their operation -- the output carries a 15.5 kHz tone whose
//! fifth harmonic lands on the 77.5 kHz carrier that DCF77 receivers listen for, so the audio
//! itself is not useful as a signal.
//!
//! The transmitted time is the system clock shifted a configurable number of minutes into the
//! future. Receivers take up to a few minutes to lock on, so a clock being set ends up close to
//! the real time once it syncs.
//!
//! [DCF77]: https://en.wikipedia.org/wiki/DCF77
//!
//! # Command Line Arguments
//!
//! General form: `timespoof [options...]`
//!
//! All arguments are optional:
//!
//! | Short form | Long form  | Argument       | Default | Description                        |
//! | ---------- | ---------- | -------------- | ------- | ---------------------------------- |
//! | `-o`       | `--offset` | Signed integer | 5       | Minutes added to the system clock  |
//! |            | `--cet`    |                |         | Start with the DST flag off (CET)  |
//!
//! # Controls
//!
//! While transmitting:
//!
//! | Key               | Action                                                  |
//! | ----------------- | ------------------------------------------------------- |
//! | Enter, Space      | Toggle the transmitted DST flag                         |
//! | q, Escape, Ctrl-C | Stop transmitting and exit                              |
//!
//! The DST toggle changes how the transmitted time is labeled, not its value, and takes effect
//! with the next minute frame.
//!
//! # Examples
//!
//! Transmit the system time five minutes ahead
//! ```sh
//! timespoof
//! ```
//!
//! Transmit half an hour ahead
//! ```sh
//! timespoof -o 30
//! ```
//!
//! Transmit 90 minutes behind, labeled CET
//! ```sh
//! timespoof --cet -o -90
//! ```

use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use args::{Arguments, ArgumentsError};
use carrier::{AudioCarrier, IndicatorLamp};
use clock::SpoofClock;
use encode::Dcf77Encoder;
use error::SetupError;
use input::{RawModeGuard, spawn_key_reader};
use present::TerminalPresenter;
use scheduler::Scheduler;

mod args;
mod carrier;
mod clock;
mod encode;
mod error;
mod input;
mod present;
mod scheduler;

/// Set up the clock, carrier, terminal, and display, then transmit.
///
/// Blocks until the operator stops the transmitter. Terminal settings and
/// the audio stream are restored on the way out, in reverse setup order.
///
/// # Errors
///
/// Returns a [`SetupError`] if the system clock cannot be read, the audio
/// output cannot be opened, or standard input is not a configurable
/// terminal.
fn run(args: Arguments) -> Result<ExitCode, SetupError> {
	let clock = SpoofClock::new(args.offset_minutes)?;
	let lamp = IndicatorLamp::new();
	let carrier = AudioCarrier::new(lamp.clone())?;
	let _raw = RawModeGuard::new()?;
	let poller = spawn_key_reader();
	let presenter = TerminalPresenter::new(lamp);

	info!(
		offset_minutes = args.offset_minutes,
		dst = args.dst,
		"transmitter starting"
	);

	Scheduler::new(clock, Dcf77Encoder::new(), carrier, poller, presenter, args.dst).run();

	info!("transmitter stopped");
	Ok(ExitCode::SUCCESS)
}

/// Main program entry point.
///
/// Parses input arguments and transmits until stopped. See [`crate`]
/// documentation for details.
fn main() -> ExitCode {
	let args = match Arguments::parse(std::env::args_os().skip(1)) {
		Ok(a) => a,
		Err(e) => {
			return if let ArgumentsError::Help = e {
				println!("\
Set radio-controlled clocks by transmitting DCF77 through the default audio output.

Usage: timespoof [OPTIONS]

Options:
  -o, --offset <MINUTES>  minutes added to the system clock, default 5
  --cet                   start with the DST flag off (CET)

Controls:
  Enter / Space           toggle the transmitted DST flag
  q / Escape / Ctrl-C     stop transmitting and exit

Examples:
  timespoof
  timespoof -o 30
  timespoof --cet -o -90\n");
				ExitCode::SUCCESS
			} else {
				eprintln!("{}", e);
				ExitCode::FAILURE
			}
		}
	};

	// The display owns stdout, so diagnostics go to stderr
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
		)
		.with_writer(std::io::stderr)
		.init();

	run(args)
		.inspect_err(|e| eprintln!("{}", e))
		.unwrap_or(ExitCode::FAILURE)
}
