//! Key input from the controlling terminal.
//!
//! The terminal is switched out of canonical mode so single keypresses
//! arrive immediately, without echo, and with Ctrl-C delivered as an
//! ordinary byte handled like any other quit key. A detached reader thread
//! translates bytes into [`Key`] events and feeds a bounded queue that the
//! transmission loop polls between seconds.

use std::io::{self, Read};
use std::mem::MaybeUninit;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Queue depth for pending key events.
const QUEUE_DEPTH: usize = 8;

/// The error type for terminal setup.
#[derive(Error, Debug)]
pub enum InputError {
	#[error("Standard input is not a terminal")]
	NotATerminal,
	#[error("Failed to configure the terminal: {0}")]
	Termios(io::Error),
}

/// A key the operator pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
	/// Toggle the DST flag (Enter or Space).
	Ok,
	/// Stop transmitting and exit (q, Escape, or Ctrl-C).
	Back,
}

/// Source of key events for the transmission loop.
pub trait InputPoller {
	/// Wait up to `timeout` for a key. `None` means the timeout elapsed.
	fn poll(&mut self, timeout: Duration) -> Option<Key>;
}

/// Map an input byte to a key event. Unmapped bytes are dropped.
fn key_for_byte(byte: u8) -> Option<Key> {
	match byte {
		b'\r' | b'\n' | b' ' => Some(Key::Ok),
		// q, Escape, Ctrl-C
		b'q' | 0x1b | 0x03 => Some(Key::Back),
		_ => None,
	}
}

/// Guard restoring the terminal settings it replaced.
pub struct RawModeGuard {
	saved: libc::termios,
}

impl RawModeGuard {
	/// Put standard input into non-canonical mode.
	///
	/// Clears ICANON and ECHO so bytes arrive unbuffered and unechoed, and
	/// ISIG so Ctrl-C reaches the reader thread as 0x03 instead of killing
	/// the process before the carrier is shut down.
	///
	/// # Errors
	///
	/// Returns an error if standard input is not a terminal or its settings
	/// cannot be changed.
	pub fn new() -> Result<RawModeGuard, InputError> {
		// Safety: isatty only inspects the descriptor
		if unsafe { libc::isatty(libc::STDIN_FILENO) } != 1 {
			return Err(InputError::NotATerminal);
		}

		let mut termios = MaybeUninit::uninit();
		// Safety:
		// - tcgetattr does not read termios, only writes to it
		// - if tcgetattr returns zero, termios was initialized
		let saved = unsafe {
			if libc::tcgetattr(libc::STDIN_FILENO, termios.as_mut_ptr()) != 0 {
				return Err(InputError::Termios(io::Error::last_os_error()));
			}
			termios.assume_init()
		};

		let mut raw: libc::termios = saved;
		raw.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ISIG);
		raw.c_cc[libc::VMIN] = 1;
		raw.c_cc[libc::VTIME] = 0;
		// Safety: raw is a valid termios derived from the current settings
		if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) } != 0 {
			return Err(InputError::Termios(io::Error::last_os_error()));
		}

		Ok(RawModeGuard { saved })
	}
}

impl Drop for RawModeGuard {
	fn drop(&mut self) {
		// Safety: saved holds the settings captured before the switch
		unsafe {
			libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.saved);
		}
	}
}

/// Key events read from the queue fed by [`spawn_key_reader`].
pub struct ChannelPoller {
	rx: Receiver<Key>,
}

impl InputPoller for ChannelPoller {
	/// A disconnected queue reads as [`Key::Back`]: with the input source
	/// gone the operator has no other way to stop the transmitter.
	fn poll(&mut self, timeout: Duration) -> Option<Key> {
		match self.rx.recv_timeout(timeout) {
			Ok(key) => Some(key),
			Err(RecvTimeoutError::Timeout) => None,
			Err(RecvTimeoutError::Disconnected) => Some(Key::Back),
		}
	}
}

/// Start the detached thread reading keys from standard input.
///
/// The thread runs until it sees a quit key, standard input closes, or the
/// receiving side is dropped. It holds nothing needing cleanup beyond the
/// process itself.
pub fn spawn_key_reader() -> ChannelPoller {
	let (tx, rx) = sync_channel(QUEUE_DEPTH);
	thread::spawn(move || read_keys(io::stdin(), tx));
	ChannelPoller { rx }
}

fn read_keys(input: impl Read, tx: SyncSender<Key>) {
	for byte in input.bytes() {
		let Ok(byte) = byte else { break };
		if let Some(key) = key_for_byte(byte) {
			if tx.send(key).is_err() || key == Key::Back {
				break;
			}
		}
	}
	debug!("input reader stopped");
}
