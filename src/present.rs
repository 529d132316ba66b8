//! Terminal display of the transmitted time.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;

use civil::CalendarTime;

use crate::carrier::IndicatorLamp;

/// Display surface refreshed by the transmission loop.
pub trait Presenter {
	/// Redraw with the displayed time, the DST flag, and the bits sent so
	/// far this minute (`None` during the marker second).
	fn render(&mut self, time: &CalendarTime, dst: bool, bits: Option<&str>);
}

/// ANSI terminal renderer.
///
/// Takes over the screen and hides the cursor while alive; both are
/// restored on drop. Write errors are ignored: a broken display is not a
/// reason to stop transmitting.
pub struct TerminalPresenter {
	out: io::Stdout,
	lamp: Arc<IndicatorLamp>,
}

impl TerminalPresenter {
	pub fn new(lamp: Arc<IndicatorLamp>) -> TerminalPresenter {
		let out = io::stdout();
		{
			let mut out = out.lock();
			out.write_all(b"\x1b[2J\x1b[H\x1b[?25l").ok();
			out.flush().ok();
		}
		TerminalPresenter { out, lamp }
	}
}

impl Presenter for TerminalPresenter {
	fn render(&mut self, time: &CalendarTime, dst: bool, bits: Option<&str>) {
		let frame = compose(time, dst, bits, self.lamp.is_on());
		let mut out = self.out.lock();
		out.write_all(frame.as_bytes()).ok();
		out.flush().ok();
	}
}

impl Drop for TerminalPresenter {
	fn drop(&mut self) {
		let mut out = self.out.lock();
		out.write_all(b"\x1b[?25h\x1b[5;1H").ok();
		out.flush().ok();
	}
}

/// Compose one full redraw.
///
/// Three lines from the top of the screen: the clock with the transmit
/// marker, the date with the zone label, and the bits sent so far. Each
/// line erases its own tail so shrinking content leaves no residue.
fn compose(time: &CalendarTime, dst: bool, bits: Option<&str>, transmitting: bool) -> String {
	let mut s = String::with_capacity(160);
	let _ = write!(
		s,
		"\x1b[H  {:02}:{:02}:{:02}  {}\x1b[K\n",
		time.hour,
		time.minute,
		time.second,
		if transmitting { "TX" } else { "" }
	);
	let _ = write!(
		s,
		"  {} {:04}-{:02}-{:02} {}\x1b[K\n",
		time.weekday.abbrev(),
		time.year,
		time.month,
		time.day,
		if dst { "CEST" } else { "CET" }
	);
	let _ = write!(s, "  {}\x1b[K\n", bits.unwrap_or(""));
	s
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compose_test() {
		let time = CalendarTime::new(2024, 5, 26, 9, 5, 7).unwrap();

		let s = compose(&time, true, Some("10001"), true);
		assert!(s.contains("09:05:07"));
		assert!(s.contains("TX"));
		assert!(s.contains("Sun 2024-05-26 CEST"));
		assert!(s.contains("10001"));

		let s = compose(&time, false, Some("10001"), false);
		assert!(s.contains("CET"));
		assert!(!s.contains("CEST"));
		assert!(!s.contains("TX"));
	}

	#[test]
	fn compose_marker_test() {
		let time = CalendarTime::new(2024, 5, 26, 9, 5, 59).unwrap();
		let s = compose(&time, false, None, true);
		assert!(s.contains("09:05:59"));
		// The bits line is blank during the marker second
		assert!(s.ends_with("  \x1b[K\n"));
	}
}
