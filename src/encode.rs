//! Minute-frame bookkeeping behind the transmission loop's encoder seam.

use dcf77::{BitSymbol, BitText, FrameRequest, MinuteFrame};

/// The frame store the transmission loop reads bits from.
///
/// [`load_minute`](MinuteEncoder::load_minute) replaces the whole frame at
/// once, so a reload during the marker second leaves no partially updated
/// bits behind for the following data seconds.
pub trait MinuteEncoder {
	/// Replace the loaded frame with one announcing `request`.
	fn load_minute(&mut self, request: FrameRequest);
	/// The symbol for `second` of the loaded frame.
	fn bit(&self, second: u8) -> BitSymbol;
	/// Display text of the loaded frame's bits 0 through `second`.
	fn prefix(&self, second: u8) -> BitText;
}

/// [`MinuteEncoder`] backed by the DCF77 codec.
pub struct Dcf77Encoder {
	frame: MinuteFrame,
}

impl Dcf77Encoder {
	/// Create an encoder holding an all-zero placeholder frame.
	pub fn new() -> Dcf77Encoder {
		Dcf77Encoder { frame: MinuteFrame::empty() }
	}
}

impl Default for Dcf77Encoder {
	fn default() -> Dcf77Encoder {
		Dcf77Encoder::new()
	}
}

impl MinuteEncoder for Dcf77Encoder {
	fn load_minute(&mut self, request: FrameRequest) {
		self.frame = MinuteFrame::encode(&request);
	}

	fn bit(&self, second: u8) -> BitSymbol {
		self.frame.bit(second)
	}

	fn prefix(&self, second: u8) -> BitText {
		self.frame.prefix(second)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use civil::CalendarTime;

	#[test]
	fn placeholder_test() {
		let encoder = Dcf77Encoder::new();
		for second in 0..59 {
			assert_eq!(encoder.bit(second), BitSymbol::Zero);
		}
		assert_eq!(encoder.bit(59), BitSymbol::Marker);
	}

	#[test]
	fn load_test() {
		let mut encoder = Dcf77Encoder::new();
		let time = CalendarTime::new(2024, 5, 26, 18, 58, 0).unwrap();

		encoder.load_minute(FrameRequest { time, dst: true });
		assert_eq!(encoder.bit(17), BitSymbol::One);
		assert_eq!(encoder.bit(18), BitSymbol::Zero);
		assert_eq!(encoder.bit(20), BitSymbol::One);

		// A reload swaps the frame wholesale
		encoder.load_minute(FrameRequest { time, dst: false });
		assert_eq!(encoder.bit(17), BitSymbol::Zero);
		assert_eq!(encoder.bit(18), BitSymbol::One);
		assert_eq!(&*encoder.prefix(20), "000000000000000000101");
	}
}
