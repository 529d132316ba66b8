//! Encoding of the DCF77 amplitude-modulated minute frame.
//!
//! A DCF77 minute carries 59 data bits, one per second, followed by a silent
//! marker second that lets receivers find the minute boundary. Each data bit
//! is signaled by dropping the carrier at the start of its second: 100 ms for
//! a zero, 200 ms for a one. This crate computes the bit content of a minute;
//! shaping the carrier is the transmitter's job.
//!
//! See the [DCF77 documentation](https://en.wikipedia.org/wiki/DCF77#Time_code_details)
//! for the full bit layout. In short: bits 0-19 are flags (here only the
//! CEST/CET bits 17/18 and the always-one start-of-time bit 20 carry
//! information), bits 21-28 the minute, 29-35 the hour, 36-58 the date, each
//! group BCD-coded with even parity.
//!
//! # Examples
//!
//! ```
//! # use dcf77::{BitSymbol, FrameRequest, MinuteFrame};
//! # use civil::CalendarTime;
//! // Sunday, May 26, 2024. 18:58 CEST.
//! let request = FrameRequest {
//! 	time: CalendarTime::new(2024, 5, 26, 18, 58, 0).unwrap(),
//! 	dst: true,
//! };
//! let frame = MinuteFrame::encode(&request);
//! assert_eq!(frame.bit(17), BitSymbol::One);   // CEST in effect
//! assert_eq!(frame.bit(20), BitSymbol::One);   // start of encoded time
//! assert_eq!(frame.bit(59), BitSymbol::Marker);
//! ```

#![no_std]

use civil::CalendarTime;

/// The silent second marking the minute boundary.
pub const MARKER_SECOND: u8 = 59;

/// What the transmitter does with one second of the minute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitSymbol {
	/// Data bit zero: 100 ms carrier dropout.
	Zero,
	/// Data bit one: 200 ms carrier dropout.
	One,
	/// Minute marker: the carrier stays on for the whole second.
	Marker,
}

/// The civil minute a frame should announce, with its DST flag.
///
/// The `second` field of `time` is ignored; a frame names a minute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRequest {
	pub time: CalendarTime,
	pub dst: bool,
}

/// One minute of DCF77 data, packed LSB first.
///
/// Bit `n` of the packed value is the symbol for second `n`. The five MSBs
/// are unused; second 59 is the marker and has no data bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinuteFrame {
	bits: u64,
}

impl MinuteFrame {
	/// A frame with every data bit zero.
	///
	/// No real minute encodes to this (bit 20 is always one), so it only
	/// serves as a placeholder before the first [`MinuteFrame::encode`].
	pub const fn empty() -> MinuteFrame {
		MinuteFrame { bits: 0 }
	}

	/// Encode the frame announcing `request`.
	///
	/// The DST-change (16) and leap-second (19) announcement bits stay zero:
	/// a manually toggled DST flag knows nothing about an upcoming switch,
	/// and announcing one would be acted on by receivers.
	pub fn encode(request: &FrameRequest) -> MinuteFrame {
		let t = &request.time;
		let min = to_bcd(t.minute);
		let hour = to_bcd(t.hour);
		let date = to_bcd(t.day) as u32
			| (t.weekday.iso_number() as u32) << 6
			| (to_bcd(t.month) as u32) << 9
			| (to_bcd((t.year % 100) as u8) as u32) << 14;

		// Bit 20 always set to 1, indicates the start of encoded time.
		// DCF77 uses even parity over the minute, hour, and date groups.
		let mut bits: u64 = 0x100000;
		bits |= if request.dst { 0x1 << 17 } else { 0x1 << 18 };
		bits |= (min as u64) << 21;
		bits |= parity(min as u32) << 28;
		bits |= (hour as u64) << 29;
		bits |= parity(hour as u32) << 35;
		bits |= (date as u64) << 36;
		bits |= parity(date) << 58;
		MinuteFrame { bits }
	}

	/// The symbol to transmit during `second` of the minute.
	///
	/// Seconds at or past [`MARKER_SECOND`] return [`BitSymbol::Marker`].
	pub const fn bit(&self, second: u8) -> BitSymbol {
		if second >= MARKER_SECOND {
			BitSymbol::Marker
		} else if (self.bits >> second) & 1 > 0 {
			BitSymbol::One
		} else {
			BitSymbol::Zero
		}
	}

	/// The '0'/'1' text of bits 0 through `second`, for display.
	///
	/// `second` is clamped to the last data bit (58); the marker second adds
	/// no character.
	pub fn prefix(&self, second: u8) -> BitText {
		let end = second.min(MARKER_SECOND - 1) as usize;
		let mut buf = [0u8; MARKER_SECOND as usize];
		for (i, b) in buf[..=end].iter_mut().enumerate() {
			*b = b'0' + ((self.bits >> i) & 1) as u8;
		}
		BitText { buf, len: end + 1 }
	}

	/// Raw packed bits, LSB = second 0.
	pub const fn packed(&self) -> u64 {
		self.bits
	}
}

/// Owned ASCII rendition of a frame prefix, from [`MinuteFrame::prefix`].
///
/// Dereferences to `str` so it can be handed around like a borrowed string
/// without allocating.
#[derive(Clone, Copy)]
pub struct BitText {
	buf: [u8; MARKER_SECOND as usize],
	len: usize,
}

impl BitText {
	pub fn as_str(&self) -> &str {
		// Safety: buf[..len] is only ever filled with ASCII '0' and '1'
		unsafe { core::str::from_utf8_unchecked(&self.buf[..self.len]) }
	}
}

impl core::ops::Deref for BitText {
	type Target = str;

	fn deref(&self) -> &str {
		self.as_str()
	}
}

/// Two-digit BCD: ones in the low nibble, tens in the high nibble.
#[inline(always)]
const fn to_bcd(value: u8) -> u8 {
	(value % 10) | ((value / 10) << 4)
}

/// Even parity bit over `value`.
#[inline(always)]
const fn parity(value: u32) -> u64 {
	(value.count_ones() & 0x1) as u64
}
