//! Clock services for the transmission loop.

use std::thread;
use std::time::{Duration, Instant};

use civil::CalendarTime;
use thiserror::Error;

/// The error type for clock setup.
#[derive(Error, Debug)]
pub enum ClockError {
	/// The realtime clock could not be read.
	#[error("Failed to read the system clock")]
	Unavailable,
	/// The offset pushes the current time outside the representable range.
	#[error("System time out of range with an offset of {0} minutes")]
	OutOfRange(i64),
}

/// Time services used by the transmission loop.
///
/// [`sample`](ClockSource::sample) is the civil time to show and transmit;
/// [`ticks_ms`](ClockSource::ticks_ms) and [`delay_ms`](ClockSource::delay_ms)
/// are a monotonic millisecond clock and a blocking sleep. Grouping the three
/// behind one trait keeps simulated time consistent when tests drive the
/// loop.
pub trait ClockSource {
	/// The civil time to display and transmit right now.
	fn sample(&self) -> CalendarTime;
	/// Milliseconds since an arbitrary fixed origin.
	fn ticks_ms(&self) -> u64;
	/// Block the calling thread for `ms` milliseconds.
	fn delay_ms(&self, ms: u64);
}

/// The realtime clock shifted by a fixed offset.
///
/// The offset is what makes the transmitted time a spoof: receivers get the
/// hardware clock plus the configured number of minutes.
pub struct SpoofClock {
	/// Offset added to the hardware clock, in seconds.
	offset: i64,
	/// Origin for [`ClockSource::ticks_ms`].
	origin: Instant,
}

impl SpoofClock {
	/// Create a clock adding `offset_minutes` to the hardware time.
	///
	/// # Errors
	///
	/// Returns [`ClockError::Unavailable`] if the system clock cannot be
	/// read, or [`ClockError::OutOfRange`] if the shifted time cannot be
	/// represented. Both are checked once here so the sampling path stays
	/// infallible.
	pub fn new(offset_minutes: i64) -> Result<SpoofClock, ClockError> {
		let offset = offset_minutes
			.checked_mul(60)
			.ok_or(ClockError::OutOfRange(offset_minutes))?;
		let now = civil::now().ok_or(ClockError::Unavailable)?;
		shifted(now, offset).ok_or(ClockError::OutOfRange(offset_minutes))?;
		Ok(SpoofClock { offset, origin: Instant::now() })
	}
}

impl ClockSource for SpoofClock {
	fn sample(&self) -> CalendarTime {
		// Validated at construction; a failure here means the system clock
		// broke mid-run. Show the epoch rather than panic with the carrier
		// live.
		civil::now()
			.and_then(|now| shifted(now, self.offset))
			.unwrap_or(CalendarTime::UNIX_EPOCH)
	}

	fn ticks_ms(&self) -> u64 {
		self.origin.elapsed().as_millis() as u64
	}

	fn delay_ms(&self, ms: u64) {
		thread::sleep(Duration::from_millis(ms));
	}
}

/// Civil time for hardware timestamp `now` shifted by `offset` seconds.
fn shifted(now: i64, offset: i64) -> Option<CalendarTime> {
	CalendarTime::from_unix(now.checked_add(offset)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shifted_test() {
		// A +5 minute offset shows 12:05:00 for a 12:00:00 hardware clock
		let hardware = CalendarTime::new(2024, 5, 26, 12, 0, 0).unwrap();
		let display = shifted(hardware.to_unix(), 5 * 60).unwrap();
		assert_eq!(display, CalendarTime::new(2024, 5, 26, 12, 5, 0).unwrap());

		// Negative offsets work too
		let display = shifted(hardware.to_unix(), -30 * 60).unwrap();
		assert_eq!(display, CalendarTime::new(2024, 5, 26, 11, 30, 0).unwrap());

		assert!(shifted(0, -1).is_none());
		assert!(shifted(1, i64::MAX).is_none());
	}

	#[test]
	fn spoof_clock_test() {
		assert!(matches!(
			SpoofClock::new(i64::MAX),
			Err(ClockError::OutOfRange(_))
		));

		let clock = SpoofClock::new(5).unwrap();
		assert!(clock.sample().year >= 2024);

		let a = clock.ticks_ms();
		clock.delay_ms(1);
		assert!(clock.ticks_ms() >= a);
	}
}
