//! Civil (Gregorian) date-time handling, unaware of timezones.
//!
//! This crate converts between Unix timestamps and broken-down civil time
//! without going through libc's `mktime`/`gmtime`, so every function here is
//! thread safe and available in `no_std` builds. Timestamps before the Unix
//! epoch are unsupported and convert to `None`.
//!
//! If the `now` feature is enabled, [`now`] reads the realtime clock with
//! whole-second granularity.
//!
//! # Examples
//!
//! ```
//! # use civil::{CalendarTime, Weekday};
//! let date = CalendarTime::from_unix(1718617807).unwrap();
//! assert_eq!(date, CalendarTime {
//! 	year: 2024,
//! 	month: 6,
//! 	day: 17,
//! 	weekday: Weekday::Monday,
//! 	hour: 9,
//! 	minute: 50,
//! 	second: 7
//! });
//! assert_eq!(date.to_unix(), 1718617807);
//! ```

#![no_std]

#[cfg(feature = "now")]
use core::mem::MaybeUninit;
#[cfg(feature = "now")]
use libc::{timespec, clock_gettime, CLOCK_REALTIME};

/// Seconds per minute.
const SECONDS_PER_MINUTE: i64 = 60;
/// Seconds per hour.
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
/// Seconds per day.
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
/// Days per 400-year Gregorian cycle (97 leap days).
const DAYS_PER_ERA: i64 = 146097;
/// Days from Mar 1, year 0 to Jan 1, 1970 in the proleptic Gregorian calendar.
const DAYS_TO_EPOCH: i64 = 719468;

/// Day of the week.
///
/// The discriminants run Monday through Sunday so that [`Weekday::iso_number`]
/// is a trivial offset. Every day maps to a variant; there is no invalid or
/// unknown day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weekday {
	Monday,
	Tuesday,
	Wednesday,
	Thursday,
	Friday,
	Saturday,
	Sunday,
}

impl Weekday {
	/// All days, in ISO order.
	const ALL: [Weekday; 7] = [
		Weekday::Monday,
		Weekday::Tuesday,
		Weekday::Wednesday,
		Weekday::Thursday,
		Weekday::Friday,
		Weekday::Saturday,
		Weekday::Sunday,
	];

	/// The ISO 8601 day number, Monday = 1 through Sunday = 7.
	///
	/// This is also the day numbering used by the DCF77 time code.
	#[inline(always)]
	pub const fn iso_number(self) -> u8 {
		self as u8 + 1
	}

	/// Three-letter English abbreviation.
	pub const fn abbrev(self) -> &'static str {
		match self {
			Weekday::Monday => "Mon",
			Weekday::Tuesday => "Tue",
			Weekday::Wednesday => "Wed",
			Weekday::Thursday => "Thu",
			Weekday::Friday => "Fri",
			Weekday::Saturday => "Sat",
			Weekday::Sunday => "Sun",
		}
	}

	/// The weekday falling `days` days after the Unix epoch.
	///
	/// `days` must be non-negative. Jan 1, 1970 was a Thursday.
	#[inline(always)]
	fn from_days_since_epoch(days: i64) -> Weekday {
		Weekday::ALL[((days + 3) % 7) as usize]
	}
}

/// Civil date and time, second granularity.
///
/// A value constructed by [`CalendarTime::from_unix`] or [`CalendarTime::new`]
/// is always internally consistent: the date exists in the Gregorian calendar,
/// `weekday` matches the date, and the time fields are in range. Construct
/// values through those functions rather than struct literals to keep that
/// property.
///
/// # Examples
///
/// ```
/// # use civil::{CalendarTime, Weekday};
/// let date = CalendarTime::new(2024, 5, 26, 16, 57, 25).unwrap();
/// assert_eq!(date.weekday, Weekday::Sunday);
/// assert_eq!(date.to_unix(), 1716742645);
/// assert_eq!(CalendarTime::from_unix(1716742645), Some(date));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarTime {
	/// Absolute Gregorian year, ranged [1970, 65535]
	pub year: u16,
	/// Month of the year, ranged [1, 12]
	pub month: u8,
	/// Day of the month, ranged [1, 31]
	pub day: u8,
	/// Day of the week implied by the date fields
	pub weekday: Weekday,
	/// Hours, ranged [0, 23]
	pub hour: u8,
	/// Minutes, ranged [0, 59]
	pub minute: u8,
	/// Seconds, ranged [0, 59]
	pub second: u8,
}

impl CalendarTime {
	/// Midnight, Jan 1, 1970.
	pub const UNIX_EPOCH: CalendarTime = CalendarTime {
		year: 1970,
		month: 1,
		day: 1,
		weekday: Weekday::Thursday,
		hour: 0,
		minute: 0,
		second: 0,
	};

	/// Convert a Unix timestamp into civil time.
	///
	/// Returns `None` for timestamps before the epoch or past the supported
	/// year range.
	pub fn from_unix(timestamp: i64) -> Option<CalendarTime> {
		// The Gregorian calendar repeats every 400 years. Rotating the year to
		// run Mar-Feb puts the leap day last, after which day-of-era converts
		// to year/month/day with pure integer math. The divisors 1460, 36524
		// and 146096 strip the leap days accumulated every 4, 100 and 400
		// years. See:
		// http://howardhinnant.github.io/date_algorithms.html#civil_from_days
		if timestamp < 0 {
			return None;
		}
		let days = timestamp / SECONDS_PER_DAY;
		let rem = timestamp % SECONDS_PER_DAY;
		let z = days + DAYS_TO_EPOCH;
		let era = z / DAYS_PER_ERA;
		let doe = z % DAYS_PER_ERA;
		let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
		let leap = yoe / 4 - yoe / 100;
		let doy = doe - (365 * yoe + leap);
		// Linear month/day equations over the rotated Mar-Feb year
		let mp = (5 * doy + 2) / 153;
		let d = doy - (153 * mp + 2) / 5 + 1;
		let (month, year) = if mp < 10 {
			(mp + 3, yoe + era * 400)
		} else {
			(mp - 9, yoe + era * 400 + 1)
		};
		if year > u16::MAX as i64 {
			return None;
		}

		Some(CalendarTime {
			year: year as u16,
			month: month as u8,
			day: d as u8,
			weekday: Weekday::from_days_since_epoch(days),
			hour: (rem / SECONDS_PER_HOUR) as u8,
			minute: (rem % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as u8,
			second: (rem % SECONDS_PER_MINUTE) as u8,
		})
	}

	/// Build a civil time from its date and time fields, computing the
	/// weekday.
	///
	/// Returns `None` if the fields do not name a real instant on or after
	/// the epoch (e.g. month 13, Feb 30, hour 24, year 1969).
	pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8)
		-> Option<CalendarTime>
	{
		if year < 1970
			|| month < 1 || month > 12
			|| day < 1 || day > days_per_month(year, month)
			|| hour > 23 || minute > 59 || second > 59
		{
			return None;
		}
		let days = days_from_civil(year as i64, month as i64, day as i64);
		Some(CalendarTime {
			year,
			month,
			day,
			weekday: Weekday::from_days_since_epoch(days),
			hour,
			minute,
			second,
		})
	}

	/// Convert back to a Unix timestamp.
	///
	/// Total for values holding the documented field invariants.
	pub fn to_unix(&self) -> i64 {
		days_from_civil(self.year as i64, self.month as i64, self.day as i64) * SECONDS_PER_DAY
			+ self.hour as i64 * SECONDS_PER_HOUR
			+ self.minute as i64 * SECONDS_PER_MINUTE
			+ self.second as i64
	}

	/// The civil time `seconds` seconds after `self` (or before, if
	/// negative).
	///
	/// Returns `None` if the result leaves the supported range.
	///
	/// # Examples
	///
	/// ```
	/// # use civil::CalendarTime;
	/// let t = CalendarTime::new(2024, 12, 31, 23, 59, 30).unwrap();
	/// let u = t.plus_seconds(60).unwrap();
	/// assert_eq!((u.year, u.month, u.day, u.hour, u.minute, u.second),
	///            (2025, 1, 1, 0, 0, 30));
	/// ```
	pub fn plus_seconds(&self, seconds: i64) -> Option<CalendarTime> {
		CalendarTime::from_unix(self.to_unix().checked_add(seconds)?)
	}

	/// Check whether `self` falls in a leap year.
	#[inline(always)]
	pub fn is_leap_year(&self) -> bool {
		is_leap_year(self.year)
	}
}

/// Days since the Unix epoch for a given year, month, and day.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
	// Inverse of the rotation in from_unix, more details:
	// http://howardhinnant.github.io/date_algorithms.html#days_from_civil
	let y = if month < 3 { year - 1 } else { year };
	let era = y / 400;
	let yoe = y - era * 400;
	let m = if month > 2 { month - 3 } else { month + 9 };
	let doy = (153 * m + 2) / 5 + day - 1;
	let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
	era * DAYS_PER_ERA + doe - DAYS_TO_EPOCH
}

/// Check whether a given absolute Gregorian `year` is a leap year.
///
/// # Examples
///
/// ```
/// # use civil::is_leap_year;
/// assert_eq!(is_leap_year(1900), false);
/// assert_eq!(is_leap_year(2000), true);
/// assert_eq!(is_leap_year(2024), true);
/// assert_eq!(is_leap_year(2025), false);
/// ```
#[inline(always)]
pub fn is_leap_year(year: u16) -> bool {
	let l = if year % 100 != 0 { 3 } else { 15 };
	(year & l) == 0
}

/// The number of days in a given month of a given absolute Gregorian year.
pub fn days_per_month(year: u16, month: u8) -> u8 {
	if month == 2 {
		if is_leap_year(year) { 29 } else { 28 }
	} else {
		30 | (month ^ (month >> 3))
	}
}

/// Get the current Unix timestamp, whole seconds.
///
/// Returns `None` if `libc::clock_gettime` fails.
///
/// # Examples
///
/// ```
/// # use civil::now;
/// let t = now().expect("Failed to get current time");
/// assert!(t > 0);
/// ```
#[cfg(feature = "now")]
pub fn now() -> Option<i64> {
	let mut time = MaybeUninit::<timespec>::uninit();
	// Safety:
	// - clock_gettime does not read time, only writes
	// - if clock_gettime returns zero, time is successfully initialized
	unsafe {
		match clock_gettime(CLOCK_REALTIME, time.as_mut_ptr()) {
			0 => Some(time.assume_init().tv_sec),
			_ => None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::mem::MaybeUninit;
	use libc::{time_t, tm};

	// Get the libc version of UTC calendar time
	fn utc_time(time: time_t) -> tm {
		unsafe {
			let mut utc = MaybeUninit::<tm>::uninit();
			libc::gmtime_r(&time, utc.as_mut_ptr());
			utc.assume_init()
		}
	}

	fn compare_dates(time: i64) {
		let d1 = utc_time(time);
		let d2 = CalendarTime::from_unix(time).unwrap();
		assert_eq!(d1.tm_year + 1900, d2.year as i32, "time: {}", time);
		assert_eq!(d1.tm_mon + 1, d2.month as i32, "time: {}", time);
		assert_eq!(d1.tm_mday, d2.day as i32, "time: {}", time);
		assert_eq!(d1.tm_hour, d2.hour as i32, "time: {}", time);
		assert_eq!(d1.tm_min, d2.minute as i32, "time: {}", time);
		assert_eq!(d1.tm_sec, d2.second as i32, "time: {}", time);
		// libc counts Sunday as 0, ISO counts it as 7
		assert_eq!(d1.tm_wday, (d2.weekday.iso_number() % 7) as i32, "time: {}", time);
	}

	#[test]
	fn from_unix_test() {
		assert!(CalendarTime::from_unix(-1).is_none());
		assert!(CalendarTime::from_unix(i64::MIN).is_none());
		assert!(CalendarTime::from_unix(i64::MAX).is_none());
		compare_dates(0);
		compare_dates(5097600);
		compare_dates(31449600);
		compare_dates(94694400);
		compare_dates(951782400);   // Feb 29, 2000
		compare_dates(1709164800);  // Feb 29, 2024
		compare_dates(1718617807);
		compare_dates(1716742645);
		compare_dates(1844848207);
		compare_dates(4107542399);  // Feb 28, 2100 23:59:59, non-leap century
	}

	#[test]
	fn round_trip_test() {
		assert_eq!(CalendarTime::from_unix(0), Some(CalendarTime::UNIX_EPOCH));
		for &t in &[0, 1, 86399, 86400, 951782400, 1716742645, 1718617807, 4107542399] {
			assert_eq!(CalendarTime::from_unix(t).unwrap().to_unix(), t);
		}
	}

	#[test]
	fn new_test() {
		let t = CalendarTime::new(2024, 1, 1, 0, 0, 0).unwrap();
		assert_eq!(t.weekday, Weekday::Monday);
		assert_eq!(t.to_unix(), 1704067200);
		let t = CalendarTime::new(2024, 2, 29, 0, 0, 0).unwrap();
		assert_eq!(t.weekday, Weekday::Thursday);
		assert_eq!(t.to_unix(), 1709164800);
		let t = CalendarTime::new(2024, 10, 27, 0, 0, 0).unwrap();
		assert_eq!(t.weekday, Weekday::Sunday);
		assert_eq!(t.to_unix(), 1729987200);

		assert!(CalendarTime::new(1969, 12, 31, 23, 59, 59).is_none());
		assert!(CalendarTime::new(2024, 0, 1, 0, 0, 0).is_none());
		assert!(CalendarTime::new(2024, 13, 1, 0, 0, 0).is_none());
		assert!(CalendarTime::new(2024, 2, 30, 0, 0, 0).is_none());
		assert!(CalendarTime::new(2023, 2, 29, 0, 0, 0).is_none());
		assert!(CalendarTime::new(2024, 1, 0, 0, 0, 0).is_none());
		assert!(CalendarTime::new(2024, 1, 1, 24, 0, 0).is_none());
		assert!(CalendarTime::new(2024, 1, 1, 0, 60, 0).is_none());
		assert!(CalendarTime::new(2024, 1, 1, 0, 0, 60).is_none());
	}

	#[test]
	fn plus_seconds_test() {
		let t = CalendarTime::new(2024, 5, 26, 16, 57, 25).unwrap();
		assert_eq!(t.plus_seconds(0), Some(t));
		assert_eq!(t.plus_seconds(60), CalendarTime::new(2024, 5, 26, 16, 58, 25));
		assert_eq!(t.plus_seconds(-86400), CalendarTime::new(2024, 5, 25, 16, 57, 25));

		// Rollover across midnight and a year boundary
		let t = CalendarTime::new(2024, 12, 31, 23, 59, 30).unwrap();
		assert_eq!(t.plus_seconds(61), CalendarTime::new(2025, 1, 1, 0, 0, 31));

		// Out of range in either direction
		assert!(CalendarTime::UNIX_EPOCH.plus_seconds(-1).is_none());
		assert!(CalendarTime::UNIX_EPOCH.plus_seconds(i64::MAX).is_none());
		assert!(t.plus_seconds(i64::MAX).is_none());
	}

	#[test]
	fn weekday_test() {
		assert_eq!(Weekday::Monday.iso_number(), 1);
		assert_eq!(Weekday::Sunday.iso_number(), 7);
		assert_eq!(Weekday::Monday.abbrev(), "Mon");
		assert_eq!(Weekday::Sunday.abbrev(), "Sun");
		assert_eq!(Weekday::from_days_since_epoch(0), Weekday::Thursday);
		assert_eq!(Weekday::from_days_since_epoch(4), Weekday::Monday);
	}

	#[test]
	fn is_leap_year_test() {
		assert_eq!(is_leap_year(1900), false);
		assert_eq!(is_leap_year(2000), true);
		assert_eq!(is_leap_year(2020), true);
		assert_eq!(is_leap_year(2023), false);
		assert_eq!(is_leap_year(2024), true);

		// Make sure extreme inputs cannot panic
		is_leap_year(0);
		is_leap_year(u16::MAX);
	}

	#[test]
	fn days_per_month_test() {
		assert_eq!(days_per_month(2024, 1), 31);
		assert_eq!(days_per_month(2024, 2), 29);
		assert_eq!(days_per_month(2023, 2), 28);
		assert_eq!(days_per_month(2024, 4), 30);
		assert_eq!(days_per_month(2024, 9), 30);
		assert_eq!(days_per_month(2024, 12), 31);
	}
}
