//! Support for command line argument parsing.
//!
//! See [crate] documentation for details on command line arguments and examples.

use std::ffi::OsString;
use std::fmt::{Debug, Display};

use thiserror::Error;

/// Default transmitted-time offset, in minutes.
///
/// Receivers take up to three minutes to lock on, so running a few minutes
/// ahead lets the clock being set land close to the real time once it
/// syncs.
pub const DEFAULT_OFFSET_MINUTES: i64 = 5;

/// The error type for parsing command line arguments.
#[derive(Error)]
#[cfg_attr(test, derive(PartialEq))]
pub enum ArgumentsError {
	/// The argument was not a known option. The argument is returned as the
	/// payload of this variant.
	#[error("Unrecognized argument: {0}")]
	UnrecognizedArgument(String),
	/// Error converting an option or parameter to UTF-8. The argument index
	/// and original [`OsString`] that could not be converted are returned as
	/// the payload of this variant.
	#[error("Invalid UTF-8 in argument {0}: {1:?}")]
	InvalidUTF8(usize, OsString),
	/// The provided offset was invalid. The supplied offset argument is
	/// returned as the payload of this variant.
	#[error("Invalid offset: {0}")]
	InvalidOffset(String),
	/// The parameter for an option was not supplied. The option is returned
	/// as the payload for this variant.
	#[error("Missing parameter for option {0}")]
	MissingParameter(String),
	/// Help option (-h) was included, so print help details and exit.
	#[error("Help requested")]
	Help,
}

impl Debug for ArgumentsError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

/// Convert an argument to [`&str`].
///
/// The function takes the argument index `i`, optional argument name `a`, and
/// the argument `s`.
///
/// # Errors
///
/// Returns [`ArgumentsError::InvalidUTF8`] if the argument could not be
/// converted to UTF-8 or [`ArgumentsError::MissingParameter`] if the argument
/// is `None`.
fn arg_to_str<'a, 'b>(i: usize, a: Option<&'a str>, s: Option<&'b OsString>)
	-> Result<&'b str, ArgumentsError>
{
	match s {
		Some(v) => v.to_str().ok_or_else(|| ArgumentsError::InvalidUTF8(i, v.clone())),
		None => Err(ArgumentsError::MissingParameter(a.map(String::from).unwrap_or_default()))
	}
}

/// Parsed command line arguments.
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Arguments {
	/// Minutes added to the system clock before transmission.
	pub offset_minutes: i64,
	/// Whether the transmitted time starts out labeled as CEST.
	pub dst: bool,
}

impl Arguments {
	/// Parse command line arguments.
	///
	/// The input can be any type that implements [`Iterator`] that yields
	/// [`OsString`], though typically this would be [`std::env::args_os`].
	/// This function assumes that the application name is **not** supplied as
	/// the first item yielded by `args`, see examples for common use.
	///
	/// # Errors
	///
	/// This function can return any of the variants in [`ArgumentsError`].
	/// See that documentation for more details.
	///
	/// # Examples
	///
	/// ```
	/// let args = match Arguments::parse(std::env::args_os().skip(1)) {
	/// 	Ok(a) => a,
	/// 	Err(e) => {
	/// 		// Handle error
	/// 		panic!("{}", e);
	/// 	}
	/// };
	/// ```
	pub fn parse(mut args: impl Iterator<Item = OsString>) -> Result<Arguments, ArgumentsError>
	{
		let mut offset_minutes = DEFAULT_OFFSET_MINUTES;
		let mut dst = true;
		let mut arg = args.next();
		let mut i = 0;
		loop {
			if arg.is_none() { break; }
			match arg_to_str(i, None, arg.as_ref())? {
				n @ ("-o" | "--offset") => {
					offset_minutes = arg_to_str(i+1, Some(n), args.next().as_ref())
						.and_then(
							|v| v.parse().map_err(|_| ArgumentsError::InvalidOffset(v.to_string()))
						)?;
					// Increment because we called args.next()
					i += 1;
				},
				"--cet" => dst = false,
				"-h" => return Err(ArgumentsError::Help),
				v => return Err(ArgumentsError::UnrecognizedArgument(v.to_string()))
			}
			arg = args.next();
			// Increment because we called args.next()
			i += 1;
		}

		Ok(Arguments {
			offset_minutes,
			dst
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn arg_to_str_test() {
		let valid = OsString::from_str("test").unwrap();
		assert_eq!(
			arg_to_str(1, Some("arg"), Some(&valid)),
			Ok("test")
		);
		assert_eq!(
			arg_to_str(1, Some("arg"), None),
			Err(ArgumentsError::MissingParameter(String::from("arg")))
		);

		let invalid = unsafe { OsString::from_encoded_bytes_unchecked(vec![b't', 0xff, b's', b't']) };
		assert_eq!(
			arg_to_str(1, Some("arg"), Some(&invalid)),
			Err(ArgumentsError::InvalidUTF8(1, invalid.clone()))
		);
	}

	#[test]
	fn arguments_parse_test() {
		let args: Vec<_> = vec![
			"-o", "30",
			"--offset", "-90",
			"--cet",
			"-o", "asd",
			"extra",
			"-x",
			"-h"
		].into_iter().map(OsString::from_str).map(Result::unwrap).collect();

		assert_eq!(
			// (no arguments)
			Arguments::parse(std::iter::empty()),
			Ok(Arguments {
				offset_minutes: DEFAULT_OFFSET_MINUTES,
				dst: true
			})
		);

		assert_eq!(
			// -o 30
			Arguments::parse(args.iter().take(2).cloned()),
			Ok(Arguments {
				offset_minutes: 30,
				dst: true
			})
		);

		assert_eq!(
			// --offset -90
			Arguments::parse(args.iter().skip(2).take(2).cloned()),
			Ok(Arguments {
				offset_minutes: -90,
				dst: true
			})
		);

		assert_eq!(
			// -o 30 --cet
			Arguments::parse(args.iter().take(2).chain(args.iter().skip(4).take(1)).cloned()),
			Ok(Arguments {
				offset_minutes: 30,
				dst: false
			})
		);

		assert_eq!(
			// --cet --offset -90
			Arguments::parse(args.iter().skip(4).take(1).chain(args.iter().skip(2).take(2)).cloned()),
			Ok(Arguments {
				offset_minutes: -90,
				dst: false
			})
		);

		assert_eq!(
			// -o asd
			Arguments::parse(args.iter().skip(5).take(2).cloned()),
			Err(ArgumentsError::InvalidOffset(String::from("asd")))
		);

		assert_eq!(
			// -o
			Arguments::parse(args.iter().take(1).cloned()),
			Err(ArgumentsError::MissingParameter(String::from("-o")))
		);

		assert_eq!(
			// extra
			Arguments::parse(args.iter().skip(7).take(1).cloned()),
			Err(ArgumentsError::UnrecognizedArgument(String::from("extra")))
		);

		assert_eq!(
			// -x
			Arguments::parse(args.iter().skip(8).take(1).cloned()),
			Err(ArgumentsError::UnrecognizedArgument(String::from("-x")))
		);

		assert_eq!(
			// -o 30 -h
			Arguments::parse(args.iter().take(2).chain(args.iter().skip(9).take(1)).cloned()),
			Err(ArgumentsError::Help)
		);

		let invalid = unsafe { OsString::from_encoded_bytes_unchecked(vec![0xff]) };
		assert_eq!(
			Arguments::parse([invalid.clone()].into_iter()),
			Err(ArgumentsError::InvalidUTF8(0, invalid))
		);
	}
}
