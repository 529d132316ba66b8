//! Setup errors for the transmitter binary.

use thiserror::Error;

use crate::carrier::CarrierError;
use crate::clock::ClockError;
use crate::input::InputError;

/// Any error that can stop the transmitter before it starts.
///
/// Everything here happens during setup; once the transmission loop is
/// running the only fault left is the audio stream, which panics instead.
#[derive(Error, Debug)]
pub enum SetupError {
	#[error(transparent)]
	Clock(#[from] ClockError),
	#[error(transparent)]
	Carrier(#[from] CarrierError),
	#[error(transparent)]
	Input(#[from] InputError),
}
