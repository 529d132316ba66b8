//! Carrier output through the default audio device.
//!
//! Receivers listen at 77.5 kHz, far above what audio hardware can emit
//! directly. The output stage synthesizes a 15.5 kHz tone instead; commodity
//! DACs and wiring radiate enough of its fifth harmonic at 77.5 kHz for a
//! receiver held close to the speaker cable to lock on.
//!
//! The stream runs for the whole process lifetime. Starting and stopping the
//! carrier flips shared state that the audio callback reads once per buffer,
//! so envelope edges are quantized to the buffer period (about 21 ms at
//! 48 kHz / 1024 samples). Receivers integrate the dropout over the second
//! and decode fine at that resolution.

use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cpal::Sample;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tracing::debug;

/// Audio sample rate (Hz).
const SAMPLE_RATE: u32 = 48000;
/// Samples per audio buffer.
const BUFFER_SIZE: u32 = 1024;
/// The emitted tone is the carrier frequency divided by this; the radiated
/// harmonic lands back on the carrier.
const HARMONIC: u32 = 5;

/// The error type for audio setup.
#[derive(Error, Debug)]
pub enum CarrierError {
	#[error("Failed to get default audio output device")]
	NoOutputDevice,
	#[error("Failed to open audio stream: {0}")]
	BuildStream(#[from] cpal::BuildStreamError),
	#[error("Failed to start audio stream: {0}")]
	PlayStream(#[from] cpal::PlayStreamError),
}

/// Transmit indicator shared between the carrier driver and the display.
///
/// Stands in for the transmit LED of dedicated transmitter hardware.
pub struct IndicatorLamp(AtomicBool);

impl IndicatorLamp {
	pub fn new() -> Arc<IndicatorLamp> {
		Arc::new(IndicatorLamp(AtomicBool::new(false)))
	}

	pub fn set(&self, on: bool) {
		self.0.store(on, Ordering::Relaxed);
	}

	pub fn is_on(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

/// Controls the carrier.
///
/// The transmission loop calls [`start`](CarrierDriver::start) and
/// [`stop`](CarrierDriver::stop) up to once each per second for the whole
/// run; implementations must treat them as cheap state flips. Faults after
/// setup are fatal and not surfaced through this trait.
pub trait CarrierDriver {
	/// Begin emitting the carrier at `frequency_hz` with the given duty
	/// cycle.
	fn start(&mut self, frequency_hz: u32, duty_cycle: f32);
	/// Cut the carrier to silence.
	fn stop(&mut self);
	/// Drive the transmit indicator.
	fn set_indicator(&mut self, on: bool);
}

/// Shared state the audio callback reads once per buffer.
struct Gate {
	on: AtomicBool,
	/// Carrier frequency (Hz); the callback divides by [`HARMONIC`].
	frequency: AtomicU32,
}

/// [`CarrierDriver`] over the default audio output device.
pub struct AudioCarrier {
	gate: Arc<Gate>,
	lamp: Arc<IndicatorLamp>,
	/// Keeps the stream alive; playback stops when dropped.
	_stream: cpal::Stream,
}

impl AudioCarrier {
	/// Open and start the output stream, initially silent.
	///
	/// # Errors
	///
	/// Returns an error if there is no default output device or the stream
	/// cannot be opened or started.
	pub fn new(lamp: Arc<IndicatorLamp>) -> Result<AudioCarrier, CarrierError> {
		let host = cpal::default_host();
		let device = host
			.default_output_device()
			.ok_or(CarrierError::NoOutputDevice)?;
		if let Ok(name) = device.name() {
			debug!(device = name.as_str(), "opened audio output");
		}
		let config = cpal::StreamConfig {
			channels: 1,
			sample_rate: cpal::SampleRate(SAMPLE_RATE),
			buffer_size: cpal::BufferSize::Fixed(BUFFER_SIZE),
		};
		let gate = Arc::new(Gate {
			on: AtomicBool::new(false),
			frequency: AtomicU32::new(0),
		});
		let mut tone = make_tone(gate.clone());
		let stream = device.build_output_stream(
			&config,
			move |data: &mut [f32], _: &cpal::OutputCallbackInfo| tone(data),
			audio_error,
			None,
		)?;
		stream.play()?;
		Ok(AudioCarrier { gate, lamp, _stream: stream })
	}
}

impl CarrierDriver for AudioCarrier {
	/// `duty_cycle` shapes square-wave drivers; a sine output ignores it.
	fn start(&mut self, frequency_hz: u32, _duty_cycle: f32) {
		self.gate.frequency.store(frequency_hz, Ordering::Relaxed);
		self.gate.on.store(true, Ordering::Release);
	}

	fn stop(&mut self) {
		self.gate.on.store(false, Ordering::Release);
	}

	fn set_indicator(&mut self, on: bool) {
		self.lamp.set(on);
	}
}

/// Make the synthesizer writing the gated tone into sample buffers.
///
/// The tone restarts at zero phase on every off to on transition, matching
/// the per-second carrier restart of a hardware transmitter. The sample
/// position wraps at one second; 15500 is a whole number of cycles per
/// second, so the wrap is seamless.
fn make_tone(gate: Arc<Gate>) -> impl FnMut(&mut [f32]) + Send + 'static {
	let mut i: u64 = 0;
	let mut was_on = false;
	move |data: &mut [f32]| {
		let on = gate.on.load(Ordering::Acquire);
		if on && !was_on {
			i = 0;
		}
		was_on = on;
		if !on {
			data.iter_mut().for_each(|v| *v = f32::EQUILIBRIUM);
			return;
		}
		let tone = (gate.frequency.load(Ordering::Relaxed) / HARMONIC) as f32;
		for sample in data.iter_mut() {
			let pos = (i % SAMPLE_RATE as u64) as f32 / SAMPLE_RATE as f32;
			*sample = f32::sin(PI * 2. * tone * pos);
			i += 1;
		}
	}
}

/// Error handler for audio streaming.
///
/// Panics and prints the error.
fn audio_error(error: cpal::StreamError) {
	panic!("Error occured on the stream: {}", error);
}

#[cfg(test)]
mod tests {
	use super::*;

	fn gate(on: bool, frequency: u32) -> Arc<Gate> {
		Arc::new(Gate {
			on: AtomicBool::new(on),
			frequency: AtomicU32::new(frequency),
		})
	}

	/// Calculate the power of the signal, where power is defined as the mean
	/// magnitude of the samples.
	fn calculate_power(samples: &[f32]) -> f32 {
		samples.iter().map(|x| x.abs()).sum::<f32>() / samples.len() as f32
	}

	#[test]
	fn silent_test() {
		let mut tone = make_tone(gate(false, 77500));
		let mut buffer = [1.0f32; 2048];
		tone(&mut buffer);
		assert!(buffer.iter().all(|&x| x == 0.0));
	}

	#[test]
	fn tone_test() {
		let mut tone = make_tone(gate(true, 77500));
		let mut buffer = vec![0.0f32; SAMPLE_RATE as usize];
		tone(&mut buffer);

		// Starts at zero phase
		assert_eq!(buffer[0], 0.0);

		// A full-scale sine has mean magnitude 2/pi
		let power = calculate_power(&buffer);
		assert!((power - 0.6366).abs() < 0.01, "power = {}", power);

		// 15500 cycles in one second gives 31000 zero crossings
		let crossings = buffer
			.windows(2)
			.filter(|w| w[0] * w[1] < 0.0)
			.count();
		assert!(
			(30980..=31020).contains(&crossings),
			"crossings = {}",
			crossings
		);
	}

	#[test]
	fn phase_reset_test() {
		let shared = gate(true, 77500);
		let mut tone = make_tone(shared.clone());

		let mut buffer = [0.0f32; 1000];
		tone(&mut buffer);

		shared.on.store(false, Ordering::Release);
		tone(&mut buffer);
		assert!(buffer.iter().all(|&x| x == 0.0));

		// Back on: the tone restarts from zero phase, not where it left off
		shared.on.store(true, Ordering::Release);
		tone(&mut buffer);
		assert_eq!(buffer[0], 0.0);
		assert!(calculate_power(&buffer) > 0.5);
	}
}
