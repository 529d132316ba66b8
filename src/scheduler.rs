//! The per-second transmission loop.
//!
//! DCF77 marks each data bit by cutting the carrier at the start of its
//! second: 100 ms of silence for a zero, 200 ms for a one. Second 59 has no
//! cut at all, and the frame transmitted during one minute announces the
//! next. The loop below turns a loaded minute frame into that envelope,
//! synchronized to wall-clock seconds, while servicing key input and the
//! display in the gaps between bits.
//!
//! Every second follows the same shape: spin until the clock enters a new
//! second, cut the carrier, wait out the bit's silence, restart the carrier,
//! then sleep away the rest of the second in bounded slices of the input
//! poll. A 50 ms guard band at the end of each second keeps a slow slice
//! from running into the next tick.

use std::time::Duration;

use civil::CalendarTime;
use dcf77::{BitSymbol, FrameRequest, MARKER_SECOND};
use tracing::{debug, info};

use crate::carrier::CarrierDriver;
use crate::clock::ClockSource;
use crate::encode::MinuteEncoder;
use crate::input::{InputPoller, Key};
use crate::present::Presenter;

/// Carrier frequency (Hz).
pub const CARRIER_FREQUENCY_HZ: u32 = 77_500;
/// Carrier duty cycle, for drivers that shape pulses.
pub const CARRIER_DUTY: f32 = 0.5;
/// Seconds the encoded frame runs ahead of the displayed time.
const FRAME_LEAD_SECONDS: i64 = 60;
/// Guard band kept free at the end of every second (ms).
const SYNC_MARGIN_MS: i64 = 50;
/// Carrier dropout announcing a one (ms).
const SILENCE_ONE_MS: i64 = 200;
/// Carrier dropout announcing a zero (ms).
const SILENCE_ZERO_MS: i64 = 100;

const MS_PER_SECOND: i64 = 1000;

/// Whether the carrier is currently up.
#[derive(Clone, Copy)]
enum RunningState {
	Idle,
	Transmitting,
}

/// Where the loop is within the current second.
enum State {
	/// Spinning until the clock enters a new second.
	WaitingForTick,
	/// A data second: reshape the carrier envelope for its bit.
	EmittingBit,
	/// The marker second: leave the carrier up and reload the frame.
	MinuteBoundary,
	/// A stop was requested; tear down.
	Terminated,
}

/// The transmission loop and everything it drives.
pub struct Scheduler<C, E, D, I, P> {
	clock: C,
	encoder: E,
	carrier: D,
	poller: I,
	presenter: P,
	/// Displayed civil time, resampled at every second tick.
	time: CalendarTime,
	/// DST flag for the next frame load.
	dst: bool,
	running: RunningState,
	/// The second whose tick was last consumed.
	last_second: u8,
}

impl<C, E, D, I, P> Scheduler<C, E, D, I, P>
where
	C: ClockSource,
	E: MinuteEncoder,
	D: CarrierDriver,
	I: InputPoller,
	P: Presenter,
{
	pub fn new(clock: C, encoder: E, carrier: D, poller: I, presenter: P, dst: bool) -> Self {
		let time = clock.sample();
		let last_second = time.second;
		Scheduler {
			clock,
			encoder,
			carrier,
			poller,
			presenter,
			time,
			dst,
			running: RunningState::Idle,
			last_second,
		}
	}

	/// Transmit until the operator asks to stop.
	///
	/// The carrier is silenced before returning, no matter where in the
	/// cycle the stop lands.
	pub fn run(mut self) {
		self.load_frame(FRAME_LEAD_SECONDS);
		let mut state = State::WaitingForTick;
		loop {
			state = match state {
				State::WaitingForTick => self.wait_for_tick(),
				State::EmittingBit => self.emit_bit(),
				State::MinuteBoundary => self.minute_boundary(),
				State::Terminated => break,
			};
		}
		self.shutdown();
	}

	/// Spin until the sampled second differs from the last consumed one.
	fn wait_for_tick(&mut self) -> State {
		loop {
			let time = self.clock.sample();
			if time.second != self.last_second {
				self.time = time;
				self.last_second = time.second;
				break;
			}
			std::hint::spin_loop();
		}
		if self.time.second < MARKER_SECOND {
			State::EmittingBit
		} else {
			State::MinuteBoundary
		}
	}

	/// Shape the carrier for the bit of the current second.
	fn emit_bit(&mut self) -> State {
		if let RunningState::Transmitting = self.running {
			self.carrier.set_indicator(false);
			self.carrier.stop();
			self.running = RunningState::Idle;
		}
		let silence = match self.encoder.bit(self.time.second) {
			BitSymbol::One => SILENCE_ONE_MS,
			// Marker cannot occur here; seconds past 58 take the
			// MinuteBoundary path
			BitSymbol::Zero | BitSymbol::Marker => SILENCE_ZERO_MS,
		};
		self.clock.delay_ms(silence as u64);
		self.carrier.start(CARRIER_FREQUENCY_HZ, CARRIER_DUTY);
		self.carrier.set_indicator(true);
		self.running = RunningState::Transmitting;
		self.wait_slice(silence)
	}

	/// The marker second: the carrier stays up and the next frame loads.
	fn minute_boundary(&mut self) -> State {
		self.load_frame(FRAME_LEAD_SECONDS + 1);
		self.wait_slice(0)
	}

	/// Load the frame for the displayed time plus `lead` seconds.
	fn load_frame(&mut self, lead: i64) {
		// Out of range only at the edge of representable time; the
		// previous frame then stays loaded
		if let Some(time) = self.time.plus_seconds(lead) {
			debug!(
				hour = time.hour,
				minute = time.minute,
				dst = self.dst,
				"frame loaded"
			);
			self.encoder.load_minute(FrameRequest { time, dst: self.dst });
		}
	}

	/// Sleep out the rest of the second in bounded poll slices, refreshing
	/// the display after each one.
	fn wait_slice(&mut self, silence_ms: i64) -> State {
		let budget = MS_PER_SECOND - silence_ms - SYNC_MARGIN_MS;
		let start = self.clock.ticks_ms();
		let mut wait_ms = budget;
		while wait_ms > 0 {
			let key = self.poller.poll(Duration::from_millis(wait_ms as u64));
			match key {
				Some(Key::Back) => {
					info!("stop requested");
					return State::Terminated;
				}
				Some(Key::Ok) => {
					self.dst = !self.dst;
					debug!(dst = self.dst, "timezone flag toggled");
				}
				None => {}
			}
			self.render();
			if key.is_none() {
				break;
			}
			wait_ms = budget - (self.clock.ticks_ms() - start) as i64;
		}
		State::WaitingForTick
	}

	fn render(&mut self) {
		let bits = (self.time.second < MARKER_SECOND)
			.then(|| self.encoder.prefix(self.time.second));
		self.presenter.render(&self.time, self.dst, bits.as_deref());
	}

	fn shutdown(&mut self) {
		if let RunningState::Transmitting = self.running {
			self.carrier.stop();
			self.carrier.set_indicator(false);
			self.running = RunningState::Idle;
		}
	}
}
