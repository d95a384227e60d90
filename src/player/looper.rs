//! The event loop
//!
//! [`EventLooper::run`] walks a flattened message list on the calling thread,
//! waiting on a [`TimeSource`] between messages and handing every event to an
//! [`EventSink`]. Control requests made through [`LooperControl`] only set
//! flags; the loop applies them at the next message boundary.

use super::seek::{skip_notes_until, SeekFilter};
use super::{config::validate_tempo_ratio, PlaybackState};
use crate::clock::TimeSource;
use crate::error::{ConstructionError, Error, Result};
use crate::event::{status, Event, Message, DEFAULT_TEMPO};
use crate::smf::timing::{ticks_per_quarter, ticks_to_ms};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of MIDI channels
pub const CHANNEL_COUNT: u8 = 16;

/// How a run of the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every message was processed
    CompletedToEnd,
    /// [`LooperControl::stop`] ended the run early
    Stopped,
}

/// Receiver of everything the loop dispatches.
///
/// All methods are called on the loop's thread, in order. An error returned
/// from any of them ends the run and is returned from [`EventLooper::run`].
pub trait EventSink {
    /// Called once before the first message.
    fn on_starting(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called for every delivered event, including mute bursts.
    fn on_event(&mut self, event: &Event) -> Result<()>;

    /// Called after a run ends without error.
    fn on_finished(&mut self, _outcome: PlaybackOutcome) {}
}

impl<F> EventSink for F
where
    F: FnMut(&Event) -> Result<()>,
{
    fn on_event(&mut self, event: &Event) -> Result<()> {
        self(event)
    }
}

struct PendingSeek {
    ticks: u64,
    filter: SeekFilter,
}

#[derive(Default)]
struct Control {
    state: PlaybackState,
    running: bool,
    gate_open: bool,
    pause_requested: bool,
    stop_requested: bool,
    seek: Option<PendingSeek>,
}

struct Shared {
    control: Mutex<Control>,
    /// Signalled whenever a control flag changes
    gate: Condvar,
    /// Signalled when a run finishes
    stopped: Condvar,
    tempo: AtomicU32,
    time_signature: AtomicU32,
    play_ticks: AtomicU64,
    /// `f64` bits
    tempo_ratio: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Shared {
            control: Mutex::new(Control::default()),
            gate: Condvar::new(),
            stopped: Condvar::new(),
            tempo: AtomicU32::new(DEFAULT_TEMPO),
            time_signature: AtomicU32::new(0),
            play_ticks: AtomicU64::new(0),
            tempo_ratio: AtomicU64::new(1.0f64.to_bits()),
        }
    }

    fn tempo_ratio(&self) -> f64 {
        f64::from_bits(self.tempo_ratio.load(Ordering::Relaxed))
    }

    /// Back to default tempo and no time signature, as at the stream start.
    fn reset_meta_state(&self) {
        self.tempo.store(DEFAULT_TEMPO, Ordering::Relaxed);
        self.time_signature.store(0, Ordering::Relaxed);
    }
}

/// Thread-safe handle for controlling a running [`EventLooper`].
///
/// No method blocks except [`wait_until_stopped`](Self::wait_until_stopped).
/// Published values are snapshots and may lag the loop slightly.
#[derive(Clone)]
pub struct LooperControl {
    shared: Arc<Shared>,
}

impl LooperControl {
    /// Open the gate and mark the loop as playing.
    ///
    /// Resumes a paused loop and cancels a pause that has not been applied
    /// yet. A loop that is not running starts moving as soon as it runs.
    pub fn play(&self) {
        let mut control = self.shared.control.lock();
        control.gate_open = true;
        control.pause_requested = false;
        control.state = PlaybackState::Playing;
        self.shared.gate.notify_all();
    }

    /// Ask a playing loop to pause at the next message boundary.
    pub fn pause(&self) {
        let mut control = self.shared.control.lock();
        if control.state == PlaybackState::Playing {
            control.pause_requested = true;
            self.shared.gate.notify_all();
        }
    }

    /// Ask the loop to stop at the next message boundary.
    pub fn stop(&self) {
        let mut control = self.shared.control.lock();
        if control.state != PlaybackState::Stopped || control.running {
            control.stop_requested = true;
            control.gate_open = true;
            self.shared.gate.notify_all();
        }
    }

    /// Rewind to the start and replay through `filter` until it terminates.
    ///
    /// Without a filter, notes before `ticks` are skipped. A seek that has
    /// not been applied yet is replaced. The seek, and its mute burst, take
    /// effect at the next message boundary, so a loop blocked in a long wait
    /// applies it only once that wait returns.
    pub fn seek(&self, ticks: u64, filter: Option<SeekFilter>) {
        let filter = filter.unwrap_or_else(|| skip_notes_until(ticks));
        let mut control = self.shared.control.lock();
        control.seek = Some(PendingSeek { ticks, filter });
        self.shared.gate.notify_all();
    }

    /// Current run state
    pub fn state(&self) -> PlaybackState {
        self.shared.control.lock().state
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.shared.control.lock().running
    }

    /// Current tempo in microseconds per quarter note
    pub fn tempo(&self) -> u32 {
        self.shared.tempo.load(Ordering::Relaxed)
    }

    /// Raw bytes of the last time signature seen (zero until one is seen)
    pub fn time_signature(&self) -> [u8; 4] {
        self.shared.time_signature.load(Ordering::Relaxed).to_be_bytes()
    }

    /// Ticks played since the start of the stream
    pub fn play_ticks(&self) -> u64 {
        self.shared.play_ticks.load(Ordering::Relaxed)
    }

    /// Current speed multiplier
    pub fn tempo_ratio(&self) -> f64 {
        self.shared.tempo_ratio()
    }

    /// Change the speed multiplier; takes effect from the next wait.
    pub fn set_tempo_ratio(&self, ratio: f64) -> Result<()> {
        validate_tempo_ratio(ratio)?;
        self.shared
            .tempo_ratio
            .store(ratio.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Block until no run is in progress and the state is `Stopped`.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut control = self.shared.control.lock();
        while control.running || control.state != PlaybackState::Stopped {
            if self
                .shared
                .stopped
                .wait_until(&mut control, deadline)
                .timed_out()
            {
                return !control.running && control.state == PlaybackState::Stopped;
            }
        }
        true
    }
}

/// What the loop does after checking its control flags
enum Boundary {
    Dispatch,
    Stop,
    Finish,
}

/// Position and timing bookkeeping of one run
struct Cursor {
    index: usize,
    filter: Option<SeekFilter>,
    /// Exact milliseconds owed since the last timing reset
    nominal_ms: f64,
    /// Whole milliseconds already handed to the time source
    waited_ms: u64,
}

impl Cursor {
    fn new() -> Self {
        Cursor {
            index: 0,
            filter: None,
            nominal_ms: 0.0,
            waited_ms: 0,
        }
    }

    fn reset_timing(&mut self) {
        self.nominal_ms = 0.0;
        self.waited_ms = 0;
    }
}

/// Scheduler over a flattened, delta-timed message list.
pub struct EventLooper {
    messages: Arc<[Message]>,
    ticks_per_quarter: u16,
    time_source: Mutex<Box<dyn TimeSource + Send>>,
    shared: Arc<Shared>,
}

impl EventLooper {
    /// Create a stopped looper.
    ///
    /// Fails for SMPTE divisions.
    pub fn new(
        messages: impl Into<Arc<[Message]>>,
        time_source: Box<dyn TimeSource + Send>,
        division: i16,
    ) -> std::result::Result<Self, ConstructionError> {
        Ok(EventLooper {
            messages: messages.into(),
            ticks_per_quarter: ticks_per_quarter(division)?,
            time_source: Mutex::new(time_source),
            shared: Arc::new(Shared::new()),
        })
    }

    /// Control handle sharing this looper's state
    pub fn control(&self) -> LooperControl {
        LooperControl {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The messages being played
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Play the stream from the start on the calling thread.
    ///
    /// Blocks until the end of the stream or a stop request. The loop does
    /// not move until [`LooperControl::play`] opens the gate. Errors from the
    /// sink or the time source end the run and are returned as-is; the state
    /// is `Stopped` afterwards in every case.
    pub fn run(&self, sink: &mut dyn EventSink) -> Result<PlaybackOutcome> {
        {
            let mut control = self.shared.control.lock();
            if control.running {
                return Err(Error::AlreadyRunning);
            }
            control.running = true;
        }

        self.shared.reset_meta_state();
        self.shared.play_ticks.store(0, Ordering::Relaxed);
        log::debug!("event loop started ({} messages)", self.messages.len());

        let mut time_source = self.time_source.lock();
        time_source.reset();

        let result = sink
            .on_starting()
            .and_then(|_| self.run_messages(sink, &mut **time_source))
            .and_then(|outcome| {
                mute(sink)?;
                Ok(outcome)
            });
        drop(time_source);

        self.finish();
        match &result {
            Ok(outcome) => {
                log::debug!("event loop finished: {:?}", outcome);
                sink.on_finished(*outcome);
            }
            Err(e) => log::debug!("event loop failed: {}", e),
        }
        result
    }

    fn run_messages(
        &self,
        sink: &mut dyn EventSink,
        time_source: &mut dyn TimeSource,
    ) -> Result<PlaybackOutcome> {
        let mut cursor = Cursor::new();
        loop {
            match self.boundary(sink, time_source, &mut cursor)? {
                Boundary::Stop => return Ok(PlaybackOutcome::Stopped),
                Boundary::Finish => return Ok(PlaybackOutcome::CompletedToEnd),
                Boundary::Dispatch => {}
            }
            let message = &self.messages[cursor.index];
            cursor.index += 1;
            self.process(message, sink, time_source, &mut cursor)?;
        }
    }

    /// Apply pending control requests and wait while paused.
    fn boundary(
        &self,
        sink: &mut dyn EventSink,
        time_source: &mut dyn TimeSource,
        cursor: &mut Cursor,
    ) -> Result<Boundary> {
        let mut resumed = false;
        loop {
            let mut control = self.shared.control.lock();
            if control.stop_requested {
                return Ok(Boundary::Stop);
            }

            if let Some(seek) = control.seek.take() {
                drop(control);
                log::debug!("seek to tick {}", seek.ticks);
                cursor.index = 0;
                cursor.filter = Some(seek.filter);
                self.shared.reset_meta_state();
                cursor.reset_timing();
                self.shared.play_ticks.store(seek.ticks, Ordering::Relaxed);
                time_source.reset();
                mute(sink)?;
                continue;
            }

            if control.pause_requested {
                control.pause_requested = false;
                control.gate_open = false;
                control.state = PlaybackState::Paused;
                drop(control);
                log::debug!("paused at tick {}", self.shared.play_ticks.load(Ordering::Relaxed));
                mute(sink)?;
                continue;
            }

            if !control.gate_open {
                while !control.gate_open && !control.stop_requested && control.seek.is_none() {
                    self.shared.gate.wait(&mut control);
                }
                resumed = control.gate_open;
                continue;
            }
            drop(control);

            if resumed {
                cursor.reset_timing();
                time_source.reset();
            }

            return Ok(if cursor.index >= self.messages.len() {
                Boundary::Finish
            } else {
                Boundary::Dispatch
            });
        }
    }

    fn process(
        &self,
        message: &Message,
        sink: &mut dyn EventSink,
        time_source: &mut dyn TimeSource,
        cursor: &mut Cursor,
    ) -> Result<()> {
        if let Some(filter) = cursor.filter.as_mut() {
            let action = filter(message);
            if action.terminates() {
                cursor.filter = None;
            }
            if !action.passes() {
                return Ok(());
            }
        } else if message.delta_time != 0 {
            let ms = ticks_to_ms(
                self.shared.tempo.load(Ordering::Relaxed),
                u64::from(message.delta_time),
                self.ticks_per_quarter,
                self.shared.tempo_ratio(),
            );
            cursor.nominal_ms += ms;
            let due = cursor.nominal_ms as u64;
            let wait = due.saturating_sub(cursor.waited_ms);
            cursor.waited_ms = due.max(cursor.waited_ms);
            time_source.wait_by(wait)?;
            self.shared
                .play_ticks
                .fetch_add(u64::from(message.delta_time), Ordering::Relaxed);
        }

        let event = &message.event;
        if event.is_meta() {
            if let Some(tempo) = event.tempo_value() {
                self.shared.tempo.store(tempo, Ordering::Relaxed);
            } else if let Some(signature) = event.time_signature() {
                self.shared
                    .time_signature
                    .store(u32::from_be_bytes(signature), Ordering::Relaxed);
            }
        }

        log::trace!("dispatch {}", message);
        sink.on_event(event)
    }

    fn finish(&self) {
        let mut control = self.shared.control.lock();
        control.running = false;
        control.state = PlaybackState::Stopped;
        control.gate_open = false;
        control.pause_requested = false;
        control.stop_requested = false;
        control.seek = None;
        self.shared.stopped.notify_all();
        self.shared.gate.notify_all();
    }
}

/// "All sound off" on every channel
fn mute(sink: &mut dyn EventSink) -> Result<()> {
    for channel in 0..CHANNEL_COUNT {
        sink.on_event(&Event::control_change(channel, status::CC_ALL_SOUND_OFF, 0))?;
    }
    Ok(())
}

/// True for the mute burst events this loop emits
pub fn is_mute_event(event: &Event) -> bool {
    event.event_type() == status::CONTROL_CHANGE && event.data1() == status::CC_ALL_SOUND_OFF
}
