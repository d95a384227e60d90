//! Background player driving an output port

use super::looper::{EventLooper, EventSink, LooperControl, PlaybackOutcome, CHANNEL_COUNT};
use super::seek::SeekFilter;
use super::{PlaybackSnapshot, PlaybackState, PlayerConfig};
use crate::clock::{AdjustingClock, TimeSource};
use crate::error::{Error, Result};
use crate::event::{status, tempo_to_bpm, Event};
use crate::output::Output;
use crate::smf::Sequence;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type EventCallback = Box<dyn FnMut(&Event) + Send>;
type CompletedCallback = Box<dyn FnMut(PlaybackOutcome) + Send>;

#[derive(Default)]
struct Subscribers {
    events: Vec<EventCallback>,
    completed: Vec<CompletedCallback>,
}

/// Sink used on the playback thread: encodes events for the output, then
/// notifies subscribers.
struct OutputSink<O> {
    output: Arc<Mutex<O>>,
    subscribers: Arc<Mutex<Subscribers>>,
    reset_controllers: bool,
    buffer: Vec<u8>,
}

impl<O: Output> EventSink for OutputSink<O> {
    fn on_starting(&mut self) -> Result<()> {
        if !self.reset_controllers {
            return Ok(());
        }
        let mut output = self.output.lock();
        for channel in 0..CHANNEL_COUNT {
            output.send(
                &[status::CONTROL_CHANGE | channel, status::CC_RESET_ALL_CONTROLLERS, 0],
                0,
            )?;
        }
        Ok(())
    }

    fn on_event(&mut self, event: &Event) -> Result<()> {
        if event.is_sentinel() {
            return Ok(());
        }
        if event.write_wire_bytes(&mut self.buffer) {
            self.output.lock().send(&self.buffer, 0)?;
        }
        for callback in self.subscribers.lock().events.iter_mut() {
            callback(event);
        }
        Ok(())
    }

    fn on_finished(&mut self, outcome: PlaybackOutcome) {
        for callback in self.subscribers.lock().completed.iter_mut() {
            callback(outcome);
        }
    }
}

/// Plays a [`Sequence`] to an [`Output`] on a background thread.
///
/// Multi-track sequences are merged up front. Control methods return
/// immediately; the playback thread applies them at the next event.
/// Subscriber callbacks run on the playback thread and must not register
/// further subscribers.
pub struct MidiPlayer<O: Output + Send + 'static> {
    looper: Arc<EventLooper>,
    control: LooperControl,
    sequence: Sequence,
    output: Arc<Mutex<O>>,
    subscribers: Arc<Mutex<Subscribers>>,
    config: PlayerConfig,
    worker: Option<JoinHandle<Result<PlaybackOutcome>>>,
}

impl<O: Output + Send + 'static> MidiPlayer<O> {
    /// Player with default settings and a wall clock
    pub fn new(sequence: &Sequence, output: O) -> Result<Self> {
        Self::with_config(sequence, output, PlayerConfig::default())
    }

    /// Player with the given settings and a wall clock
    pub fn with_config(sequence: &Sequence, output: O, config: PlayerConfig) -> Result<Self> {
        Self::with_time_source(sequence, output, config, Box::new(AdjustingClock::new()))
    }

    /// Player driven by a custom time source
    pub fn with_time_source(
        sequence: &Sequence,
        output: O,
        config: PlayerConfig,
        time_source: Box<dyn TimeSource + Send>,
    ) -> Result<Self> {
        config.validate()?;
        let sequence = sequence.merged().into_owned();
        let looper =
            EventLooper::new(sequence.merged_messages(), time_source, sequence.division())?;
        let control = looper.control();
        control.set_tempo_ratio(config.tempo_ratio)?;

        log::debug!(
            "player ready: {} messages, {} ticks",
            looper.messages().len(),
            sequence.total_ticks()
        );

        Ok(MidiPlayer {
            looper: Arc::new(looper),
            control,
            sequence,
            output: Arc::new(Mutex::new(output)),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            config,
            worker: None,
        })
    }

    /// Start, or resume after a pause. Does nothing while playing.
    pub fn play(&mut self) -> Result<()> {
        match self.control.state() {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => {
                self.control.play();
                Ok(())
            }
            PlaybackState::Stopped => {
                self.reap_worker();
                self.spawn_worker()?;
                self.control.play();
                Ok(())
            }
        }
    }

    /// Pause at the next event; sounding notes are muted.
    pub fn pause(&self) {
        if self.control.state() == PlaybackState::Playing {
            self.control.pause();
        }
    }

    /// Stop at the next event; sounding notes are muted.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Jump to an absolute tick, skipping notes on the way.
    pub fn seek(&self, ticks: u64) {
        self.control.seek(ticks, None);
    }

    /// Jump to an absolute tick using a custom filter.
    pub fn seek_with(&self, ticks: u64, filter: SeekFilter) {
        self.control.seek(ticks, Some(filter));
    }

    /// Jump relative to the current position, clamped to the sequence.
    pub fn skip_by(&self, delta_ticks: i64) {
        let current = self.play_ticks();
        let target = if delta_ticks < 0 {
            current.saturating_sub(delta_ticks.unsigned_abs())
        } else {
            current.saturating_add(delta_ticks as u64)
        };
        self.seek(target.min(self.sequence.total_ticks()));
    }

    /// Current run state
    pub fn state(&self) -> PlaybackState {
        self.control.state()
    }

    /// Tempo in microseconds per quarter note
    pub fn tempo(&self) -> u32 {
        self.control.tempo()
    }

    /// Tempo in beats per minute
    pub fn bpm(&self) -> f64 {
        tempo_to_bpm(self.tempo())
    }

    /// Raw bytes of the current time signature
    pub fn time_signature(&self) -> [u8; 4] {
        self.control.time_signature()
    }

    /// Ticks played
    pub fn play_ticks(&self) -> u64 {
        self.control.play_ticks()
    }

    /// Position in milliseconds at the sequence's own tempo
    pub fn position_ms(&self) -> u64 {
        // The division was validated when the looper was built.
        self.sequence
            .play_time_ms_at_tick(self.play_ticks())
            .unwrap_or_default()
    }

    /// Length of the sequence in milliseconds
    pub fn total_play_time_ms(&self) -> u64 {
        self.sequence.total_play_time_ms().unwrap_or_default()
    }

    /// All published values at once
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let tempo = self.tempo();
        PlaybackSnapshot {
            state: self.state(),
            tempo,
            bpm: tempo_to_bpm(tempo),
            time_signature: self.time_signature(),
            play_ticks: self.play_ticks(),
            position_ms: self.position_ms(),
        }
    }

    /// Change playback speed; 1.0 plays as written.
    pub fn set_tempo_ratio(&mut self, ratio: f64) -> Result<()> {
        self.control.set_tempo_ratio(ratio)?;
        self.config.tempo_ratio = ratio;
        Ok(())
    }

    /// Active configuration
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// The merged sequence being played
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Call `callback` for every event dispatched, mute bursts included.
    pub fn on_event(&self, callback: impl FnMut(&Event) + Send + 'static) {
        self.subscribers.lock().events.push(Box::new(callback));
    }

    /// Call `callback` whenever a run ends without error.
    pub fn on_completed(&self, callback: impl FnMut(PlaybackOutcome) + Send + 'static) {
        self.subscribers.lock().completed.push(Box::new(callback));
    }

    /// Block until playback has stopped; `false` on timeout.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        self.control.wait_until_stopped(timeout)
    }

    /// Wait for the playback thread and return how its last run ended.
    ///
    /// `Ok(None)` when playback was never started or already joined.
    pub fn join(&mut self) -> Result<Option<PlaybackOutcome>> {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| Error::PlaybackThreadPanicked)?
                .map(Some),
            None => Ok(None),
        }
    }

    /// Locked access to the output port
    pub fn output(&self) -> MutexGuard<'_, O> {
        self.output.lock()
    }

    /// Control handle for use from other threads
    pub fn control(&self) -> LooperControl {
        self.control.clone()
    }

    fn spawn_worker(&mut self) -> Result<()> {
        let looper = Arc::clone(&self.looper);
        let mut sink = OutputSink {
            output: Arc::clone(&self.output),
            subscribers: Arc::clone(&self.subscribers),
            reset_controllers: self.config.reset_controllers_on_start,
            buffer: Vec::with_capacity(64),
        };
        let worker = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || looper.run(&mut sink))?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Join a finished playback thread, logging how it ended.
    fn reap_worker(&mut self) {
        match self.join() {
            Ok(_) => {}
            Err(e) => log::warn!("previous playback ended with an error: {}", e),
        }
    }
}

impl<O: Output + Send + 'static> Drop for MidiPlayer<O> {
    fn drop(&mut self) {
        self.control.stop();
        let mut output = self.output.lock();
        if let Err(e) = output.close() {
            log::warn!("failed to close {}: {}", output.details(), e);
        }
    }
}
