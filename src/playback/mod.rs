use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinSet;

use crate::audio::{decode, AudioOutput, MediaFetcher};
use crate::error::PlaybackError;
use crate::models::{AudioBuffer, PlaybackState, PlayerStatus};

/// One playable audio item: a display name and a decoded buffer.
///
/// A track is created empty, populated exactly once by `load`, and immutable
/// afterwards. A failed load substitutes a zero-duration silent placeholder
/// so duration queries keep working and the rest of the playlist stays
/// usable.
pub struct Track {
    name: String,
    buffer: OnceLock<Arc<AudioBuffer>>,
}

impl Track {
    fn new(locator: &str) -> Self {
        let name = locator.rsplit('/').next().unwrap_or(locator).to_string();
        Self {
            name,
            buffer: OnceLock::new(),
        }
    }

    /// Display name derived from the locator's final path segment
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch and decode the track bytes. Never fails the caller; fetch and
    /// decode errors degrade to the placeholder buffer.
    async fn load(&self, fetcher: &dyn MediaFetcher, locator: &str) {
        let buffer = match fetcher
            .fetch(locator)
            .await
            .and_then(|bytes| decode::decode_bytes(locator, bytes))
        {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("{}; substituting silent placeholder", e);
                AudioBuffer::empty()
            }
        };
        // Populated exactly once; a concurrent duplicate load loses quietly.
        let _ = self.buffer.set(Arc::new(buffer));
    }

    /// Whether the load has settled, successfully or with a placeholder
    pub fn loaded(&self) -> bool {
        self.buffer.get().is_some()
    }

    /// Decoded length. Zero until the load settles, and zero forever for a
    /// placeholder.
    pub fn duration(&self) -> Duration {
        self.buffer
            .get()
            .map(|b| b.duration())
            .unwrap_or(Duration::ZERO)
    }

    fn buffer(&self) -> Arc<AudioBuffer> {
        self.buffer
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::new(AudioBuffer::empty()))
    }
}

/// Exactly one of these describes the transport at any instant.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Stopped,
    /// `started_at` is the output-clock timestamp the run logically began
    /// at, already adjusted for the resume offset.
    Playing { started_at: f64 },
    /// Offset in seconds a paused track resumes from.
    Paused { offset: f64 },
}

/// The catalog of tracks plus the single active playback state machine.
///
/// All position math is measured against the output's hardware clock; the
/// phase holds only timestamps and offsets, and "is playing" / "has ended"
/// are derived predicates over that clock. Transport methods take `&mut
/// self`, so they cannot interleave.
pub struct Playlist {
    catalog: HashMap<String, Arc<Track>>,
    current: Option<Arc<Track>>,
    phase: Phase,
    output: Box<dyn AudioOutput>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl Playlist {
    pub fn new(output: Box<dyn AudioOutput>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            catalog: HashMap::new(),
            current: None,
            phase: Phase::Stopped,
            output,
            fetcher,
        }
    }

    /// Register a track and load it, returning once the load settles
    /// (successfully or with a placeholder).
    pub async fn add(&mut self, filename: &str) -> Arc<Track> {
        let track = Arc::new(Track::new(filename));
        self.catalog.insert(filename.to_string(), Arc::clone(&track));
        track.load(self.fetcher.as_ref(), filename).await;
        debug!("added {} ({:.1}s)", track.name(), track.duration().as_secs_f64());
        track
    }

    /// Register and load many tracks concurrently. Each load is independent;
    /// one stalled or broken source does not hold up the others.
    pub async fn add_all(&mut self, filenames: &[String]) {
        let mut loads = JoinSet::new();
        for filename in filenames {
            let track = Arc::new(Track::new(filename));
            self.catalog.insert(filename.clone(), Arc::clone(&track));

            let fetcher = Arc::clone(&self.fetcher);
            let locator = filename.clone();
            loads.spawn(async move {
                track.load(fetcher.as_ref(), &locator).await;
            });
        }
        while loads.join_next().await.is_some() {}
    }

    /// Select a track for playback, stopping any active run first. An
    /// unknown filename is registered and loaded on the spot.
    pub async fn load(&mut self, filename: &str) {
        self.stop();
        let track = match self.catalog.get(filename).cloned() {
            Some(track) => track,
            None => self.add(filename).await,
        };
        info!("selected {}", track.name());
        self.current = Some(track);
    }

    /// Start a playback run.
    ///
    /// `pos` is a fraction of the track duration in [0, 1]. `None` resumes
    /// from the paused offset (or the start); `Some(0.0)` is an explicit
    /// seek to the start, which is why the parameter is an `Option` and not
    /// a zero sentinel.
    pub fn play(&mut self, pos: Option<f64>) -> Result<(), PlaybackError> {
        let track = self
            .current
            .as_ref()
            .ok_or(PlaybackError::NoTrackSelected)?;
        let duration = track.duration().as_secs_f64();

        let offset = match pos {
            Some(fraction) => duration * fraction,
            None => match self.phase {
                Phase::Paused { offset } => offset,
                _ => 0.0,
            },
        };

        // Tear down any existing run; harmless when nothing is rendering.
        self.output.stop();
        self.output.start(track.buffer(), offset)?;
        self.phase = Phase::Playing {
            started_at: self.output.now() - offset,
        };
        debug!("playing {} from {:.2}s", track.name(), offset);
        Ok(())
    }

    /// Capture the current position and tear down the run. A no-op when
    /// nothing is playing: the captured position is zero, which leaves the
    /// transport stopped.
    pub fn pause(&mut self) {
        let offset = self.current_time().as_secs_f64();
        self.output.stop();
        self.phase = Self::resting(offset);
    }

    /// Tear down the active run and reset to the start. Safe to call at any
    /// time, including twice in a row.
    pub fn stop(&mut self) {
        self.output.stop();
        self.phase = Phase::Stopped;
    }

    /// Toggle between playing and paused
    pub fn play_pause(&mut self) -> Result<(), PlaybackError> {
        if self.playing() {
            self.pause();
            Ok(())
        } else {
            self.play(None)
        }
    }

    /// Jump to a fraction of the track. While playing this restarts the run
    /// at the new offset; otherwise it only records the offset to resume
    /// from.
    pub fn seek(&mut self, pos: f64) -> Result<(), PlaybackError> {
        if self.playing() {
            self.play(Some(pos))
        } else {
            let track = self
                .current
                .as_ref()
                .ok_or(PlaybackError::NoTrackSelected)?;
            let offset = track.duration().as_secs_f64() * pos;
            self.output.stop();
            self.phase = Self::resting(offset);
            Ok(())
        }
    }

    /// True iff a run is active and the clock has not yet passed the end of
    /// the track. Derived from clock arithmetic, never from a stored flag.
    pub fn playing(&self) -> bool {
        match self.phase {
            Phase::Playing { started_at } => {
                self.output.now() - started_at < self.duration().as_secs_f64()
            }
            _ => false,
        }
    }

    /// True iff a run logically completed but no stop or pause has
    /// acknowledged it yet. Polled by the UI to advance to the next track;
    /// there is no end-of-track callback.
    pub fn ended(&self) -> bool {
        match self.phase {
            Phase::Playing { started_at } => {
                self.output.now() - started_at > self.duration().as_secs_f64()
            }
            _ => false,
        }
    }

    /// Playback position, clamped to `[0, duration]` so a finished but
    /// unacknowledged run never reports past the end.
    pub fn current_time(&self) -> Duration {
        let seconds = match self.phase {
            Phase::Playing { started_at } => {
                let elapsed = self.output.now() - started_at;
                elapsed.clamp(0.0, self.duration().as_secs_f64())
            }
            Phase::Paused { offset } => offset,
            Phase::Stopped => 0.0,
        };
        Duration::from_secs_f64(seconds)
    }

    /// Duration of the selected track, zero when none is selected
    pub fn duration(&self) -> Duration {
        self.current
            .as_ref()
            .map(|t| t.duration())
            .unwrap_or(Duration::ZERO)
    }

    /// Set the persistent output gain; applies immediately and to all
    /// future runs. Values are passed through unvalidated.
    pub fn set_gain(&mut self, gain: f32) {
        self.output.set_gain(gain);
    }

    pub fn gain(&self) -> f32 {
        self.output.gain()
    }

    /// The currently selected track, if any
    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_deref()
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Snapshot of the transport for display
    pub fn status(&self) -> PlayerStatus {
        let state = if self.playing() {
            PlaybackState::Playing
        } else if matches!(self.phase, Phase::Paused { .. }) {
            PlaybackState::Paused
        } else {
            PlaybackState::Stopped
        };
        PlayerStatus {
            state,
            track: self.current.as_ref().map(|t| t.name().to_string()),
            position: self.current_time(),
            duration: self.duration(),
            gain: self.gain(),
        }
    }

    /// A zero offset is indistinguishable from stopped-at-start, so it
    /// normalizes to Stopped rather than Paused.
    fn resting(offset: f64) -> Phase {
        if offset > 0.0 {
            Phase::Paused { offset }
        } else {
            Phase::Stopped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::pcm_wav_bytes;
    use crate::error::{AudioError, LoadError};
    use std::sync::Mutex;

    struct FakeOutputState {
        now: f64,
        gain: f32,
        active_offset: Option<f64>,
        starts: Vec<f64>,
        stops: usize,
    }

    /// Output double with a manually advanced clock. Cloning shares the
    /// state so tests keep a handle after handing the output to a playlist.
    #[derive(Clone)]
    struct FakeOutput(Arc<Mutex<FakeOutputState>>);

    impl FakeOutput {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(FakeOutputState {
                now: 0.0,
                gain: 1.0,
                active_offset: None,
                starts: Vec::new(),
                stops: 0,
            })))
        }

        fn advance(&self, seconds: f64) {
            self.0.lock().unwrap().now += seconds;
        }

        fn starts(&self) -> Vec<f64> {
            self.0.lock().unwrap().starts.clone()
        }

        fn stops(&self) -> usize {
            self.0.lock().unwrap().stops
        }

        fn active(&self) -> bool {
            self.0.lock().unwrap().active_offset.is_some()
        }
    }

    impl AudioOutput for FakeOutput {
        fn now(&self) -> f64 {
            self.0.lock().unwrap().now
        }

        fn start(&mut self, _buffer: Arc<AudioBuffer>, offset: f64) -> Result<(), AudioError> {
            let mut state = self.0.lock().unwrap();
            state.active_offset = Some(offset);
            state.starts.push(offset);
            Ok(())
        }

        fn stop(&mut self) {
            let mut state = self.0.lock().unwrap();
            state.active_offset = None;
            state.stops += 1;
        }

        fn set_gain(&mut self, gain: f32) {
            self.0.lock().unwrap().gain = gain;
        }

        fn gain(&self) -> f32 {
            self.0.lock().unwrap().gain
        }
    }

    /// Fetcher double that always fails, for placeholder-path tests
    struct FailingFetcher;

    #[async_trait::async_trait]
    impl MediaFetcher for FailingFetcher {
        async fn fetch(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
            Err(LoadError::Fetch {
                locator: locator.to_string(),
                reason: "unreachable".to_string(),
            })
        }
    }

    /// Fetcher double serving a generated WAV of the given length
    struct WavFetcher {
        seconds: usize,
    }

    #[async_trait::async_trait]
    impl MediaFetcher for WavFetcher {
        async fn fetch(&self, _locator: &str) -> Result<Vec<u8>, LoadError> {
            Ok(pcm_wav_bytes(8000, 1, 8000 * self.seconds))
        }
    }

    fn loaded_track(name: &str, seconds: f64) -> Arc<Track> {
        let track = Track::new(name);
        let frames = (seconds * 1000.0) as usize;
        let _ = track.buffer.set(Arc::new(AudioBuffer::new(1, 1000, frames)));
        Arc::new(track)
    }

    /// Playlist with one selected 10-second track and a handle on the fake
    /// output clock
    fn playlist_with_track(seconds: f64) -> (Playlist, FakeOutput) {
        let output = FakeOutput::new();
        let mut playlist = Playlist::new(Box::new(output.clone()), Arc::new(FailingFetcher));
        let track = loaded_track("song.wav", seconds);
        playlist.catalog.insert("song.wav".to_string(), Arc::clone(&track));
        playlist.current = Some(track);
        (playlist, output)
    }

    fn secs(playlist: &Playlist) -> f64 {
        playlist.current_time().as_secs_f64()
    }

    #[test]
    fn test_track_duration_before_load() {
        let track = Track::new("music/song.wav");
        assert_eq!(track.name(), "song.wav");
        assert!(!track.loaded());
        assert_eq!(track.duration(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_failed_load_degrades_to_placeholder() {
        let output = FakeOutput::new();
        let mut playlist = Playlist::new(Box::new(output.clone()), Arc::new(FailingFetcher));

        let track = playlist.add("broken.flac").await;
        assert!(track.loaded());
        assert_eq!(track.duration(), Duration::ZERO);

        // The playlist remains usable: the broken track plays as silence
        // and finishes immediately.
        playlist.load("broken.flac").await;
        playlist.play(None).unwrap();
        output.advance(0.1);
        assert!(!playlist.playing());
        assert!(playlist.ended());
    }

    #[tokio::test]
    async fn test_add_decodes_duration() {
        let output = FakeOutput::new();
        let mut playlist =
            Playlist::new(Box::new(output), Arc::new(WavFetcher { seconds: 2 }));

        let track = playlist.add("two-seconds.wav").await;
        assert!((track.duration().as_secs_f64() - 2.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_add_all_loads_every_track() {
        let output = FakeOutput::new();
        let mut playlist =
            Playlist::new(Box::new(output), Arc::new(WavFetcher { seconds: 1 }));

        let names: Vec<String> = (0..4).map(|i| format!("track{}.wav", i)).collect();
        playlist.add_all(&names).await;

        assert_eq!(playlist.len(), 4);
        for name in &names {
            assert!(playlist.catalog.get(name).unwrap().loaded());
        }
    }

    #[tokio::test]
    async fn test_load_unknown_filename_auto_adds() {
        let output = FakeOutput::new();
        let mut playlist =
            Playlist::new(Box::new(output), Arc::new(WavFetcher { seconds: 1 }));

        playlist.load("new-song.wav").await;
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.current_track().unwrap().name(), "new-song.wav");
    }

    #[tokio::test]
    async fn test_load_stops_active_run() {
        let (mut playlist, output) = playlist_with_track(10.0);
        playlist.play(None).unwrap();
        assert!(output.active());

        playlist.load("song.wav").await;
        assert!(!output.active());
        assert!(!playlist.playing());
    }

    #[test]
    fn test_play_with_no_track_selected() {
        let output = FakeOutput::new();
        let mut playlist = Playlist::new(Box::new(output), Arc::new(FailingFetcher));

        assert!(matches!(
            playlist.play(None),
            Err(PlaybackError::NoTrackSelected)
        ));
        assert!(matches!(
            playlist.seek(0.5),
            Err(PlaybackError::NoTrackSelected)
        ));
        // Pause and stop are defined no-ops without a track
        playlist.pause();
        playlist.stop();
        assert_eq!(playlist.current_time(), Duration::ZERO);
        assert_eq!(playlist.duration(), Duration::ZERO);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut playlist, output) = playlist_with_track(10.0);
        playlist.play(None).unwrap();
        output.advance(2.0);

        playlist.stop();
        playlist.stop();

        assert!(!playlist.playing());
        assert_eq!(playlist.current_time(), Duration::ZERO);
    }

    #[test]
    fn test_pause_then_resume_keeps_offset() {
        let (mut playlist, output) = playlist_with_track(10.0);

        playlist.play(None).unwrap();
        output.advance(3.0);
        playlist.pause();
        assert!((secs(&playlist) - 3.0).abs() < 1e-9);
        assert!(!playlist.playing());

        // Position holds still while paused
        output.advance(5.0);
        assert!((secs(&playlist) - 3.0).abs() < 1e-9);

        playlist.play(None).unwrap();
        output.advance(2.0);
        assert!((secs(&playlist) - 5.0).abs() < 1e-9);
        assert!(playlist.playing());
    }

    #[test]
    fn test_pause_while_stopped_is_noop() {
        let (mut playlist, _output) = playlist_with_track(10.0);
        playlist.pause();
        assert!(!playlist.playing());
        assert_eq!(playlist.current_time(), Duration::ZERO);
    }

    #[test]
    fn test_seek_while_playing_moves_position() {
        let (mut playlist, output) = playlist_with_track(10.0);
        playlist.play(None).unwrap();
        output.advance(1.0);

        playlist.seek(0.5).unwrap();
        assert!(playlist.playing());
        assert!((secs(&playlist) - 5.0).abs() < 1e-9);

        // The render run was restarted at the new offset
        assert_eq!(output.starts(), vec![0.0, 5.0]);
    }

    #[test]
    fn test_seek_while_stopped_records_offset_only() {
        let (mut playlist, output) = playlist_with_track(10.0);

        playlist.seek(0.25).unwrap();
        assert!(!playlist.playing());
        assert!((secs(&playlist) - 2.5).abs() < 1e-9);
        assert!(output.starts().is_empty());

        // Resuming picks the seeked offset up
        playlist.play(None).unwrap();
        assert_eq!(output.starts(), vec![2.5]);
    }

    #[test]
    fn test_explicit_zero_seek_restarts_from_start() {
        let (mut playlist, output) = playlist_with_track(10.0);
        playlist.play(None).unwrap();
        output.advance(4.0);

        // Some(0.0) is a seek to the start, not "no position given"
        playlist.play(Some(0.0)).unwrap();
        assert!((secs(&playlist) - 0.0).abs() < 1e-9);
        output.advance(1.0);
        assert!((secs(&playlist) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_of_track_detected_without_stop() {
        let (mut playlist, output) = playlist_with_track(10.0);
        playlist.play(None).unwrap();

        output.advance(9.9);
        assert!(playlist.playing());
        assert!(!playlist.ended());

        output.advance(0.2);
        assert!(!playlist.playing());
        assert!(playlist.ended());
        // Clamped: a finished but unacknowledged run never reports past the
        // end.
        assert!((secs(&playlist) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_near_end_then_ended() {
        let (mut playlist, output) = playlist_with_track(10.0);
        playlist.play(Some(0.9)).unwrap();

        output.advance(2.0);
        assert!(playlist.ended());
        assert!((secs(&playlist) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_pause_toggles() {
        let (mut playlist, output) = playlist_with_track(10.0);

        playlist.play_pause().unwrap();
        assert!(playlist.playing());

        output.advance(2.0);
        playlist.play_pause().unwrap();
        assert!(!playlist.playing());
        assert!((secs(&playlist) - 2.0).abs() < 1e-9);

        playlist.play_pause().unwrap();
        assert!(playlist.playing());
        assert!((secs(&playlist) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_gain_does_not_disturb_position() {
        let (mut playlist, output) = playlist_with_track(10.0);
        playlist.play(None).unwrap();
        output.advance(3.0);

        playlist.set_gain(0.5);
        assert_eq!(playlist.gain(), 0.5);
        assert!(playlist.playing());
        assert!((secs(&playlist) - 3.0).abs() < 1e-9);
        // No run restart happened
        assert_eq!(output.starts().len(), 1);
    }

    #[test]
    fn test_current_time_bounded_for_any_sequence() {
        let (mut playlist, output) = playlist_with_track(10.0);
        let duration = playlist.duration();

        let check = |playlist: &Playlist| {
            let t = playlist.current_time();
            assert!(t >= Duration::ZERO && t <= duration, "t = {:?}", t);
        };

        check(&playlist);
        playlist.play(None).unwrap();
        check(&playlist);
        output.advance(7.0);
        check(&playlist);
        playlist.seek(0.9).unwrap();
        check(&playlist);
        output.advance(5.0);
        check(&playlist); // past the end, clamped
        playlist.pause();
        check(&playlist);
        playlist.play(Some(0.2)).unwrap();
        output.advance(1.0);
        check(&playlist);
        playlist.stop();
        check(&playlist);
    }

    #[test]
    fn test_status_snapshot() {
        let (mut playlist, output) = playlist_with_track(10.0);

        let status = playlist.status();
        assert_eq!(status.state, PlaybackState::Stopped);
        assert_eq!(status.track.as_deref(), Some("song.wav"));

        playlist.play(None).unwrap();
        output.advance(2.0);
        let status = playlist.status();
        assert_eq!(status.state, PlaybackState::Playing);
        assert!((status.position.as_secs_f64() - 2.0).abs() < 1e-9);
        assert_eq!(status.duration, Duration::from_secs(10));

        playlist.pause();
        assert_eq!(playlist.status().state, PlaybackState::Paused);
    }

    #[test]
    fn test_every_teardown_path_stops_the_run() {
        let (mut playlist, output) = playlist_with_track(10.0);

        playlist.play(None).unwrap();
        playlist.pause(); // 1: pause tears down
        playlist.play(None).unwrap();
        playlist.seek(0.5).unwrap(); // 2+3: restart = stop + start
        playlist.stop(); // 4

        assert!(output.stops() >= 4);
        assert!(!output.active());
    }
}
