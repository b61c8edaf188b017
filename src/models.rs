use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decoded audio sample data, interleaved f32
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: usize,
}

impl AudioBuffer {
    pub fn new(channels: u16, sample_rate: u32, frames: usize) -> Self {
        let samples = vec![0.0; frames * channels as usize];
        Self {
            samples,
            channels,
            sample_rate,
            frames,
        }
    }

    /// Zero-duration placeholder buffer, substituted when a track fails to load
    pub fn empty() -> Self {
        Self {
            samples: Vec::new(),
            channels: 0,
            sample_rate: 0,
            frames: 0,
        }
    }

    pub fn from_samples(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let frames = if channels > 0 {
            samples.len() / channels as usize
        } else {
            0
        };
        Self {
            samples,
            channels,
            sample_rate,
            frames,
        }
    }

    /// Get the total number of samples
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get duration of this buffer
    pub fn duration(&self) -> Duration {
        if self.sample_rate > 0 {
            Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
        } else {
            Duration::from_secs(0)
        }
    }
}

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Get a human-readable string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the player state for display purposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub track: Option<String>,
    pub position: Duration,
    pub duration: Duration,
    pub gain: f32,
}

impl PlayerStatus {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Stopped,
            track: None,
            position: Duration::from_secs(0),
            duration: Duration::from_secs(0),
            gain: 1.0,
        }
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing)
    }

    /// Check if currently paused
    pub fn is_paused(&self) -> bool {
        matches!(self.state, PlaybackState::Paused)
    }

    /// Get progress as a fraction (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if self.duration.as_secs_f32() > 0.0 {
            self.position.as_secs_f32() / self.duration.as_secs_f32()
        } else {
            0.0
        }
    }

    /// True when less than 20 seconds of the track remain
    pub fn near_end(&self) -> bool {
        self.duration > Duration::from_secs(0)
            && self.duration.saturating_sub(self.position) < Duration::from_secs(20)
    }

    /// Format position as M:SS
    pub fn position_formatted(&self) -> String {
        format_mmss(self.position)
    }

    /// Format duration as M:SS
    pub fn duration_formatted(&self) -> String {
        format_mmss(self.duration)
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration as M:SS with zero-padded seconds
pub fn format_mmss(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}
