//! # Voice Recorder
//!
//! An explicit state machine over the microphone:
//!
//! ```text
//!            start             pause
//!   Idle ───────────▶ Recording ◀────▶ Paused
//!    ▲                    │    resume     │
//!    │ clear / take_clip  │ stop          │ stop
//!    │                    ▼               │
//!    └─────────────── Stopped ◀──────────┘
//! ```
//!
//! Any other transition is rejected with [`RecorderError::InvalidTransition`].
//! The microphone is held only between `start` and `stop`; the staged preview
//! file lives until `clear`, `take_clip`, or drop.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::Upload;
use crate::audio::{CaptureDevice, CaptureError, CaptureStream, CapturedAudio, encode_wav};

/// What happens to the clip when recording stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Send the clip as an audio message right away.
    AutoSend,
    /// Keep the clip for preview until it is sent or cleared.
    #[default]
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecorderState::Idle => "idle",
            RecorderState::Recording => "recording",
            RecorderState::Paused => "paused",
            RecorderState::Stopped => "stopped",
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecorderError {
    #[error("Cannot {op} while {state}")]
    InvalidTransition { op: &'static str, state: RecorderState },
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),
    #[error("Audio device error: {0}")]
    Device(String),
}

impl From<CaptureError> for RecorderError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(reason) => RecorderError::PermissionDenied(reason),
            CaptureError::Device(reason) => RecorderError::Device(reason),
        }
    }
}

/// A finished recording, encoded as WAV.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub wav: Vec<u8>,
    pub duration_secs: f32,
}

impl AudioClip {
    pub const MIME: &'static str = "audio/wav";

    pub fn from_capture(audio: &CapturedAudio) -> Self {
        Self {
            wav: encode_wav(audio),
            duration_secs: audio.duration_secs(),
        }
    }

    pub fn into_upload(self) -> Upload {
        Upload {
            file_name: "voice-note.wav".to_string(),
            mime: Self::MIME.to_string(),
            bytes: self.wav,
        }
    }
}

/// Result of `stop`, depending on the policy.
#[derive(Debug, PartialEq)]
pub enum StopOutcome {
    /// Auto-send policy: the clip to send now.
    Send(AudioClip),
    /// Stage policy: the clip is kept for preview.
    Staged,
}

struct StagedClip {
    clip: AudioClip,
    preview: Option<PathBuf>,
}

static PREVIEW_COUNTER: AtomicU64 = AtomicU64::new(0);

fn write_preview(dir: &Path, clip: &AudioClip) -> Option<PathBuf> {
    let n = PREVIEW_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = dir.join(format!("slash-voice-{}-{}.wav", std::process::id(), n));
    match fs::write(&path, &clip.wav) {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Could not write voice preview {}: {}", path.display(), e);
            None
        }
    }
}

fn remove_preview(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Could not remove voice preview {}: {}", path.display(), e);
    }
}

pub struct VoiceRecorder {
    device: Box<dyn CaptureDevice>,
    policy: StopPolicy,
    state: RecorderState,
    stream: Option<Box<dyn CaptureStream>>,
    elapsed_secs: u64,
    staged: Option<StagedClip>,
    preview_dir: PathBuf,
}

impl VoiceRecorder {
    pub fn new(device: Box<dyn CaptureDevice>, policy: StopPolicy) -> Self {
        Self {
            device,
            policy,
            state: RecorderState::Idle,
            stream: None,
            elapsed_secs: 0,
            staged: None,
            preview_dir: std::env::temp_dir(),
        }
    }

    /// Write staged previews somewhere other than the system temp dir.
    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = dir.into();
        self
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn policy(&self) -> StopPolicy {
        self.policy
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Whether the microphone is currently acquired.
    pub fn holds_device(&self) -> bool {
        self.stream.is_some()
    }

    pub fn staged(&self) -> Option<&AudioClip> {
        self.staged.as_ref().map(|s| &s.clip)
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.staged.as_ref().and_then(|s| s.preview.as_deref())
    }

    /// Whether the clock should be ticking.
    pub fn is_active(&self) -> bool {
        matches!(self.state, RecorderState::Recording | RecorderState::Paused)
    }

    fn invalid(&self, op: &'static str) -> RecorderError {
        RecorderError::InvalidTransition { op, state: self.state }
    }

    /// Acquire the microphone and begin capturing.
    ///
    /// On refusal the recorder stays `Idle` and nothing is held.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        let can_start = match self.state {
            RecorderState::Idle => true,
            RecorderState::Stopped => self.staged.is_none(),
            RecorderState::Recording | RecorderState::Paused => false,
        };
        if !can_start {
            return Err(self.invalid("start recording"));
        }

        match self.device.open() {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = RecorderState::Recording;
                self.elapsed_secs = 0;
                info!("Voice recording started");
                Ok(())
            }
            Err(e) => {
                self.state = RecorderState::Idle;
                warn!("Voice recording could not start: {}", e);
                Err(e.into())
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), RecorderError> {
        if self.state != RecorderState::Recording {
            return Err(self.invalid("pause"));
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.set_paused(true);
        }
        self.state = RecorderState::Paused;
        debug!("Voice recording paused at {}s", self.elapsed_secs);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), RecorderError> {
        if self.state != RecorderState::Paused {
            return Err(self.invalid("resume"));
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.set_paused(false);
        }
        self.state = RecorderState::Recording;
        debug!("Voice recording resumed");
        Ok(())
    }

    /// Advance the elapsed-time counter; called once per second.
    pub fn tick(&mut self) {
        if self.state == RecorderState::Recording {
            self.elapsed_secs += 1;
        }
    }

    /// Finalize the capture into a clip and release the microphone.
    pub fn stop(&mut self) -> Result<StopOutcome, RecorderError> {
        if !self.is_active() {
            return Err(self.invalid("stop"));
        }
        let captured = self
            .stream
            .take()
            .map(|stream| stream.finish())
            .unwrap_or_default();
        self.state = RecorderState::Stopped;
        let clip = AudioClip::from_capture(&captured);
        info!("Voice recording stopped ({:.1}s captured)", clip.duration_secs);

        match self.policy {
            StopPolicy::AutoSend => Ok(StopOutcome::Send(clip)),
            StopPolicy::Stage => {
                let preview = write_preview(&self.preview_dir, &clip);
                self.staged = Some(StagedClip { clip, preview });
                Ok(StopOutcome::Staged)
            }
        }
    }

    /// Discard the staged clip and its preview.
    pub fn clear(&mut self) -> Result<(), RecorderError> {
        let staged = match (self.state, self.staged.take()) {
            (RecorderState::Stopped, Some(staged)) => staged,
            (_, other) => {
                self.staged = other;
                return Err(self.invalid("clear the recording"));
            }
        };
        if let Some(path) = &staged.preview {
            remove_preview(path);
        }
        self.reset();
        Ok(())
    }

    /// Hand the staged clip over for sending; the preview is released.
    pub fn take_clip(&mut self) -> Result<AudioClip, RecorderError> {
        let staged = match (self.state, self.staged.take()) {
            (RecorderState::Stopped, Some(staged)) => staged,
            (_, other) => {
                self.staged = other;
                return Err(self.invalid("send the recording"));
            }
        };
        if let Some(path) = &staged.preview {
            remove_preview(path);
        }
        self.reset();
        Ok(staged.clip)
    }

    /// Abandon whatever is in progress from any state: the microphone is
    /// released, the staged clip and its preview are dropped.
    pub fn discard(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.finish();
            debug!("Microphone released");
        }
        if let Some(path) = self.staged.take().and_then(|s| s.preview) {
            remove_preview(&path);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = RecorderState::Idle;
        self.elapsed_secs = 0;
    }
}

impl Drop for VoiceRecorder {
    fn drop(&mut self) {
        self.discard();
    }
}

/// `mm:ss` for the recorder bar.
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeCapture;

    fn recorder(policy: StopPolicy) -> (VoiceRecorder, FakeCapture, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let device = FakeCapture::granting(vec![0.25; 8_000]);
        let recorder =
            VoiceRecorder::new(Box::new(device.clone()), policy).with_preview_dir(dir.path());
        (recorder, device, dir)
    }

    #[test]
    fn test_full_cycle_with_staging() {
        let (mut rec, device, _dir) = recorder(StopPolicy::Stage);
        assert_eq!(rec.state(), RecorderState::Idle);

        rec.start().unwrap();
        assert_eq!(rec.state(), RecorderState::Recording);
        assert!(device.is_acquired());

        rec.pause().unwrap();
        assert_eq!(rec.state(), RecorderState::Paused);
        assert!(device.is_paused());
        rec.resume().unwrap();
        assert_eq!(rec.state(), RecorderState::Recording);

        assert_eq!(rec.stop().unwrap(), StopOutcome::Staged);
        assert_eq!(rec.state(), RecorderState::Stopped);
        assert!(!device.is_acquired());
        assert!(!rec.holds_device());

        let clip = rec.staged().unwrap();
        assert!((clip.duration_secs - 1.0).abs() < 0.01);
        let preview = rec.preview_path().unwrap().to_path_buf();
        assert!(preview.exists());

        rec.clear().unwrap();
        assert_eq!(rec.state(), RecorderState::Idle);
        assert!(rec.staged().is_none());
        assert!(!preview.exists());
    }

    #[test]
    fn test_auto_send_returns_clip_and_releases_device() {
        let (mut rec, device, _dir) = recorder(StopPolicy::AutoSend);
        rec.start().unwrap();
        match rec.stop().unwrap() {
            StopOutcome::Send(clip) => assert_eq!(&clip.wav[0..4], b"RIFF"),
            StopOutcome::Staged => panic!("auto-send should not stage"),
        }
        assert!(!device.is_acquired());
        assert_eq!(rec.state(), RecorderState::Stopped);
        assert!(rec.staged().is_none());
        // A new recording can start straight away.
        rec.start().unwrap();
        assert_eq!(rec.state(), RecorderState::Recording);
    }

    #[test]
    fn test_permission_denied_stays_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = VoiceRecorder::new(Box::new(FakeCapture::denying()), StopPolicy::Stage)
            .with_preview_dir(dir.path());
        let err = rec.start().unwrap_err();
        assert!(matches!(err, RecorderError::PermissionDenied(_)));
        assert_eq!(rec.state(), RecorderState::Idle);
        assert!(!rec.holds_device());
        assert!(rec.staged().is_none());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let (mut rec, _device, _dir) = recorder(StopPolicy::Stage);
        assert!(matches!(
            rec.pause(),
            Err(RecorderError::InvalidTransition { state: RecorderState::Idle, .. })
        ));
        assert!(rec.resume().is_err());
        assert!(rec.stop().is_err());
        assert!(rec.clear().is_err());

        rec.start().unwrap();
        assert!(rec.start().is_err());
        assert!(rec.resume().is_err());
        rec.stop().unwrap();
        // A staged clip must be sent or cleared first.
        assert!(rec.start().is_err());
        assert!(rec.pause().is_err());
    }

    #[test]
    fn test_tick_only_counts_while_recording() {
        let (mut rec, _device, _dir) = recorder(StopPolicy::Stage);
        rec.tick();
        assert_eq!(rec.elapsed_secs(), 0);
        rec.start().unwrap();
        rec.tick();
        rec.tick();
        rec.pause().unwrap();
        rec.tick();
        assert_eq!(rec.elapsed_secs(), 2);
        rec.resume().unwrap();
        rec.tick();
        assert_eq!(rec.elapsed_secs(), 3);
    }

    #[test]
    fn test_take_clip_resets_to_idle() {
        let (mut rec, _device, _dir) = recorder(StopPolicy::Stage);
        rec.start().unwrap();
        rec.stop().unwrap();
        let clip = rec.take_clip().unwrap();
        assert_eq!(clip.into_upload().mime, "audio/wav");
        assert_eq!(rec.state(), RecorderState::Idle);
        assert!(rec.take_clip().is_err());
    }

    #[test]
    fn test_drop_releases_device_and_preview() {
        let (mut rec, device, _dir) = recorder(StopPolicy::Stage);
        rec.start().unwrap();
        drop(rec);
        assert!(!device.is_acquired());

        let (mut rec, _device, _dir) = recorder(StopPolicy::Stage);
        rec.start().unwrap();
        rec.stop().unwrap();
        let preview = rec.preview_path().unwrap().to_path_buf();
        drop(rec);
        assert!(!preview.exists());
    }

    #[test]
    fn test_discard_from_any_state() {
        let (mut rec, device, _dir) = recorder(StopPolicy::Stage);
        rec.start().unwrap();
        rec.pause().unwrap();
        rec.discard();
        assert_eq!(rec.state(), RecorderState::Idle);
        assert!(!device.is_acquired());

        rec.start().unwrap();
        rec.stop().unwrap();
        let preview = rec.preview_path().unwrap().to_path_buf();
        rec.discard();
        assert!(rec.staged().is_none());
        assert!(!preview.exists());
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(75), "01:15");
    }
}
