//! # Audio Capture
//!
//! The platform microphone, seen through two small traits so the voice
//! recorder never touches a concrete audio backend:
//!
//! - [`CaptureDevice`] opens the microphone (this is where access is granted or refused).
//! - [`CaptureStream`] is a live capture; dropping it or calling `finish` releases the device.
//!
//! The native backend (`cpal`) is compiled in with the `mic` feature. Without
//! it, [`default_device`] returns a device that always refuses access.

#[cfg(feature = "mic")]
mod microphone;

use thiserror::Error;

#[cfg(feature = "mic")]
pub use microphone::CpalCapture;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Device(String),
}

/// Raw samples collected from a capture, interleaved by channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl CapturedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

/// A source of microphone access.
pub trait CaptureDevice {
    /// Acquire the microphone and start capturing.
    fn open(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// A live capture holding the microphone.
pub trait CaptureStream {
    /// Stop or restart appending incoming chunks without releasing the device.
    fn set_paused(&mut self, paused: bool);

    /// Release the device and hand back everything captured.
    fn finish(self: Box<Self>) -> CapturedAudio;
}

/// Used when no audio backend is available; every `open` is refused.
pub struct DeniedCapture {
    reason: String,
}

impl DeniedCapture {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl CaptureDevice for DeniedCapture {
    fn open(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        Err(CaptureError::PermissionDenied(self.reason.clone()))
    }
}

/// The best capture device this build supports.
pub fn default_device() -> Box<dyn CaptureDevice> {
    #[cfg(feature = "mic")]
    {
        Box::new(CpalCapture::new())
    }
    #[cfg(not(feature = "mic"))]
    {
        Box::new(DeniedCapture::new(
            "Microphone support is not compiled in (rebuild with --features mic)",
        ))
    }
}

/// Encode samples as a 16-bit PCM WAV file.
pub fn encode_wav(audio: &CapturedAudio) -> Vec<u8> {
    const HEADER_LEN: usize = 44;
    let channels = audio.channels.max(1);
    let bytes_per_sample: u16 = 2;
    let data_len = (audio.samples.len() * bytes_per_sample as usize) as u32;
    let byte_rate = audio.sample_rate * channels as u32 * bytes_per_sample as u32;
    let block_align = channels * bytes_per_sample;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&audio.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&(bytes_per_sample * 8).to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in &audio.samples {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&scaled.to_le_bytes());
    }
    out
}
