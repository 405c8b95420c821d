//! Native microphone capture via `cpal`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info, warn};

use super::{CaptureDevice, CaptureError, CaptureStream, CapturedAudio};

/// Opens the host's default input device.
pub struct CpalCapture;

impl CpalCapture {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for CpalCapture {
    fn open(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            CaptureError::PermissionDenied("No microphone available or access was refused".to_string())
        })?;
        info!("Using input device {:?}", device.name());

        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?
            .config();

        let samples = Arc::new(Mutex::new(Vec::new()));
        let paused = Arc::new(AtomicBool::new(false));

        let sink = samples.clone();
        let gate = paused.clone();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    if gate.load(Ordering::Relaxed) {
                        return;
                    }
                    match sink.lock() {
                        Ok(mut buffer) => buffer.extend_from_slice(data),
                        Err(_) => warn!("Capture buffer poisoned, dropping chunk"),
                    }
                },
                move |err| {
                    error!("Audio input error: {err}");
                },
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => {
                    CaptureError::PermissionDenied("Microphone is not available".to_string())
                }
                other => CaptureError::Device(other.to_string()),
            })?;

        stream
            .play()
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        debug!(
            "Capture started ({} Hz, {} channel(s))",
            config.sample_rate.0, config.channels
        );

        Ok(Box::new(CpalStream {
            stream,
            samples,
            paused,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        }))
    }
}

struct CpalStream {
    stream: cpal::Stream,
    samples: Arc<Mutex<Vec<f32>>>,
    paused: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
}

impl CaptureStream for CpalStream {
    fn set_paused(&mut self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        let result = if paused { self.stream.pause() } else { self.stream.play() };
        if let Err(e) = result {
            warn!("Failed to toggle capture stream: {e}");
        }
    }

    fn finish(self: Box<Self>) -> CapturedAudio {
        let CpalStream {
            stream,
            samples,
            sample_rate,
            channels,
            ..
        } = *self;
        // Dropping the stream closes the device.
        drop(stream);
        let samples = match samples.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        debug!("Capture finished: {} samples", samples.len());
        CapturedAudio {
            samples,
            sample_rate,
            channels,
        }
    }
}
