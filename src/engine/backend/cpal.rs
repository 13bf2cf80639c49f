//! CPAL-based output backend for desktop platforms (Linux, macOS, Windows)
//!
//! Streams are opened as interleaved f32. Before building a stream the device's
//! supported configurations are checked for the requested channel count and
//! sample rate, and a fixed callback size equal to the chunk size is used when
//! the device allows it.
//!
//! `cpal::Stream` is not `Send` on every host, so streams must be opened and
//! dropped on the same thread (the engine's playback thread).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::CallbackFlow;
use crate::error::AudioError;

use super::{OutputBackend, OutputDevice, OutputStream, StreamFault, StreamHooks, StreamRequest};

/// Output backend driving a cpal host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend {
    host_id: Option<cpal::HostId>,
}

impl CpalBackend {
    /// Backend on the platform default host
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend on a specific host (e.g. JACK instead of ALSA)
    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self {
            host_id: Some(host_id),
        }
    }

    fn host(&self) -> Result<cpal::Host, AudioError> {
        match self.host_id {
            Some(id) => cpal::host_from_id(id).map_err(|e| AudioError::HardwareError {
                details: format!("Audio host {:?} unavailable: {}", id, e),
            }),
            None => Ok(cpal::default_host()),
        }
    }

    fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, AudioError> {
        let Some(name) = name else {
            return host
                .default_output_device()
                .ok_or_else(|| AudioError::StreamOpenFailed {
                    reason: "No default output device found".to_string(),
                });
        };

        let devices = host
            .output_devices()
            .map_err(|e| AudioError::HardwareError {
                details: format!("Failed to enumerate output devices: {}", e),
            })?;
        for device in devices {
            if device.name().map(|n| n == name).unwrap_or(false) {
                return Ok(device);
            }
        }
        Err(AudioError::DeviceNotFound {
            name: name.to_string(),
        })
    }
}

/// Pick the stream config for `request`, rejecting devices that cannot play
/// it as interleaved f32.
fn check_output_settings(
    device: &cpal::Device,
    request: &StreamRequest,
) -> Result<cpal::StreamConfig, AudioError> {
    let supported = device
        .supported_output_configs()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to query output configs: {}", e),
        })?;

    let rate = cpal::SampleRate(request.sample_rate);
    let range = supported
        .filter(|c| c.channels() == request.channels)
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .find(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: format!(
                "Device does not support {} ch f32 at {} Hz",
                request.channels, request.sample_rate
            ),
        })?;

    let buffer_size = match range.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max }
            if (*min..=*max).contains(&request.chunk_size) =>
        {
            cpal::BufferSize::Fixed(request.chunk_size)
        }
        _ => cpal::BufferSize::Default,
    };

    Ok(cpal::StreamConfig {
        channels: request.channels,
        sample_rate: rate,
        buffer_size,
    })
}

struct CpalStream {
    _stream: cpal::Stream,
    device_name: String,
}

impl OutputStream for CpalStream {
    fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl OutputBackend for CpalBackend {
    fn devices(&self) -> Result<Vec<OutputDevice>, AudioError> {
        let host = self.host()?;
        let default_name = host.default_output_device().and_then(|d| d.name().ok());
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::HardwareError {
                details: format!("Failed to enumerate output devices: {}", e),
            })?;

        Ok(devices
            .filter_map(|d| d.name().ok())
            .map(|name| OutputDevice {
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            })
            .collect())
    }

    fn default_device(&self) -> Option<String> {
        self.host()
            .ok()?
            .default_output_device()
            .and_then(|d| d.name().ok())
    }

    fn open(
        &self,
        request: &StreamRequest,
        hooks: StreamHooks,
    ) -> Result<Box<dyn OutputStream>, AudioError> {
        let host = self.host()?;
        let device = Self::find_device(&host, request.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let config = check_output_settings(&device, request)?;

        log::info!(
            "[CpalBackend] Opening '{}': {} ch @ {} Hz, buffer {:?}",
            device_name,
            config.channels,
            config.sample_rate.0,
            config.buffer_size
        );

        let StreamHooks {
            mut render,
            mut fault,
        } = hooks;
        let mut stopped = false;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if stopped {
                        data.fill(0.0);
                        return;
                    }
                    if render(data) == CallbackFlow::Stop {
                        stopped = true;
                    }
                },
                move |err| {
                    let fatal = matches!(err, cpal::StreamError::DeviceNotAvailable);
                    fault(StreamFault {
                        fatal,
                        message: err.to_string(),
                    });
                },
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;

        stream.play().map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Output start failed: {}", e),
        })?;

        Ok(Box::new(CpalStream {
            _stream: stream,
            device_name,
        }))
    }
}
