use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::CallbackFlow;
use crate::error::AudioError;

use super::{
    FaultFn, OutputBackend, OutputDevice, OutputStream, RenderFn, StreamFault, StreamHooks,
    StreamRequest,
};

const STUB_DEVICE: &str = "stub";

/// In-process backend used for deterministic testing and headless tooling.
///
/// No audio thread exists: callers drive the open stream with [`pump`], which
/// runs the render hook on the calling thread. Cloning shares the same
/// device, so a test can keep a handle after moving one into the engine.
///
/// [`pump`]: StubBackend::pump
#[derive(Clone)]
pub struct StubBackend {
    shared: Arc<StubShared>,
}

struct StubShared {
    devices: Vec<String>,
    fail_open: AtomicBool,
    open_count: AtomicUsize,
    next_id: AtomicU64,
    last_request: Mutex<Option<StreamRequest>>,
    live: Mutex<Option<LiveStream>>,
}

struct LiveStream {
    id: u64,
    channels: u16,
    render: RenderFn,
    fault: FaultFn,
    stopped: bool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::with_devices(vec![STUB_DEVICE.to_string()])
    }

    /// Stub exposing the given device names; the first one is the default.
    pub fn with_devices(devices: Vec<String>) -> Self {
        Self {
            shared: Arc::new(StubShared {
                devices,
                fail_open: AtomicBool::new(false),
                open_count: AtomicUsize::new(0),
                next_id: AtomicU64::new(1),
                last_request: Mutex::new(None),
                live: Mutex::new(None),
            }),
        }
    }

    /// Stub whose `open` always fails, as if the device were unusable.
    pub fn failing() -> Self {
        let backend = Self::new();
        backend.set_fail_open(true);
        backend
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `open` calls so far
    pub fn open_count(&self) -> usize {
        self.shared.open_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<StreamRequest> {
        self.shared
            .last_request
            .lock()
            .ok()
            .and_then(|req| req.clone())
    }

    pub fn is_open(&self) -> bool {
        self.shared
            .live
            .lock()
            .map(|live| live.is_some())
            .unwrap_or(false)
    }

    /// Run one render callback of `frames` frames.
    ///
    /// Returns `None` when no stream is open. Once the render hook has asked
    /// to stop, later pumps return silence and `Stop` without calling it.
    pub fn pump(&self, frames: usize) -> Option<(Vec<f32>, CallbackFlow)> {
        let mut live = self.shared.live.lock().ok()?;
        let stream = live.as_mut()?;
        let mut out = vec![0.0; frames * stream.channels as usize];
        if stream.stopped {
            return Some((out, CallbackFlow::Stop));
        }
        let flow = (stream.render)(&mut out);
        if flow == CallbackFlow::Stop {
            stream.stopped = true;
        }
        Some((out, flow))
    }

    /// Deliver a device error to the open stream's fault hook.
    pub fn inject_fault(&self, fatal: bool, message: &str) -> bool {
        let Ok(mut live) = self.shared.live.lock() else {
            return false;
        };
        match live.as_mut() {
            Some(stream) => {
                (stream.fault)(StreamFault {
                    fatal,
                    message: message.to_string(),
                });
                true
            }
            None => false,
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct StubStream {
    shared: Arc<StubShared>,
    id: u64,
    device_name: String,
}

impl OutputStream for StubStream {
    fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for StubStream {
    fn drop(&mut self) {
        if let Ok(mut live) = self.shared.live.lock() {
            if live.as_ref().map(|s| s.id) == Some(self.id) {
                *live = None;
            }
        }
    }
}

impl OutputBackend for StubBackend {
    fn devices(&self) -> Result<Vec<OutputDevice>, AudioError> {
        Ok(self
            .shared
            .devices
            .iter()
            .enumerate()
            .map(|(i, name)| OutputDevice {
                name: name.clone(),
                is_default: i == 0,
            })
            .collect())
    }

    fn default_device(&self) -> Option<String> {
        self.shared.devices.first().cloned()
    }

    fn open(
        &self,
        request: &StreamRequest,
        hooks: StreamHooks,
    ) -> Result<Box<dyn OutputStream>, AudioError> {
        if self.shared.fail_open.load(Ordering::SeqCst) {
            return Err(AudioError::StreamOpenFailed {
                reason: "stub device configured to fail".to_string(),
            });
        }

        let device_name = match &request.device {
            Some(name) if self.shared.devices.contains(name) => name.clone(),
            Some(name) => {
                return Err(AudioError::DeviceNotFound { name: name.clone() });
            }
            None => self
                .default_device()
                .ok_or_else(|| AudioError::StreamOpenFailed {
                    reason: "No default output device found".to_string(),
                })?,
        };

        let mut live = self
            .shared
            .live
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "stub stream".to_string(),
            })?;
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        *live = Some(LiveStream {
            id,
            channels: request.channels,
            render: hooks.render,
            fault: hooks.fault,
            stopped: false,
        });
        drop(live);

        if let Ok(mut last) = self.shared.last_request.lock() {
            *last = Some(request.clone());
        }
        self.shared.open_count.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(StubStream {
            shared: Arc::clone(&self.shared),
            id,
            device_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(device: Option<&str>) -> StreamRequest {
        StreamRequest {
            device: device.map(str::to_string),
            channels: 2,
            sample_rate: 48_000,
            chunk_size: 64,
        }
    }

    fn hooks(value: f32) -> StreamHooks {
        StreamHooks {
            render: Box::new(move |out| {
                out.fill(value);
                CallbackFlow::Continue
            }),
            fault: Box::new(|_| {}),
        }
    }

    #[test]
    fn test_pump_runs_render_hook() {
        let backend = StubBackend::new();
        assert!(backend.pump(4).is_none());

        let stream = backend.open(&request(None), hooks(0.5)).unwrap();
        assert_eq!(stream.device_name(), "stub");
        let (out, flow) = backend.pump(4).unwrap();
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|&s| s == 0.5));
        assert_eq!(flow, CallbackFlow::Continue);

        drop(stream);
        assert!(!backend.is_open());
        assert!(backend.pump(4).is_none());
    }

    #[test]
    fn test_failing_backend_rejects_open() {
        let backend = StubBackend::failing();
        let err = backend.open(&request(None), hooks(0.0)).err().unwrap();
        assert!(matches!(err, AudioError::StreamOpenFailed { .. }));
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn test_unknown_device_rejected() {
        let backend = StubBackend::with_devices(vec!["a".into(), "b".into()]);
        let err = backend.open(&request(Some("c")), hooks(0.0)).err().unwrap();
        assert_eq!(err, AudioError::DeviceNotFound { name: "c".into() });

        let stream = backend.open(&request(Some("b")), hooks(0.0)).unwrap();
        assert_eq!(stream.device_name(), "b");
        assert_eq!(backend.last_request().unwrap().device.as_deref(), Some("b"));
    }

    #[test]
    fn test_devices_mark_default() {
        let backend = StubBackend::with_devices(vec!["a".into(), "b".into()]);
        let devices = backend.devices().unwrap();
        assert!(devices[0].is_default);
        assert!(!devices[1].is_default);
        assert_eq!(backend.default_device().as_deref(), Some("a"));
    }

    #[test]
    fn test_stale_stream_drop_keeps_newer_stream() {
        let backend = StubBackend::new();
        let first = backend.open(&request(None), hooks(0.1)).unwrap();
        let _second = backend.open(&request(None), hooks(0.2)).unwrap();
        drop(first);
        assert!(backend.is_open());
        let (out, _) = backend.pump(1).unwrap();
        assert_eq!(out[0], 0.2);
    }
}
