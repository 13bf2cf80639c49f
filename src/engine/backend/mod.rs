//! Backend abstractions for the playback engine.
//!
//! A backend owns device I/O only. The engine hands it a [`StreamRequest`]
//! and a pair of hooks; the backend drives the render hook from its audio
//! thread and reports device problems through the fault hook. Dropping the
//! returned [`OutputStream`] closes the stream.

use serde::{Deserialize, Serialize};

use crate::audio::CallbackFlow;
use crate::error::AudioError;

/// Format and device for a new output stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Device name; `None` selects the backend default
    pub device: Option<String>,
    pub channels: u16,
    pub sample_rate: u32,
    /// Preferred callback size in frames
    pub chunk_size: u32,
}

/// An output device as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDevice {
    pub name: String,
    pub is_default: bool,
}

/// Problem reported by the device while a stream is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFault {
    /// The stream cannot continue (device unplugged, host died)
    pub fatal: bool,
    pub message: String,
}

pub type RenderFn = Box<dyn FnMut(&mut [f32]) -> CallbackFlow + Send + 'static>;
pub type FaultFn = Box<dyn FnMut(StreamFault) + Send + 'static>;

/// Callbacks a backend invokes from its audio thread
pub struct StreamHooks {
    pub render: RenderFn,
    pub fault: FaultFn,
}

/// Handle to an open stream; dropping it closes the stream.
pub trait OutputStream {
    fn device_name(&self) -> &str;
}

/// Trait implemented by platform audio output backends.
pub trait OutputBackend: Send + Sync {
    fn devices(&self) -> Result<Vec<OutputDevice>, AudioError>;

    fn default_device(&self) -> Option<String>;

    /// Open and start a stream. The render hook may be called before this
    /// returns.
    fn open(
        &self,
        request: &StreamRequest,
        hooks: StreamHooks,
    ) -> Result<Box<dyn OutputStream>, AudioError>;
}

mod cpal;
pub use self::cpal::CpalBackend;

mod desktop_stub;
pub use desktop_stub::StubBackend;
