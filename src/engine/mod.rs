//! Engine module housing the playback core.
//!
//! `backend` holds the device seam (`OutputBackend`) with cpal and stub
//! implementations; `core` holds the `PlaybackEngine` orchestration layer.

pub mod backend;
pub mod core;
mod events;

pub use backend::{
    CpalBackend, OutputBackend, OutputDevice, OutputStream, StreamFault, StreamHooks,
    StreamRequest, StubBackend,
};
pub use core::{PlaybackEngine, PlaybackState, PlaybackStatus};
pub use events::HandlerId;
