// Audio module - playback buffers, transport state and the render callback

pub mod buffer;
pub mod callback;
pub mod transport;
pub mod wav;

pub use buffer::AudioBuffer;
pub use callback::{CallbackFlow, PlaybackCallback};
pub use transport::{PlaybackEvent, SessionSignals, TransportState};
pub use wav::load_wav;
