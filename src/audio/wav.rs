// WAV decoding into playback buffers

use std::path::Path;

use crate::error::AudioError;

use super::buffer::AudioBuffer;

/// Decode a PCM integer or float WAV file into an interleaved [`AudioBuffer`].
///
/// Integer samples are scaled by `1 / 2^(bits - 1)` so full scale maps to
/// `[-1.0, 1.0)`.
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer, AudioError> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path).map_err(|err| AudioError::InvalidBuffer {
        reason: format!("failed to open {}: {err}", path.display()),
    })?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::InvalidBuffer {
                    reason: format!(
                        "unsupported bits_per_sample={} for {}",
                        spec.bits_per_sample,
                        path.display()
                    ),
                });
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 * scale))
                .collect::<Result<Vec<f32>, _>>()?
        }
    };

    log::info!(
        "[Wav] Loaded {}: {} Hz, {} ch, {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    AudioBuffer::new(samples, spec.channels, spec.sample_rate)
}
