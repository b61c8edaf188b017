use std::io::Cursor;

use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::LoadError;
use crate::models::AudioBuffer;

/// Decode a complete in-memory audio stream into an interleaved f32 buffer.
///
/// The locator is only used for the format hint and error reporting; the
/// bytes may come from the local filesystem or an HTTP fetch.
pub fn decode_bytes(locator: &str, bytes: Vec<u8>) -> Result<AudioBuffer, LoadError> {
    let decode_err = |reason: String| LoadError::Decode {
        locator: locator.to_string(),
        reason,
    };

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = locator.rsplit('.').next() {
        if extension != locator {
            hint.with_extension(extension);
        }
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_err(format!("probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| decode_err("no audio track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels: u16 = 0;
    let mut sample_rate: u32 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_err(format!("read failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                if channels == 0 {
                    channels = spec.channels.count() as u16;
                    sample_rate = spec.rate;
                }
                let capacity = decoded.capacity() as u64;
                let mut sample_buf = SampleBuffer::<f32>::new(capacity, spec);
                sample_buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(sample_buf.samples());
            }
            // Malformed packets are skippable; bail out on anything else
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("skipping undecodable packet in '{}': {}", locator, e);
                continue;
            }
            Err(e) => return Err(decode_err(format!("decode failed: {}", e))),
        }
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(decode_err("no audio data decoded".to_string()));
    }

    let buffer = AudioBuffer::from_samples(samples, channels, sample_rate);
    debug!(
        "decoded '{}': {:.2}s, {} Hz, {} channel(s)",
        locator,
        buffer.duration().as_secs_f64(),
        buffer.sample_rate,
        buffer.channels
    );
    Ok(buffer)
}

/// Build a 16-bit PCM WAV byte stream for decode and playlist tests.
#[cfg(test)]
pub(crate) fn pcm_wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
    let bits_per_sample = 16u16;
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = (frames * block_align as usize) as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..frames * channels as usize {
        let value = (((i % 64) as i16) - 32) * 256;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}
