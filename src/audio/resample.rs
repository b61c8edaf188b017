use crate::models::AudioBuffer;

/// Convert a fully decoded buffer to the device's sample rate and channel
/// layout, producing interleaved f32 samples ready for the output stream.
///
/// Linear interpolation is used for rate conversion; buffers are decoded
/// whole before playback, so no streaming state is needed.
pub fn convert_for_device(buffer: &AudioBuffer, dst_rate: u32, dst_channels: u16) -> Vec<f32> {
    if buffer.is_empty() || dst_rate == 0 || dst_channels == 0 {
        return Vec::new();
    }

    let mixed = if buffer.channels == dst_channels {
        buffer.samples.clone()
    } else {
        mix_channels(
            &buffer.samples,
            buffer.channels as usize,
            dst_channels as usize,
        )
    };

    if buffer.sample_rate == dst_rate {
        mixed
    } else {
        resample_linear(
            &mixed,
            dst_channels as usize,
            buffer.sample_rate,
            dst_rate,
        )
    }
}

/// Remap interleaved frames from `src_ch` channels to `dst_ch` channels.
fn mix_channels(samples: &[f32], src_ch: usize, dst_ch: usize) -> Vec<f32> {
    let frames = samples.len() / src_ch;
    let mut out = Vec::with_capacity(frames * dst_ch);

    if dst_ch == 1 {
        // Downmix by averaging channels
        for f in 0..frames {
            let mut acc = 0.0f32;
            for c in 0..src_ch {
                acc += samples[f * src_ch + c];
            }
            out.push(acc / src_ch as f32);
        }
    } else if src_ch == 1 {
        // Upmix mono by duplicating
        for f in 0..frames {
            let s = samples[f];
            for _ in 0..dst_ch {
                out.push(s);
            }
        }
    } else {
        // Generic mapping: copy available channels, pad with silence
        for f in 0..frames {
            for c in 0..dst_ch {
                let s = if c < src_ch {
                    samples[f * src_ch + c]
                } else {
                    0.0
                };
                out.push(s);
            }
        }
    }

    out
}

/// Linearly interpolate interleaved frames from `src_rate` to `dst_rate`.
fn resample_linear(samples: &[f32], channels: usize, src_rate: u32, dst_rate: u32) -> Vec<f32> {
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }

    let step = src_rate as f64 / dst_rate as f64;
    let out_frames = (in_frames as f64 / step).round() as usize;
    let mut out = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let src_pos = i as f64 * step;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;
        let next = (idx + 1).min(in_frames - 1);

        for c in 0..channels {
            let a = samples[idx.min(in_frames - 1) * channels + c];
            let b = samples[next * channels + c];
            out.push(a + (b - a) * frac);
        }
    }

    out
}
