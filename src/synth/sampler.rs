use std::io::Cursor;
use std::sync::Arc;

use crate::error::EngineError;

/// Decoded mono sample data at the engine sample rate
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode WAV bytes to mono f32 at `target_sr`
pub fn decode_wav(bytes: &[u8], target_sr: u32) -> Result<SampleBuffer, EngineError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| EngineError::DecodeFailure(e.to_string()))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let wav_sr = spec.sample_rate as f32;

    // Read all samples and convert to f32
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .filter_map(|s| s.ok())
            .collect(),
    };

    if samples.is_empty() {
        return Err(EngineError::DecodeFailure("WAV data is empty".to_string()));
    }

    // Convert to mono (average channels)
    let mono: Vec<f32> = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok(SampleBuffer::new(
        resample_linear(mono, wav_sr, target_sr as f32),
        target_sr,
    ))
}

/// Resample if needed (simple linear interpolation)
fn resample_linear(mono: Vec<f32>, from_sr: f32, to_sr: f32) -> Vec<f32> {
    if (from_sr - to_sr).abs() <= 1.0 || from_sr <= 0.0 || to_sr <= 0.0 {
        return mono;
    }
    let ratio = from_sr as f64 / to_sr as f64;
    let new_len = (mono.len() as f64 / ratio) as usize;
    let mut resampled = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let s0 = mono.get(idx).copied().unwrap_or(0.0);
        let s1 = mono.get(idx + 1).copied().unwrap_or(s0);
        resampled.push(s0 + (s1 - s0) * frac);
    }
    resampled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, frames: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in frames {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono() {
        let bytes = wav_bytes(1, 44100, &[0, 16384, -16384, 32767]);
        let buf = decode_wav(&bytes, 44100).unwrap();
        assert_eq!(buf.len(), 4);
        assert!((buf.samples()[1] - 0.5).abs() < 1e-4);
        assert!((buf.samples()[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_stereo_mixes_down() {
        let bytes = wav_bytes(2, 44100, &[16384, 0, 0, -16384]);
        let buf = decode_wav(&bytes, 44100).unwrap();
        assert_eq!(buf.len(), 2);
        assert!((buf.samples()[0] - 0.25).abs() < 1e-4);
        assert!((buf.samples()[1] + 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_decode_resamples() {
        let frames = vec![1000i16; 22050];
        let bytes = wav_bytes(1, 22050, &frames);
        let buf = decode_wav(&bytes, 44100).unwrap();
        assert_eq!(buf.len(), 44100);
        assert_eq!(buf.sample_rate(), 44100);
        assert!((buf.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let err = decode_wav(b"definitely not a wav file", 44100).unwrap_err();
        assert!(matches!(err, EngineError::DecodeFailure(_)));
    }
}
