use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("{} contains no audio", path.display())]
    Empty { path: PathBuf },
    #[error("{}: unsupported {bits}-bit {format:?} samples", path.display())]
    Unsupported {
        path: PathBuf,
        bits: u16,
        format: SampleFormat,
    },
}

/// A fully decoded clip: interleaved `f32` samples in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl Track {
    pub fn new(samples: impl Into<Arc<[f32]>>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels: channels.max(1),
            sample_rate,
        }
    }

    pub fn from_wav(path: &Path) -> Result<Self, AudioError> {
        let decode = |source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let reader = WavReader::open(path).map_err(decode)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(decode)?,
            (SampleFormat::Int, bits @ 1..=32) => {
                let full_scale = (1i64 << (bits - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()
                    .map_err(decode)?
            }
            (format, bits) => {
                return Err(AudioError::Unsupported {
                    path: path.to_path_buf(),
                    bits,
                    format,
                });
            }
        };

        if samples.len() < usize::from(spec.channels.max(1)) {
            return Err(AudioError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::new(samples, spec.channels, spec.sample_rate))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Sample of `channel` in `frame`, with the frame index wrapped around the clip
    pub fn sample(&self, frame: usize, channel: u16) -> f32 {
        let frames = self.frames();
        if frames == 0 {
            return 0.0;
        }
        let idx = (frame % frames) * usize::from(self.channels) + usize::from(channel);
        self.samples.get(idx).copied().unwrap_or(0.0)
    }
}
