use crate::mix::{fill_looped, LoopCursor};
use crate::track::{AudioError, Track};
use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use cuex_core::Condition;
use cuex_experiment::Soundtrack;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loops one background track per condition on the default output device while an
/// epoch runs. Device problems are logged and the run continues in silence.
pub struct BackgroundAudio {
    tracks: HashMap<Condition, Arc<Track>>,
    volume: f32,
    stream: Option<Stream>,
}

impl BackgroundAudio {
    pub fn new(volume: f32) -> Self {
        Self {
            tracks: HashMap::new(),
            volume: volume.clamp(0.0, 1.0),
            stream: None,
        }
    }

    /// Decodes the track for `condition` up front so a bad file is caught before any
    /// epoch starts
    pub fn load(&mut self, condition: Condition, path: &Path) -> Result<(), AudioError> {
        let track = Track::from_wav(path)?;
        info!(
            %condition,
            path = %path.display(),
            seconds = track.frames() as f64 / f64::from(track.sample_rate().max(1)),
            "background track loaded"
        );
        self.tracks.insert(condition, Arc::new(track));
        Ok(())
    }

    pub fn with_track(mut self, condition: Condition, track: Track) -> Self {
        self.tracks.insert(condition, Arc::new(track));
        self
    }

    pub fn has_track(&self, condition: Condition) -> bool {
        self.tracks.contains_key(&condition)
    }

    pub fn is_playing(&self) -> bool {
        self.stream.is_some()
    }

    fn open_stream(&self, track: Arc<Track>) -> Result<Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no default output device")?;
        let supported = device
            .default_output_config()
            .context("querying output config")?;
        let format = supported.sample_format();
        let config = supported.config();
        debug!(
            device = %device.name().unwrap_or_default(),
            rate = config.sample_rate.0,
            channels = config.channels,
            ?format,
            "opening output stream"
        );

        let build = stream_builder(format)?;
        let stream = build(&device, &config, track, self.volume)
            .with_context(|| format!("building {format:?} output stream"))?;
        stream.play().context("starting output stream")?;
        Ok(stream)
    }
}

type BuildStream = fn(
    &cpal::Device,
    &StreamConfig,
    Arc<Track>,
    f32,
) -> Result<Stream, cpal::BuildStreamError>;

/// Picks the stream constructor for the device's native sample format
fn stream_builder(format: SampleFormat) -> Result<BuildStream> {
    let build: BuildStream = match format {
        SampleFormat::F32 => build_stream::<f32>,
        SampleFormat::I16 => build_stream::<i16>,
        SampleFormat::U16 => build_stream::<u16>,
        SampleFormat::I32 => build_stream::<i32>,
        other => bail!("unsupported device sample format {other:?}"),
    };
    Ok(build)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    track: Arc<Track>,
    volume: f32,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels;
    let mut cursor = LoopCursor::new(track.sample_rate(), config.sample_rate.0);
    let mut scratch: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            fill_looped(&track, &mut cursor, &mut scratch, channels, volume);
            for (dst, &src) in data.iter_mut().zip(&scratch) {
                *dst = T::from_sample(src);
            }
        },
        |err| warn!(error = %err, "audio stream error"),
        None,
    )
}

impl Soundtrack for BackgroundAudio {
    fn start(&mut self, condition: Condition) {
        self.stop();
        let Some(track) = self.tracks.get(&condition).cloned() else {
            debug!(%condition, "no background track");
            return;
        };
        match self.open_stream(track) {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => warn!(%condition, error = %format!("{e:#}"), "background audio unavailable"),
        }
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("background audio stopped");
        }
    }
}

impl Drop for BackgroundAudio {
    fn drop(&mut self) {
        self.stop();
    }
}
