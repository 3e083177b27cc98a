use crate::track::Track;

/// Read position into a looping track, in source frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopCursor {
    position: f64,
    step: f64,
}

impl LoopCursor {
    /// Cursor that plays a `source_rate` track on an `output_rate` device
    pub fn new(source_rate: u32, output_rate: u32) -> Self {
        Self {
            position: 0.0,
            step: f64::from(source_rate) / f64::from(output_rate.max(1)),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}

/// Fills interleaved `out` with the track looped from `cursor`, linearly resampled and
/// mapped onto `out_channels` channels. A mono track is copied to every channel; extra
/// output channels on multichannel tracks wrap onto the source channels.
pub fn fill_looped(
    track: &Track,
    cursor: &mut LoopCursor,
    out: &mut [f32],
    out_channels: u16,
    volume: f32,
) {
    let frames = track.frames();
    let out_channels = usize::from(out_channels.max(1));
    if frames == 0 {
        out.fill(0.0);
        return;
    }
    let src_channels = track.channels();
    let len = frames as f64;

    for frame in out.chunks_mut(out_channels) {
        let base = cursor.position.floor();
        let frac = (cursor.position - base) as f32;
        let i0 = base as usize;
        let i1 = i0 + 1;
        for (c, sample) in frame.iter_mut().enumerate() {
            let src_c = (c % usize::from(src_channels)) as u16;
            let a = track.sample(i0, src_c);
            let b = track.sample(i1, src_c);
            *sample = (a + (b - a) * frac) * volume;
        }
        cursor.position = (cursor.position + cursor.step) % len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_track_is_copied_to_every_channel_and_loops() {
        let track = Track::new(vec![0.1, 0.2, 0.3], 1, 48_000);
        let mut cursor = LoopCursor::new(48_000, 48_000);
        let mut out = vec![0.0; 8];

        fill_looped(&track, &mut cursor, &mut out, 2, 1.0);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.1, 0.1]);
        assert_eq!(cursor.position(), 1.0);
    }

    #[test]
    fn half_rate_track_is_interpolated() {
        let track = Track::new(vec![0.0, 1.0], 1, 24_000);
        let mut cursor = LoopCursor::new(24_000, 48_000);
        let mut out = vec![0.0; 4];

        fill_looped(&track, &mut cursor, &mut out, 1, 0.5);
        // frame 1 wraps back to frame 0 for the interpolation tail
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.25]);
    }

    #[test]
    fn stereo_track_on_mono_device_takes_left() {
        let track = Track::new(vec![0.4, -0.4, 0.6, -0.6], 2, 44_100);
        let mut cursor = LoopCursor::new(44_100, 44_100);
        let mut out = vec![0.0; 2];
        fill_looped(&track, &mut cursor, &mut out, 1, 1.0);
        assert_eq!(out, vec![0.4, 0.6]);
    }

    #[test]
    fn empty_track_is_silent() {
        let track = Track::new(Vec::<f32>::new(), 2, 44_100);
        let mut cursor = LoopCursor::new(44_100, 48_000);
        let mut out = vec![1.0; 6];
        fill_looped(&track, &mut cursor, &mut out, 2, 1.0);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
