use serde::{Deserialize, Serialize};

/// Output channel configuration of the tone graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    Custom(u8),
}

impl ChannelLayout {
    pub fn channels(&self) -> u8 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Custom(channels) => *channels,
        }
    }
}

/// Format negotiated with the tone output device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BufferConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub layout: ChannelLayout,
}

impl BufferConfig {
    pub fn new(sample_rate: f32, block_size: usize, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            block_size,
            layout,
        }
    }

    /// Converts seconds to a whole number of frames at this sample rate.
    pub fn frames_for(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 || self.sample_rate <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate as f64).round() as u64
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new(48_000.0, 512, ChannelLayout::Stereo)
    }
}

/// Non-interleaved audio buffer.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, frames: usize) -> Self {
        let channels = (0..num_channels).map(|_| vec![0.0; frames]).collect();
        Self { channels }
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        Self::new(config.layout.channels() as usize, config.block_size)
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.channels
            .first()
            .map(|channel| channel.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Changes the frame count of every channel, zero-filling new frames.
    pub fn resize_frames(&mut self, frames: usize) {
        for channel in &mut self.channels {
            channel.resize(frames, 0.0);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.channels.iter().flat_map(|channel| channel.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.channels
            .iter_mut()
            .flat_map(|channel| channel.iter_mut())
    }

    pub fn as_slice(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn as_mut_slice(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    /// Writes frames interleaved into `target`, returning the number of
    /// samples written.
    pub fn interleave_into(&self, target: &mut Vec<f32>) -> usize {
        let frames = self.len();
        let start = target.len();
        target.reserve(frames * self.channels.len());
        for frame in 0..frames {
            for channel in &self.channels {
                target.push(channel[frame]);
            }
        }
        target.len() - start
    }

    /// Peak absolute sample value.
    pub fn peak(&self) -> f32 {
        self.iter().fold(0.0f32, |peak, sample| peak.max(sample.abs()))
    }
}
