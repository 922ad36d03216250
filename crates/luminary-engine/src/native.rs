use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};

use crate::buffer::{AudioBuffer, BufferConfig, ChannelLayout};
use crate::device::{DeviceClock, SharedBank, ToneDevice};
use crate::error::{AudioError, Result};

/// Default output device of the platform host, driven by a cpal stream.
pub struct CpalDevice {
    host: cpal::Host,
    device: Option<cpal::Device>,
    config: Option<cpal::SupportedStreamConfig>,
    stream: Option<cpal::Stream>,
}

impl Default for CpalDevice {
    fn default() -> Self {
        Self {
            host: cpal::default_host(),
            device: None,
            config: None,
            stream: None,
        }
    }
}

impl CpalDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToneDevice for CpalDevice {
    fn name(&self) -> &str {
        "cpal"
    }

    fn clock(&self) -> DeviceClock {
        DeviceClock::Realtime
    }

    fn open(&mut self, preferred: &BufferConfig) -> Result<BufferConfig> {
        let device = self
            .host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default output device".into()))?;

        let desired_rate = cpal::SampleRate(preferred.sample_rate.round().max(1.0) as u32);
        let desired_channels = preferred.layout.channels() as u16;
        let mut selected = None;
        let supported = device
            .supported_output_configs()
            .map_err(|err| AudioError::DeviceUnavailable(err.to_string()))?;
        for range in supported {
            if range.min_sample_rate() <= desired_rate && range.max_sample_rate() >= desired_rate {
                let exact = range.channels() == desired_channels;
                selected = Some(range.with_sample_rate(desired_rate));
                if exact {
                    break;
                }
            }
        }
        let config = match selected {
            Some(config) => config,
            None => device
                .default_output_config()
                .map_err(|_| AudioError::UnsupportedConfiguration)?,
        };

        let layout = match config.channels() {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            other => ChannelLayout::Custom(other.min(u8::MAX as u16) as u8),
        };
        let negotiated = BufferConfig::new(
            config.sample_rate().0 as f32,
            preferred.block_size,
            layout,
        );
        let name = device.name().unwrap_or_default();
        tracing::info!(
            device = %name,
            sample_rate = negotiated.sample_rate,
            channels = config.channels(),
            "opened audio output"
        );
        self.device = Some(device);
        self.config = Some(config);
        Ok(negotiated)
    }

    fn start(&mut self, bank: SharedBank) -> Result<()> {
        let (Some(device), Some(config)) = (self.device.as_ref(), self.config.as_ref()) else {
            return Err(AudioError::DeviceUnavailable("device not opened".into()));
        };
        let stream_config: cpal::StreamConfig = config.config();
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(device, &stream_config, bank)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(device, &stream_config, bank)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(device, &stream_config, bank)?,
            _ => return Err(AudioError::UnsupportedConfiguration),
        };
        stream
            .play()
            .map_err(|err| AudioError::Stream(err.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                tracing::warn!(?err, "failed to pause audio stream");
            }
        }
        self.config = None;
        self.device = None;
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    bank: SharedBank,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let block_size = match config.buffer_size {
        cpal::BufferSize::Fixed(frames) => frames as usize,
        cpal::BufferSize::Default => 1024,
    };
    let mut scratch = AudioBuffer::new(channels, block_size);

    device
        .build_output_stream(
            config,
            move |output: &mut [T], _| {
                let frames = output.len() / channels.max(1);
                if scratch.len() != frames {
                    scratch.resize_frames(frames);
                }
                // Never block the callback on the control side.
                match bank.try_lock() {
                    Some(mut bank) => bank.render(&mut scratch),
                    None => scratch.clear(),
                }
                for (frame_index, frame) in output.chunks_mut(channels).enumerate() {
                    for (channel_index, sample) in frame.iter_mut().enumerate() {
                        let value = scratch
                            .as_slice()
                            .get(channel_index)
                            .and_then(|channel| channel.get(frame_index))
                            .copied()
                            .unwrap_or(0.0);
                        *sample = T::from_sample(value);
                    }
                }
            },
            move |err| {
                tracing::error!("audio stream error: {err}");
            },
            None,
        )
        .map_err(|err| AudioError::Stream(err.to_string()))
}
