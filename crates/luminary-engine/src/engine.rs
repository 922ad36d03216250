use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::bank::VoiceBank;
use crate::buffer::{AudioBuffer, BufferConfig};
use crate::device::{DeviceClock, OfflineDevice, SharedBank, ToneDevice};
use crate::voice::VoiceRole;

const NANOS_PER_SEC: u128 = 1_000_000_000;

enum Context {
    /// Nothing acquired yet, or closed since.
    Idle,
    /// Acquisition failed; every operation is a no-op until [`ToneEngine::close`].
    Unavailable,
    Ready(Ready),
}

struct Ready {
    bank: SharedBank,
    clock: DeviceClock,
    elapsed_nanos: u128,
    rendered_frames: u64,
}

/// Owner of the tone graph.
///
/// Play requests acquire the output device lazily; updates and stops never
/// do. When the device cannot be acquired every operation degrades to a
/// no-op and the failure is logged once.
pub struct ToneEngine {
    device: Box<dyn ToneDevice>,
    preferred: BufferConfig,
    context: Context,
    scratch: AudioBuffer,
}

impl ToneEngine {
    pub fn new(device: Box<dyn ToneDevice>, preferred: BufferConfig) -> Self {
        let scratch = AudioBuffer::from_config(&preferred);
        Self {
            device,
            preferred,
            context: Context::Idle,
            scratch,
        }
    }

    pub fn offline(config: BufferConfig) -> Self {
        Self::new(Box::new(OfflineDevice::new()), config)
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    /// Whether a device context is currently held.
    pub fn is_ready(&self) -> bool {
        matches!(self.context, Context::Ready(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.context, Context::Unavailable)
    }

    /// Format of the held context, if any.
    pub fn config(&self) -> Option<BufferConfig> {
        self.existing().map(|bank| bank.lock().config().clone())
    }

    fn acquire(&mut self) -> Option<SharedBank> {
        match &self.context {
            Context::Ready(ready) => return Some(Arc::clone(&ready.bank)),
            Context::Unavailable => return None,
            Context::Idle => {}
        }

        let config = match self.device.open(&self.preferred) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(device = self.device.name(), %err, "tone output unavailable");
                self.context = Context::Unavailable;
                return None;
            }
        };
        let bank: SharedBank = Arc::new(Mutex::new(VoiceBank::new(config.clone())));
        if let Err(err) = self.device.start(Arc::clone(&bank)) {
            tracing::warn!(device = self.device.name(), %err, "failed to start tone output");
            self.device.close();
            self.context = Context::Unavailable;
            return None;
        }
        tracing::info!(
            device = self.device.name(),
            sample_rate = config.sample_rate,
            "tone output acquired"
        );
        self.scratch = AudioBuffer::from_config(&config);
        self.context = Context::Ready(Ready {
            bank: Arc::clone(&bank),
            clock: self.device.clock(),
            elapsed_nanos: 0,
            rendered_frames: 0,
        });
        Some(bank)
    }

    fn existing(&self) -> Option<&SharedBank> {
        match &self.context {
            Context::Ready(ready) => Some(&ready.bank),
            _ => None,
        }
    }

    fn with_acquired<R>(&mut self, f: impl FnOnce(&mut VoiceBank) -> R) -> Option<R> {
        let bank = self.acquire()?;
        let mut guard = bank.lock();
        Some(f(&mut guard))
    }

    fn with_existing<R>(&self, f: impl FnOnce(&mut VoiceBank) -> R) -> Option<R> {
        let bank = self.existing()?;
        let mut guard = bank.lock();
        Some(f(&mut guard))
    }

    /// Replaces every tone voice; returns how many were created.
    pub fn play_tones(&mut self, frequencies: &[f32], intensity: f32) -> usize {
        self.with_acquired(|bank| bank.replace_tones(frequencies, intensity))
            .unwrap_or(0)
    }

    pub fn play_pemf(&mut self, frequency: f32, intensity: f32) {
        self.with_acquired(|bank| bank.replace_pemf(frequency, intensity));
    }

    pub fn play_schumann(&mut self, frequency: f32) {
        self.with_acquired(|bank| bank.replace_schumann(frequency));
    }

    pub fn stop_schumann(&mut self) {
        self.with_existing(VoiceBank::stop_schumann);
    }

    /// Starts the crystal chime; false if one is already sounding or there
    /// is no output.
    pub fn play_crystal_chime(&mut self) -> bool {
        self.with_acquired(VoiceBank::start_chime).unwrap_or(false)
    }

    pub fn stop_crystal_chime(&mut self) {
        self.with_existing(VoiceBank::release_chime);
    }

    pub fn update_tone_frequency(&mut self, frequency: f32) {
        self.with_existing(|bank| bank.retune_first_tone(frequency));
    }

    pub fn update_tone_intensity(&mut self, intensity: f32) {
        self.with_existing(|bank| bank.set_tone_gain(intensity));
    }

    pub fn update_pemf_intensity(&mut self, intensity: f32) {
        self.with_existing(|bank| bank.set_pemf_gain(intensity));
    }

    /// Stops and releases every voice. Safe to call any number of times.
    pub fn stop_all(&mut self) {
        if let Some(released) = self.with_existing(VoiceBank::stop_all) {
            if released > 0 {
                tracing::debug!(released, "stopped all voices");
            }
        }
    }

    /// Stops every voice and releases the device context. The next play
    /// request acquires it again.
    pub fn close(&mut self) {
        self.stop_all();
        if !matches!(self.context, Context::Idle) {
            self.device.close();
            tracing::debug!(device = self.device.name(), "tone output closed");
        }
        self.context = Context::Idle;
    }

    /// Renders one block into `buffer`. Returns false when there is no
    /// context or the device renders on its own clock.
    pub fn render(&mut self, buffer: &mut AudioBuffer) -> bool {
        match &mut self.context {
            Context::Ready(ready) if ready.clock == DeviceClock::Manual => {
                ready.bank.lock().render(buffer);
                ready.rendered_frames += buffer.len() as u64;
                true
            }
            _ => false,
        }
    }

    /// Advances a manually clocked context by `elapsed`, rendering block by
    /// block and handing each block to `sink`. Fractional frames carry over
    /// to the next call.
    pub fn advance(&mut self, elapsed: Duration, mut sink: impl FnMut(&AudioBuffer)) {
        let Context::Ready(ready) = &mut self.context else {
            return;
        };
        if ready.clock != DeviceClock::Manual {
            return;
        }
        let mut bank = ready.bank.lock();
        let rate = bank.config().sample_rate.round().max(1.0) as u128;
        let block = bank.config().block_size.max(1);

        ready.elapsed_nanos += elapsed.as_nanos();
        let target = (ready.elapsed_nanos * rate / NANOS_PER_SEC) as u64;
        let mut remaining = target.saturating_sub(ready.rendered_frames) as usize;
        while remaining > 0 {
            let frames = remaining.min(block);
            self.scratch.resize_frames(frames);
            bank.render(&mut self.scratch);
            sink(&self.scratch);
            ready.rendered_frames += frames as u64;
            remaining -= frames;
        }
    }

    /// Seconds of audio rendered by the held context.
    pub fn now(&self) -> f64 {
        self.with_existing(|bank| bank.seconds()).unwrap_or(0.0)
    }

    pub fn voice_count(&self, role: VoiceRole) -> usize {
        self.with_existing(|bank| bank.voice_count(role))
            .unwrap_or(0)
    }

    pub fn total_voices(&self) -> usize {
        self.with_existing(|bank| bank.total_voices()).unwrap_or(0)
    }

    pub fn tone_frequencies(&self) -> Vec<f32> {
        self.with_existing(|bank| bank.tones().iter().map(|voice| voice.frequency()).collect())
            .unwrap_or_default()
    }

    /// Current gain of every tone voice.
    pub fn tone_gains(&self) -> Vec<f32> {
        self.with_existing(|bank| {
            let now = bank.position();
            bank.tones().iter().map(|voice| voice.gain_at(now)).collect()
        })
        .unwrap_or_default()
    }

    pub fn pemf_gain(&self) -> Option<f32> {
        self.with_existing(|bank| {
            let now = bank.position();
            bank.pemf().map(|voice| voice.gain_at(now))
        })
        .flatten()
    }

    pub fn pemf_frequency(&self) -> Option<f32> {
        self.with_existing(|bank| bank.pemf().map(|voice| voice.frequency()))
            .flatten()
    }

    pub fn schumann_frequency(&self) -> Option<f32> {
        self.with_existing(|bank| bank.schumann().map(|voice| voice.frequency()))
            .flatten()
    }
}

impl Drop for ToneEngine {
    fn drop(&mut self) {
        self.close();
    }
}
