use crate::buffer::{AudioBuffer, BufferConfig};
use crate::osc::Waveform;
use crate::voice::{Voice, VoiceId, VoiceRole, VoiceSlot};

/// Fixed gain of the grounding voice.
pub const SCHUMANN_GAIN: f32 = 0.3;
pub const CHIME_FREQUENCY: f32 = 2_000.0;
pub const CHIME_PEAK_GAIN: f32 = 0.1;
/// End of the chime fade-in, in seconds after it starts.
pub const CHIME_ATTACK_SECS: f64 = 2.0;
/// End of the chime fade-out.
pub const CHIME_FADE_END_SECS: f64 = 6.0;
/// The chime stops and releases itself here.
pub const CHIME_STOP_SECS: f64 = 6.5;
/// Fade applied when a chime is cut short.
pub const CHIME_RELEASE_FADE_SECS: f64 = 0.1;
pub const CHIME_RELEASE_STOP_SECS: f64 = 0.2;

/// Every live voice of the tone graph plus the audio clock they render on.
///
/// The bank is the only owner of voices. Replacing or stopping a role drops
/// the previous voice before the call returns; voices that fade out after
/// being detached from their role live in a separate list until their stop
/// frame and are counted by [`VoiceBank::total_voices`].
#[derive(Debug)]
pub struct VoiceBank {
    config: BufferConfig,
    position: u64,
    next_id: u64,
    tones: Vec<Voice>,
    pemf: VoiceSlot,
    schumann: VoiceSlot,
    chime: VoiceSlot,
    fading: Vec<Voice>,
}

impl VoiceBank {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            position: 0,
            next_id: 1,
            tones: Vec::new(),
            pemf: VoiceSlot::default(),
            schumann: VoiceSlot::default(),
            chime: VoiceSlot::default(),
            fading: Vec::new(),
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Frames rendered so far; the bank's notion of "now".
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seconds(&self) -> f64 {
        self.position as f64 / self.config.sample_rate.max(f32::EPSILON) as f64
    }

    fn frames(&self, seconds: f64) -> u64 {
        self.config.frames_for(seconds)
    }

    fn spawn(&mut self, role: VoiceRole, waveform: Waveform, frequency: f32) -> Voice {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        tracing::trace!(%role, frequency, "voice created");
        Voice::new(id, role, waveform, frequency, self.config.sample_rate)
    }

    /// Replaces every tone voice with one sine voice per usable frequency.
    /// Non-finite and non-positive frequencies are skipped. Returns the
    /// number of voices created.
    pub fn replace_tones(&mut self, frequencies: &[f32], intensity: f32) -> usize {
        for voice in self.tones.drain(..) {
            release(voice);
        }
        let now = self.position;
        let gain = sanitize_gain(intensity);
        for &frequency in frequencies {
            if !frequency.is_finite() || frequency <= 0.0 {
                tracing::debug!(frequency, "skipping unusable tone frequency");
                continue;
            }
            let mut voice = self.spawn(VoiceRole::Tone, Waveform::Sine, frequency);
            voice.gain_mut().set_value_at(gain, now);
            self.tones.push(voice);
        }
        self.tones.len()
    }

    pub fn replace_pemf(&mut self, frequency: f32, intensity: f32) {
        let now = self.position;
        let mut voice = self.spawn(VoiceRole::Pemf, Waveform::Square, frequency);
        voice.gain_mut().set_value_at(sanitize_gain(intensity), now);
        if let Some(previous) = self.pemf.install(voice) {
            release(previous);
        }
    }

    pub fn replace_schumann(&mut self, frequency: f32) {
        let now = self.position;
        let mut voice = self.spawn(VoiceRole::Schumann, Waveform::Sine, frequency);
        voice.gain_mut().set_value_at(SCHUMANN_GAIN, now);
        if let Some(previous) = self.schumann.install(voice) {
            release(previous);
        }
    }

    pub fn stop_schumann(&mut self) -> bool {
        self.schumann.take().map(release).is_some()
    }

    /// Starts a chime unless one is already sounding.
    pub fn start_chime(&mut self) -> bool {
        if self.chime.is_running() {
            return false;
        }
        let now = self.position;
        let attack_end = now + self.frames(CHIME_ATTACK_SECS);
        let fade_end = now + self.frames(CHIME_FADE_END_SECS);
        let stop = now + self.frames(CHIME_STOP_SECS);

        let mut voice = self.spawn(VoiceRole::Chime, Waveform::Sine, CHIME_FREQUENCY);
        let gain = voice.gain_mut();
        gain.set_value_at(0.0, now);
        gain.linear_ramp_to(CHIME_PEAK_GAIN, attack_end, now);
        gain.linear_ramp_to(0.0, fade_end, now);
        voice.schedule_stop(stop);
        self.chime.install(voice);
        true
    }

    /// Detaches the active chime and fades it out quickly.
    pub fn release_chime(&mut self) -> bool {
        let Some(mut voice) = self.chime.take() else {
            return false;
        };
        let now = self.position;
        let fade_end = now + self.frames(CHIME_RELEASE_FADE_SECS);
        let stop = now + self.frames(CHIME_RELEASE_STOP_SECS);
        let gain = voice.gain_mut();
        gain.cancel_and_hold(now);
        gain.linear_ramp_to(0.0, fade_end, now);
        voice.schedule_stop(stop);
        self.fading.push(voice);
        true
    }

    /// Retunes the first tone voice in place.
    pub fn retune_first_tone(&mut self, frequency: f32) -> bool {
        if !frequency.is_finite() || frequency <= 0.0 {
            return false;
        }
        match self.tones.first_mut() {
            Some(voice) => {
                voice.set_frequency(frequency);
                true
            }
            None => false,
        }
    }

    pub fn set_tone_gain(&mut self, intensity: f32) -> usize {
        let now = self.position;
        let gain = sanitize_gain(intensity);
        for voice in &mut self.tones {
            voice.gain_mut().set_value_at(gain, now);
        }
        self.tones.len()
    }

    pub fn set_pemf_gain(&mut self, intensity: f32) -> bool {
        let now = self.position;
        match self.pemf.voice_mut() {
            Some(voice) => {
                voice.gain_mut().set_value_at(sanitize_gain(intensity), now);
                true
            }
            None => false,
        }
    }

    /// Stops and releases every voice. Returns how many were released.
    pub fn stop_all(&mut self) -> usize {
        let mut released = 0;
        for voice in self.tones.drain(..).chain(self.fading.drain(..)) {
            release(voice);
            released += 1;
        }
        for slot in [&mut self.pemf, &mut self.schumann, &mut self.chime] {
            if let Some(voice) = slot.take() {
                release(voice);
                released += 1;
            }
        }
        released
    }

    /// Renders one block of every live voice summed together, advances the
    /// clock and releases voices whose stop frame has passed.
    pub fn render(&mut self, buffer: &mut AudioBuffer) {
        buffer.clear();
        let start = self.position;
        {
            let channels = buffer.as_mut_slice();
            let voices = self
                .tones
                .iter_mut()
                .chain(self.pemf.voice_mut())
                .chain(self.schumann.voice_mut())
                .chain(self.chime.voice_mut())
                .chain(self.fading.iter_mut());
            for voice in voices {
                voice.mix_into(channels, start);
            }
        }
        for sample in buffer.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.position += buffer.len() as u64;
        self.retire_finished();
    }

    fn retire_finished(&mut self) {
        let now = self.position;
        for slot in [&mut self.pemf, &mut self.schumann, &mut self.chime] {
            if slot.voice().is_some_and(|voice| voice.is_finished(now)) {
                if let Some(voice) = slot.take() {
                    tracing::debug!(role = %voice.role(), "voice ended");
                    release(voice);
                }
            }
        }
        self.fading.retain(|voice| !voice.is_finished(now));
    }

    pub fn voice_count(&self, role: VoiceRole) -> usize {
        match role {
            VoiceRole::Tone => self.tones.len(),
            VoiceRole::Pemf => self.pemf.is_running() as usize,
            VoiceRole::Schumann => self.schumann.is_running() as usize,
            VoiceRole::Chime => self.chime.is_running() as usize,
        }
    }

    /// All live voices, including ones fading out after being detached.
    pub fn total_voices(&self) -> usize {
        self.tones.len()
            + self.pemf.is_running() as usize
            + self.schumann.is_running() as usize
            + self.chime.is_running() as usize
            + self.fading.len()
    }

    pub fn tones(&self) -> &[Voice] {
        &self.tones
    }

    pub fn pemf(&self) -> Option<&Voice> {
        self.pemf.voice()
    }

    pub fn schumann(&self) -> Option<&Voice> {
        self.schumann.voice()
    }

    pub fn chime(&self) -> Option<&Voice> {
        self.chime.voice()
    }
}

fn release(voice: Voice) {
    tracing::trace!(role = %voice.role(), id = voice.id().0, "voice released");
}

fn sanitize_gain(intensity: f32) -> f32 {
    if intensity.is_finite() {
        intensity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;

    fn bank() -> VoiceBank {
        VoiceBank::new(BufferConfig::new(1_000.0, 100, ChannelLayout::Mono))
    }

    fn render_secs(bank: &mut VoiceBank, seconds: f64) {
        let frames = bank.config().frames_for(seconds) as usize;
        let mut buffer = AudioBuffer::new(1, 100);
        let mut remaining = frames;
        while remaining > 0 {
            let block = remaining.min(100);
            buffer.resize_frames(block);
            bank.render(&mut buffer);
            remaining -= block;
        }
    }

    #[test]
    fn invalid_tone_frequencies_are_skipped() {
        let mut bank = bank();
        let created = bank.replace_tones(&[440.0, -5.0, f32::NAN, 220.0, 0.0, f32::INFINITY], 0.3);
        assert_eq!(created, 2);
        let frequencies: Vec<f32> = bank.tones().iter().map(Voice::frequency).collect();
        assert_eq!(frequencies, vec![440.0, 220.0]);
    }

    #[test]
    fn replacing_single_roles_never_duplicates() {
        let mut bank = bank();
        for _ in 0..5 {
            bank.replace_pemf(40.0, 0.5);
            bank.replace_schumann(7.83);
        }
        assert_eq!(bank.voice_count(VoiceRole::Pemf), 1);
        assert_eq!(bank.voice_count(VoiceRole::Schumann), 1);
        assert_eq!(bank.total_voices(), 2);
    }

    #[test]
    fn chime_envelope_peaks_and_self_releases() {
        let mut bank = bank();
        assert!(bank.start_chime());
        assert!(!bank.start_chime());
        let start = bank.position();
        let chime = bank.chime().expect("chime");
        assert_eq!(chime.gain_at(start), 0.0);
        assert!((chime.gain_at(start + 2_000) - CHIME_PEAK_GAIN).abs() < 1e-6);
        assert!(chime.gain_at(start + 6_000).abs() < 1e-6);

        render_secs(&mut bank, 6.4);
        assert_eq!(bank.voice_count(VoiceRole::Chime), 1);
        render_secs(&mut bank, 0.1);
        assert_eq!(bank.voice_count(VoiceRole::Chime), 0);
        assert_eq!(bank.total_voices(), 0);
    }

    #[test]
    fn released_chime_fades_then_disappears() {
        let mut bank = bank();
        bank.start_chime();
        render_secs(&mut bank, 3.0);
        assert!(bank.release_chime());
        assert_eq!(bank.voice_count(VoiceRole::Chime), 0);
        assert_eq!(bank.total_voices(), 1);
        render_secs(&mut bank, 0.2);
        assert_eq!(bank.total_voices(), 0);
        assert!(!bank.release_chime());
    }

    #[test]
    fn stop_all_is_idempotent() {
        let mut bank = bank();
        bank.replace_tones(&[432.0, 528.0], 0.3);
        bank.replace_pemf(40.0, 0.5);
        bank.replace_schumann(7.83);
        bank.start_chime();
        assert_eq!(bank.stop_all(), 5);
        assert_eq!(bank.stop_all(), 0);
        assert_eq!(bank.total_voices(), 0);
    }

    #[test]
    fn gain_updates_apply_without_restarting() {
        let mut bank = bank();
        bank.replace_tones(&[528.0], 0.3);
        bank.replace_pemf(40.0, 0.5);
        let id = bank.tones()[0].id();
        render_secs(&mut bank, 0.5);
        bank.set_tone_gain(0.8);
        bank.set_pemf_gain(0.7);
        bank.retune_first_tone(432.0);
        let now = bank.position();
        assert_eq!(bank.tones()[0].id(), id);
        assert_eq!(bank.tones()[0].gain_at(now), 0.8);
        assert_eq!(bank.tones()[0].frequency(), 432.0);
        assert_eq!(bank.pemf().map(|voice| voice.gain_at(now)), Some(0.7));
    }

    #[test]
    fn render_sums_and_clamps() {
        let mut bank = bank();
        bank.replace_pemf(10.0, 1.0);
        bank.replace_tones(&[10.0], 1.0);
        let mut buffer = AudioBuffer::new(1, 10);
        bank.render(&mut buffer);
        assert!(buffer.peak() <= 1.0);
        assert!(buffer.peak() > 0.5);
        assert_eq!(bank.position(), 10);
    }
}
