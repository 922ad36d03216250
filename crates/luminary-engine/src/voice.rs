use std::fmt;

use crate::osc::{Oscillator, Waveform};
use crate::param::AudioParam;

/// Logical role of a voice inside the tone graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceRole {
    /// Solfeggio tones; one voice per requested frequency.
    Tone,
    /// Pulsed electromagnetic field carrier (square wave).
    Pemf,
    /// Grounding tone at the Schumann resonance.
    Schumann,
    /// Self-terminating crystal chime.
    Chime,
}

impl fmt::Display for VoiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoiceRole::Tone => "tone",
            VoiceRole::Pemf => "pemf",
            VoiceRole::Schumann => "schumann",
            VoiceRole::Chime => "chime",
        };
        f.write_str(name)
    }
}

/// Identifier of a voice, unique for the lifetime of its bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

/// One oscillator feeding one gain stage.
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    role: VoiceRole,
    osc: Oscillator,
    gain: AudioParam,
    stop_at: Option<u64>,
}

impl Voice {
    pub(crate) fn new(
        id: VoiceId,
        role: VoiceRole,
        waveform: Waveform,
        frequency: f32,
        sample_rate: f32,
    ) -> Self {
        Self {
            id,
            role,
            osc: Oscillator::new(waveform, frequency, sample_rate),
            gain: AudioParam::new(1.0),
            stop_at: None,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn role(&self) -> VoiceRole {
        self.role
    }

    pub fn frequency(&self) -> f32 {
        self.osc.frequency()
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    pub(crate) fn set_frequency(&mut self, frequency: f32) {
        self.osc.set_frequency(frequency);
    }

    pub(crate) fn gain_mut(&mut self) -> &mut AudioParam {
        &mut self.gain
    }

    pub fn gain_at(&self, frame: u64) -> f32 {
        self.gain.value_at(frame)
    }

    pub fn stop_at(&self) -> Option<u64> {
        self.stop_at
    }

    /// Schedules the voice to end at `frame`. An earlier pending stop wins.
    pub(crate) fn schedule_stop(&mut self, frame: u64) {
        self.stop_at = Some(self.stop_at.map_or(frame, |existing| existing.min(frame)));
    }

    pub fn is_finished(&self, frame: u64) -> bool {
        self.stop_at.is_some_and(|stop| frame >= stop)
    }

    /// Adds this voice's output for frames `start..start + len` into every
    /// channel of `channels`.
    pub(crate) fn mix_into(&mut self, channels: &mut [Vec<f32>], start: u64) {
        let frames = channels.first().map(|channel| channel.len()).unwrap_or(0);
        for offset in 0..frames {
            let frame = start + offset as u64;
            if self.is_finished(frame) {
                break;
            }
            let value = self.osc.next_sample() * self.gain.value_at(frame);
            for channel in channels.iter_mut() {
                channel[offset] += value;
            }
        }
        self.gain.discard_before(start + frames as u64);
    }
}

/// Lifecycle of a single-voice role: either nothing is installed or exactly
/// one voice is running.
#[derive(Debug, Default)]
pub enum VoiceSlot {
    #[default]
    Stopped,
    Running(Voice),
}

impl VoiceSlot {
    pub fn is_running(&self) -> bool {
        matches!(self, VoiceSlot::Running(_))
    }

    pub fn voice(&self) -> Option<&Voice> {
        match self {
            VoiceSlot::Running(voice) => Some(voice),
            VoiceSlot::Stopped => None,
        }
    }

    pub fn voice_mut(&mut self) -> Option<&mut Voice> {
        match self {
            VoiceSlot::Running(voice) => Some(voice),
            VoiceSlot::Stopped => None,
        }
    }

    /// Installs `voice`, handing back the one it replaces.
    pub fn install(&mut self, voice: Voice) -> Option<Voice> {
        match std::mem::replace(self, VoiceSlot::Running(voice)) {
            VoiceSlot::Running(previous) => Some(previous),
            VoiceSlot::Stopped => None,
        }
    }

    pub fn take(&mut self) -> Option<Voice> {
        match std::mem::take(self) {
            VoiceSlot::Running(voice) => Some(voice),
            VoiceSlot::Stopped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixing_stops_at_scheduled_frame() {
        let mut voice = Voice::new(VoiceId(1), VoiceRole::Pemf, Waveform::Square, 10.0, 100.0);
        voice.gain_mut().set_value_at(0.5, 0);
        voice.schedule_stop(3);
        let mut channels = vec![vec![0.0; 6]; 2];
        voice.mix_into(&mut channels, 0);
        assert_eq!(channels[0], vec![0.5, 0.5, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(channels[0], channels[1]);
        assert!(voice.is_finished(3));
    }

    #[test]
    fn earlier_stop_wins() {
        let mut voice = Voice::new(VoiceId(1), VoiceRole::Chime, Waveform::Sine, 2_000.0, 48_000.0);
        voice.schedule_stop(100);
        voice.schedule_stop(500);
        assert_eq!(voice.stop_at(), Some(100));
    }

    #[test]
    fn slot_install_returns_previous() {
        let mut slot = VoiceSlot::default();
        let first = Voice::new(VoiceId(1), VoiceRole::Pemf, Waveform::Square, 40.0, 48_000.0);
        let second = Voice::new(VoiceId(2), VoiceRole::Pemf, Waveform::Square, 40.0, 48_000.0);
        assert!(slot.install(first).is_none());
        let replaced = slot.install(second).expect("previous voice");
        assert_eq!(replaced.id(), VoiceId(1));
        assert_eq!(slot.take().map(|voice| voice.id()), Some(VoiceId(2)));
        assert!(!slot.is_running());
    }
}
