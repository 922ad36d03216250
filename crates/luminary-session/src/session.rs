use std::time::Duration;

use luminary_engine::{AudioBuffer, ToneEngine, VoiceRole};
use luminary_haptics::{HapticEngine, HapticHub, HapticPattern, HapticTimer};
use luminary_rt::{Fired, Scheduler, TimerSlot};
use luminary_signal::{AffectState, Frequencies, HeartRateWalk, StateProfile};
use luminary_visual::{DisplayList, Surface, VisualEngine, VisualInputs};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::command::{parse_frequencies, IntensityChannel, ManualMode, SessionCommand};
use crate::config::SessionConfig;
use crate::settings::{PreferenceStore, Settings};

pub const WELCOME_MESSAGE: &str = "Welcome to LuminaryLabs. Let love and clarity heal you.";
pub const MANUAL_TONE_MESSAGE: &str = "Manual frequency selected. Focus on the tone.";
pub const CUSTOM_TONES_MESSAGE: &str = "Custom frequencies activated. Feel the harmony.";
pub const MANUAL_PEMF_MESSAGE: &str = "Manual PEMF activated.";

pub const DEFAULT_TONE_INTENSITY: f32 = 0.3;
pub const DEFAULT_PEMF_INTENSITY: f32 = 0.5;

/// Every timer a session schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    SignalTick,
    Chime,
    Frame,
    Haptic(HapticTimer),
}

impl From<HapticTimer> for TimerKind {
    fn from(timer: HapticTimer) -> Self {
        TimerKind::Haptic(timer)
    }
}

/// Clamps a user-supplied level to `[0, 1]`; non-finite input yields `None`.
fn unit_value(value: f32) -> Option<f32> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

/// Display data for the control surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub elapsed_ms: u64,
    pub heart_rate: f32,
    pub state: AffectState,
    pub affirmation: &'static str,
    pub is_playing: bool,
    pub is_biofeedback_active: bool,
    pub manual_mode: ManualMode,
    pub is_grounding_active: bool,
    pub is_crystal_attunement_active: bool,
    pub is_haptic_enabled: bool,
    pub is_haptic_ready: bool,
    pub haptic_pattern: HapticPattern,
    pub tone_intensity: f32,
    pub pemf_intensity: f32,
    pub haptic_intensity: f32,
    pub tone_frequencies: Vec<f32>,
    pub live_timers: usize,
    pub live_voices: usize,
    pub particles: usize,
    pub trail_points: usize,
}

/// One relaxation session: the orchestrator that keeps the signal, tone,
/// haptic and visual channels in lockstep.
///
/// All timers live on one simulated-clock [`Scheduler`]. Each fired timer is
/// dispatched to its owner, which reads the current session values at that
/// moment.
pub struct Session<S: Surface = DisplayList> {
    config: SessionConfig,
    store: Box<dyn PreferenceStore>,
    settings: Settings,
    scheduler: Scheduler<TimerKind>,
    signal_timer: TimerSlot,
    chime_timer: TimerSlot,
    frame_timer: TimerSlot,
    walk: HeartRateWalk,
    rng: StdRng,
    tones: ToneEngine,
    haptics: HapticEngine,
    hub: HapticHub,
    visuals: VisualEngine,
    surface: S,
    audio_clock: Duration,
    playing: bool,
    biofeedback: bool,
    manual_mode: ManualMode,
    tone_intensity: f32,
    pemf_intensity: f32,
    affirmation: &'static str,
}

impl Session<DisplayList> {
    /// Session rendering audio offline and recording frames into a
    /// [`DisplayList`].
    pub fn offline(config: SessionConfig, store: Box<dyn PreferenceStore>) -> Self {
        let tones = ToneEngine::offline(config.audio.clone());
        Self::new(config, tones, store, DisplayList::default())
    }
}

impl<S: Surface> Session<S> {
    pub fn new(
        config: SessionConfig,
        tones: ToneEngine,
        store: Box<dyn PreferenceStore>,
        surface: S,
    ) -> Self {
        let settings = Settings::load(store.as_ref());
        let (rng, visuals) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                VisualEngine::with_seed(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), VisualEngine::new()),
        };
        tracing::debug!(?settings, "session created");
        Self {
            config,
            store,
            settings,
            scheduler: Scheduler::new(),
            signal_timer: TimerSlot::Stopped,
            chime_timer: TimerSlot::Stopped,
            frame_timer: TimerSlot::Stopped,
            walk: HeartRateWalk::default(),
            rng,
            tones,
            haptics: HapticEngine::new(),
            hub: HapticHub::new(),
            visuals,
            surface,
            audio_clock: Duration::ZERO,
            playing: false,
            biofeedback: false,
            manual_mode: ManualMode::None,
            tone_intensity: DEFAULT_TONE_INTENSITY,
            pemf_intensity: DEFAULT_PEMF_INTENSITY,
            affirmation: WELCOME_MESSAGE,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn tones(&self) -> &ToneEngine {
        &self.tones
    }

    pub fn haptics(&self) -> &HapticEngine {
        &self.haptics
    }

    pub fn visuals(&self) -> &VisualEngine {
        &self.visuals
    }

    /// Where device watchers report haptic hot-plug events.
    pub fn haptic_hub(&self) -> &HapticHub {
        &self.hub
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn heart_rate(&self) -> f32 {
        self.walk.heart_rate()
    }

    pub fn state(&self) -> AffectState {
        self.walk.state()
    }

    pub fn affirmation(&self) -> &'static str {
        self.affirmation
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_biofeedback_active(&self) -> bool {
        self.biofeedback
    }

    pub fn manual_mode(&self) -> ManualMode {
        self.manual_mode
    }

    pub fn live_timers(&self) -> usize {
        self.scheduler.live_count()
    }

    pub fn live_timer_kinds(&self) -> Vec<TimerKind> {
        self.scheduler.live_kinds().copied().collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            elapsed_ms: self.scheduler.now().as_millis() as u64,
            heart_rate: self.walk.heart_rate(),
            state: self.walk.state(),
            affirmation: self.affirmation,
            is_playing: self.playing,
            is_biofeedback_active: self.biofeedback,
            manual_mode: self.manual_mode,
            is_grounding_active: self.settings.is_grounding_active,
            is_crystal_attunement_active: self.settings.is_crystal_attunement_active,
            is_haptic_enabled: self.settings.is_haptic_enabled,
            is_haptic_ready: self.haptics.is_ready(),
            haptic_pattern: self.settings.haptic_pattern,
            tone_intensity: self.tone_intensity,
            pemf_intensity: self.pemf_intensity,
            haptic_intensity: self.settings.haptic_intensity,
            tone_frequencies: self.tones.tone_frequencies(),
            live_timers: self.scheduler.live_count(),
            live_voices: self.tones.total_voices(),
            particles: self.visuals.particles().len(),
            trail_points: self.visuals.trail().len(),
        }
    }

    pub fn execute(&mut self, command: SessionCommand) {
        tracing::debug!(?command, "session command");
        match command {
            SessionCommand::StartBiofeedback => self.start_biofeedback(),
            SessionCommand::PlayManualTone(frequency) => self.play_manual_tone(frequency),
            SessionCommand::PlayManualPemf => self.play_manual_pemf(),
            SessionCommand::PlayCustomTones(entries) => self.play_custom_tones(&entries),
            SessionCommand::Stop => self.stop(),
            SessionCommand::ToggleGrounding => {
                self.settings.is_grounding_active = !self.settings.is_grounding_active;
                self.persist();
                self.apply_grounding();
            }
            SessionCommand::ToggleCrystalAttunement => {
                self.settings.is_crystal_attunement_active =
                    !self.settings.is_crystal_attunement_active;
                self.persist();
                self.apply_attunement();
            }
            SessionCommand::ToggleHaptics => {
                self.settings.is_haptic_enabled = !self.settings.is_haptic_enabled;
                self.persist();
                self.apply_haptics();
            }
            SessionCommand::SetIntensity(channel, value) => self.set_intensity(channel, value),
            SessionCommand::SetHapticPattern(pattern) => {
                self.settings.haptic_pattern = pattern;
                self.persist();
                self.apply_haptics();
            }
            SessionCommand::SetHapticPatternParams {
                wave_interval_ms,
                wave_duty_cycle,
                heartbeat_mod,
            } => {
                if let Some(interval) = wave_interval_ms {
                    self.settings.haptic_wave_interval = interval;
                }
                if let Some(duty) = wave_duty_cycle.and_then(unit_value) {
                    self.settings.haptic_wave_duty_cycle = duty;
                }
                if let Some(modifier) = heartbeat_mod.and_then(unit_value) {
                    self.settings.haptic_heartbeat_intensity_mod = modifier;
                }
                self.persist();
                self.apply_haptics();
            }
            SessionCommand::SetHeartRate(heart_rate) => self.set_heart_rate(heart_rate),
            SessionCommand::ClearSettings => self.clear_settings(),
        }
    }

    fn start_biofeedback(&mut self) {
        let calm = StateProfile::for_state(AffectState::Calm);
        self.tones.play_tones(&[calm.tone], self.tone_intensity);
        self.tones.play_pemf(Frequencies::PEMF, calm.pemf_intensity);
        self.walk.reset();
        self.haptics
            .set_heart_rate(&mut self.scheduler, self.walk.heart_rate());
        self.affirmation = calm.affirmation(0);
        self.biofeedback = true;
        self.manual_mode = ManualMode::None;
        self.signal_timer.arm_repeating(
            &mut self.scheduler,
            self.config.signal_period,
            TimerKind::SignalTick,
        );
        self.set_playing(true);
    }

    fn play_manual_tone(&mut self, frequency: f32) {
        self.begin_manual(ManualMode::Solfeggio, MANUAL_TONE_MESSAGE);
        self.tones.play_tones(&[frequency], self.tone_intensity);
        self.tones.play_pemf(Frequencies::PEMF, self.pemf_intensity);
        self.set_playing(true);
    }

    fn play_custom_tones(&mut self, entries: &[String]) {
        let frequencies = parse_frequencies(entries);
        if frequencies.is_empty() {
            tracing::debug!("no usable custom frequencies");
            return;
        }
        self.begin_manual(ManualMode::Solfeggio, CUSTOM_TONES_MESSAGE);
        self.tones.play_tones(&frequencies, self.tone_intensity);
        self.tones.play_pemf(Frequencies::PEMF, self.pemf_intensity);
        self.set_playing(true);
    }

    fn play_manual_pemf(&mut self) {
        self.begin_manual(ManualMode::Pemf, MANUAL_PEMF_MESSAGE);
        self.tones.play_pemf(Frequencies::PEMF, self.pemf_intensity);
        self.set_playing(true);
    }

    fn begin_manual(&mut self, mode: ManualMode, message: &'static str) {
        self.tones.stop_all();
        self.biofeedback = false;
        self.signal_timer.clear(&mut self.scheduler);
        self.manual_mode = mode;
        self.affirmation = message;
    }

    /// Tears every channel down. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.tones.stop_all();
        self.biofeedback = false;
        self.signal_timer.clear(&mut self.scheduler);
        self.manual_mode = ManualMode::None;
        self.affirmation = WELCOME_MESSAGE;
        self.set_playing(false);
    }

    /// Overrides the simulated heart rate.
    pub fn set_heart_rate(&mut self, heart_rate: f32) {
        self.walk.set(heart_rate);
        self.haptics.set_heart_rate(&mut self.scheduler, heart_rate);
    }

    fn set_intensity(&mut self, channel: IntensityChannel, value: f32) {
        let Some(value) = unit_value(value) else {
            tracing::debug!(?channel, value, "ignoring non-finite intensity");
            return;
        };
        match channel {
            IntensityChannel::Tone => {
                self.tone_intensity = value;
                if self.playing {
                    self.tones.update_tone_intensity(value);
                }
            }
            IntensityChannel::Pemf => {
                self.pemf_intensity = value;
                if self.playing {
                    self.tones.update_pemf_intensity(value);
                }
            }
            IntensityChannel::Haptic => {
                self.settings.haptic_intensity = value;
                self.persist();
                self.apply_haptics();
            }
        }
    }

    fn clear_settings(&mut self) {
        self.settings.clear(self.store.as_mut());
        self.apply_grounding();
        self.apply_attunement();
        self.apply_haptics();
    }

    fn persist(&mut self) {
        self.settings.save(self.store.as_mut());
    }

    fn set_playing(&mut self, playing: bool) {
        let was_playing = self.playing;
        self.playing = playing;
        self.apply_grounding();
        self.apply_attunement();
        self.apply_haptics();
        if playing {
            self.visuals.start();
            if !self.frame_timer.is_running() {
                self.frame_timer.arm_repeating(
                    &mut self.scheduler,
                    self.config.frame_interval,
                    TimerKind::Frame,
                );
            }
        } else {
            self.frame_timer.clear(&mut self.scheduler);
            self.visuals.stop(&mut self.surface);
        }
        if playing != was_playing {
            tracing::info!(playing, "session playback changed");
        }
    }

    fn apply_grounding(&mut self) {
        if self.playing && self.settings.is_grounding_active {
            if self.tones.voice_count(VoiceRole::Schumann) == 0 {
                self.tones.play_schumann(Frequencies::SCHUMANN);
            }
        } else {
            self.tones.stop_schumann();
        }
    }

    fn apply_attunement(&mut self) {
        if self.playing && self.settings.is_crystal_attunement_active {
            if !self.chime_timer.is_running() {
                self.chime_timer.arm_repeating(
                    &mut self.scheduler,
                    self.config.chime_period,
                    TimerKind::Chime,
                );
            }
        } else {
            self.chime_timer.clear(&mut self.scheduler);
            self.tones.stop_crystal_chime();
        }
    }

    fn apply_haptics(&mut self) {
        let active = self.playing && self.settings.is_haptic_enabled;
        if active {
            self.haptics.configure(
                &mut self.scheduler,
                true,
                self.settings.haptic_pattern,
                self.settings.pattern_params(),
            );
        } else {
            self.haptics.disable(&mut self.scheduler);
        }
    }

    /// Advances the session clock by `elapsed`, firing every due timer in
    /// order. Rendered audio is discarded.
    pub fn advance(&mut self, elapsed: Duration) {
        self.advance_with(elapsed, |_| {});
    }

    /// Like [`Session::advance`], handing every rendered audio block to
    /// `sink`.
    pub fn advance_with(&mut self, elapsed: Duration, mut sink: impl FnMut(&AudioBuffer)) {
        self.drain_device_events();
        let until = self.scheduler.now() + elapsed;
        while let Some(fired) = self.scheduler.pop_due(until) {
            self.sync_audio(fired.at, &mut sink);
            self.dispatch(&fired);
        }
        self.scheduler.advance_to(until);
        self.sync_audio(until, &mut sink);
    }

    fn sync_audio(&mut self, at: Duration, sink: &mut impl FnMut(&AudioBuffer)) {
        if at > self.audio_clock {
            let delta = at - self.audio_clock;
            self.tones.advance(delta, |block| sink(block));
            self.audio_clock = at;
        }
    }

    fn drain_device_events(&mut self) {
        for event in self.hub.drain() {
            self.haptics.handle_event(&mut self.scheduler, event);
        }
    }

    fn dispatch(&mut self, fired: &Fired<TimerKind>) {
        match fired.kind {
            TimerKind::SignalTick => {
                if self.signal_timer.acknowledge(fired) && self.biofeedback {
                    self.signal_tick();
                }
            }
            TimerKind::Chime => {
                if self.chime_timer.acknowledge(fired) {
                    self.tones.play_crystal_chime();
                }
            }
            TimerKind::Frame => {
                if self.frame_timer.acknowledge(fired) {
                    let inputs = VisualInputs {
                        state: self.walk.state(),
                        heart_rate: self.walk.heart_rate(),
                        grounding: self.settings.is_grounding_active,
                        attunement: self.settings.is_crystal_attunement_active,
                    };
                    self.visuals.render_frame(&mut self.surface, &inputs);
                }
            }
            TimerKind::Haptic(timer) => self.haptics.on_timer(&mut self.scheduler, fired, timer),
        }
    }

    fn signal_tick(&mut self) {
        let tick = self.walk.tick(&mut self.rng);
        let profile = tick.previous_state.profile();
        self.tones.update_tone_frequency(profile.tone);
        self.tones.update_pemf_intensity(profile.pemf_intensity);
        let index = self.rng.gen_range(0..profile.affirmations.len().max(1));
        self.affirmation = profile.affirmation(index);
        self.haptics.set_heart_rate(&mut self.scheduler, tick.heart_rate);
        tracing::trace!(heart_rate = tick.heart_rate, state = %tick.state, "signal tick");
    }
}
