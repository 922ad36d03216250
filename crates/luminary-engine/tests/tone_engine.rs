use std::time::Duration;

use proptest::prelude::*;

use luminary_engine::{
    AudioBuffer, BufferConfig, ChannelLayout, ToneEngine, UnavailableDevice, VoiceRole,
    CHIME_FREQUENCY,
};

fn engine() -> ToneEngine {
    ToneEngine::offline(BufferConfig::new(8_000.0, 256, ChannelLayout::Mono))
}

#[test]
fn play_tones_drops_invalid_frequencies() {
    let mut engine = engine();
    let created = engine.play_tones(&[440.0, -5.0, f32::NAN, 220.0], 0.3);
    assert_eq!(created, 2);
    assert_eq!(engine.voice_count(VoiceRole::Tone), 2);
    assert_eq!(engine.tone_frequencies(), vec![440.0, 220.0]);
    assert_eq!(engine.tone_gains(), vec![0.3, 0.3]);
}

#[test]
fn play_tones_replaces_previous_tones() {
    let mut engine = engine();
    engine.play_tones(&[432.0, 528.0, 963.0], 0.3);
    engine.play_tones(&[528.0], 0.3);
    assert_eq!(engine.tone_frequencies(), vec![528.0]);
}

#[test]
fn chime_never_overlaps_and_releases_itself() {
    let mut engine = engine();
    assert!(engine.play_crystal_chime());
    assert!(!engine.play_crystal_chime());
    assert_eq!(engine.voice_count(VoiceRole::Chime), 1);

    engine.advance(Duration::from_millis(6_499), |_| {});
    assert_eq!(engine.voice_count(VoiceRole::Chime), 1);
    engine.advance(Duration::from_millis(1), |_| {});
    assert_eq!(engine.voice_count(VoiceRole::Chime), 0);
    assert_eq!(engine.total_voices(), 0);

    assert!(engine.play_crystal_chime());
}

#[test]
fn stopped_chime_fades_quickly() {
    let mut engine = engine();
    engine.play_crystal_chime();
    engine.advance(Duration::from_secs(3), |_| {});
    engine.stop_crystal_chime();
    assert_eq!(engine.voice_count(VoiceRole::Chime), 0);
    assert_eq!(engine.total_voices(), 1);
    engine.advance(Duration::from_millis(200), |_| {});
    assert_eq!(engine.total_voices(), 0);
}

#[test]
fn chime_is_audible_at_its_peak() {
    let mut engine = engine();
    engine.play_crystal_chime();
    let mut peak = 0.0f32;
    engine.advance(Duration::from_millis(2_100), |block| {
        peak = peak.max(block.peak());
    });
    assert!(peak > 0.09, "peak {peak}");
    assert!(peak <= 0.1 + 1e-4, "peak {peak}");
    assert!(CHIME_FREQUENCY < 8_000.0 / 2.0);
}

#[test]
fn stop_all_is_idempotent() {
    let mut engine = engine();
    engine.play_tones(&[528.0], 0.3);
    engine.play_pemf(40.0, 0.5);
    engine.play_schumann(7.83);
    engine.play_crystal_chime();
    assert_eq!(engine.total_voices(), 4);

    engine.stop_all();
    engine.stop_all();
    assert_eq!(engine.total_voices(), 0);
}

#[test]
fn single_roles_are_replaced_not_duplicated() {
    let mut engine = engine();
    engine.play_pemf(40.0, 0.5);
    engine.play_pemf(40.0, 0.7);
    engine.play_schumann(7.83);
    engine.play_schumann(7.83);
    assert_eq!(engine.voice_count(VoiceRole::Pemf), 1);
    assert_eq!(engine.voice_count(VoiceRole::Schumann), 1);
    assert_eq!(engine.pemf_gain(), Some(0.7));

    engine.stop_schumann();
    assert_eq!(engine.voice_count(VoiceRole::Schumann), 0);
    assert_eq!(engine.voice_count(VoiceRole::Pemf), 1);
}

#[test]
fn updates_before_any_play_are_no_ops() {
    let mut engine = engine();
    engine.update_tone_frequency(432.0);
    engine.update_tone_intensity(0.9);
    engine.update_pemf_intensity(0.9);
    engine.stop_crystal_chime();
    engine.stop_schumann();
    engine.stop_all();
    assert!(!engine.is_ready());
    assert_eq!(engine.total_voices(), 0);
}

#[test]
fn updates_apply_in_place() {
    let mut engine = engine();
    engine.play_tones(&[528.0], 0.3);
    engine.play_pemf(40.0, 0.5);
    engine.advance(Duration::from_millis(100), |_| {});

    engine.update_tone_frequency(432.0);
    engine.update_tone_intensity(0.6);
    engine.update_pemf_intensity(0.7);
    assert_eq!(engine.tone_frequencies(), vec![432.0]);
    assert_eq!(engine.tone_gains(), vec![0.6]);
    assert_eq!(engine.pemf_gain(), Some(0.7));
}

#[test]
fn unavailable_device_degrades_to_no_ops() {
    let mut engine = ToneEngine::new(
        Box::new(UnavailableDevice::new("headless")),
        BufferConfig::default(),
    );
    assert_eq!(engine.play_tones(&[528.0], 0.3), 0);
    engine.play_pemf(40.0, 0.5);
    assert!(!engine.play_crystal_chime());
    assert!(engine.is_unavailable());
    assert_eq!(engine.total_voices(), 0);

    let mut buffer = AudioBuffer::new(1, 64);
    assert!(!engine.render(&mut buffer));
    engine.stop_all();
}

#[test]
fn close_releases_context_and_reacquires_on_demand() {
    let mut engine = engine();
    engine.play_tones(&[528.0], 0.3);
    engine.advance(Duration::from_secs(1), |_| {});
    assert!((engine.now() - 1.0).abs() < 1e-9);

    engine.close();
    assert!(!engine.is_ready());
    assert_eq!(engine.total_voices(), 0);

    engine.play_pemf(40.0, 0.5);
    assert!(engine.is_ready());
    assert_eq!(engine.now(), 0.0);
}

#[test]
fn advance_carries_fractional_frames() {
    let mut engine = ToneEngine::offline(BufferConfig::new(1_000.0, 64, ChannelLayout::Mono));
    engine.play_tones(&[100.0], 0.3);
    let mut frames = 0;
    for _ in 0..3 {
        engine.advance(Duration::from_micros(16_667), |block| frames += block.len());
    }
    assert_eq!(frames, 50);
}

proptest! {
    #[test]
    fn mixed_output_never_clips(
        frequencies in proptest::collection::vec(20.0f32..4_000.0, 1..8),
        intensity in 0.0f32..4.0,
        pemf in 0.0f32..4.0,
    ) {
        let mut engine = engine();
        engine.play_tones(&frequencies, intensity);
        engine.play_pemf(40.0, pemf);
        engine.play_schumann(7.83);
        engine.play_crystal_chime();
        let mut peak = 0.0f32;
        engine.advance(Duration::from_millis(250), |block| {
            peak = peak.max(block.peak());
        });
        prop_assert!(peak <= 1.0);
    }
}
