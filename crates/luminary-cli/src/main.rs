use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use luminary_engine::{BufferConfig, ChannelLayout, ToneEngine};
use luminary_haptics::{HapticDescriptor, HapticPattern, LoggingActuator};
use luminary_session::{
    FileStore, MemoryStore, PreferenceStore, Session, SessionCommand, SessionConfig, Settings,
};
use luminary_signal::AffectState;
use luminary_visual::{DisplayList, Surface};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => execute_run(args),
        Commands::Render(args) => execute_render(args),
        Commands::Settings(args) => execute_settings(args),
    }
}

#[derive(Parser)]
#[command(author, version, about = "State-synchronised tone, haptic and visual sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session in real time.
    Run(RunArgs),
    /// Render a session offline to a WAV file and a final-frame SVG.
    Render(RenderArgs),
    /// Inspect or clear persisted preferences.
    Settings(SettingsArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Simulated heart rate drives every channel.
    Biofeedback,
    /// One manual tone plus the PEMF carrier.
    Tone,
    /// PEMF carrier only.
    Pemf,
    /// Several manual tones from `--custom`.
    Custom,
}

#[derive(Args)]
struct SessionArgs {
    /// Session mode.
    #[arg(long, value_enum, default_value_t = Mode::Biofeedback)]
    mode: Mode,
    /// Tone frequency for `--mode tone`.
    #[arg(long, default_value_t = 528.0)]
    frequency: f32,
    /// Comma separated frequencies for `--mode custom`.
    #[arg(long, value_delimiter = ',')]
    custom: Vec<String>,
    /// Starting heart rate override.
    #[arg(long)]
    heart_rate: Option<f32>,
    /// Haptic pattern to select before starting.
    #[arg(long)]
    pattern: Option<HapticPattern>,
    /// Attach a logging haptic device.
    #[arg(long)]
    haptic_device: bool,
    /// Session length in seconds.
    #[arg(long, default_value_t = 30.0)]
    duration: f32,
    /// Seed for every random draw.
    #[arg(long)]
    seed: Option<u64>,
    /// Preferences directory; defaults to the user config directory.
    #[arg(long)]
    settings_dir: Option<PathBuf>,
    /// Keep preferences in memory only.
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Advance simulated time as fast as possible instead of in real time.
    #[arg(long)]
    fast: bool,
}

#[derive(Args)]
struct RenderArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Output path for the audio mixdown.
    #[arg(long)]
    wav: PathBuf,
    /// Output path for the last rendered frame.
    #[arg(long)]
    svg: Option<PathBuf>,
    /// Sample rate of the mixdown.
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,
}

#[derive(Args)]
struct SettingsArgs {
    #[command(subcommand)]
    action: SettingsAction,
    /// Preferences directory; defaults to the user config directory.
    #[arg(long, global = true)]
    settings_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the stored preferences as JSON.
    Show,
    /// Delete the stored preferences.
    Clear,
}

fn open_store(dir: Option<&PathBuf>, ephemeral: bool) -> Result<Box<dyn PreferenceStore>> {
    if ephemeral {
        return Ok(Box::new(MemoryStore::new()));
    }
    let store = match dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::user().context("no preferences directory")?,
    };
    tracing::debug!(dir = %store.dir().display(), "using preferences directory");
    Ok(Box::new(store))
}

fn session_length(seconds: f32) -> Result<Duration> {
    match Duration::try_from_secs_f32(seconds) {
        Ok(length) if !length.is_zero() => Ok(length),
        Ok(_) => bail!("duration must be a positive number of seconds"),
        Err(err) => bail!("invalid duration {seconds}: {err}"),
    }
}

fn session_config(args: &SessionArgs, audio: BufferConfig) -> SessionConfig {
    let mut config = SessionConfig::default().with_audio(audio);
    config.seed = args.seed;
    config
}

fn start_session<S: Surface>(session: &mut Session<S>, args: &SessionArgs) {
    if args.haptic_device {
        session.haptic_hub().connect(
            HapticDescriptor::dual_rumble("cli-haptics"),
            Box::new(LoggingActuator::new("cli-haptics")),
        );
        if !session.settings().is_haptic_enabled {
            session.execute(SessionCommand::ToggleHaptics);
        }
    }
    if let Some(pattern) = args.pattern {
        session.execute(SessionCommand::SetHapticPattern(pattern));
    }
    let command = match args.mode {
        Mode::Biofeedback => SessionCommand::StartBiofeedback,
        Mode::Tone => SessionCommand::PlayManualTone(args.frequency),
        Mode::Pemf => SessionCommand::PlayManualPemf,
        Mode::Custom => SessionCommand::PlayCustomTones(args.custom.clone()),
    };
    session.execute(command);
    if let Some(heart_rate) = args.heart_rate {
        session.execute(SessionCommand::SetHeartRate(heart_rate));
    }
    if !session.is_playing() {
        tracing::warn!("nothing to play; check the session arguments");
    }
}

fn log_status<S: Surface>(
    session: &Session<S>,
    last: &mut Option<(AffectState, &'static str)>,
) {
    let snapshot = session.snapshot();
    let current = (snapshot.state, snapshot.affirmation);
    if last.as_ref() != Some(&current) {
        tracing::info!(
            elapsed_ms = snapshot.elapsed_ms,
            heart_rate = snapshot.heart_rate,
            state = %snapshot.state,
            voices = snapshot.live_voices,
            "{}",
            snapshot.affirmation
        );
        *last = Some(current);
    }
}

#[cfg(feature = "native")]
fn live_tones(audio: &BufferConfig) -> ToneEngine {
    ToneEngine::new(Box::new(luminary_engine::CpalDevice::new()), audio.clone())
}

#[cfg(not(feature = "native"))]
fn live_tones(audio: &BufferConfig) -> ToneEngine {
    tracing::info!("built without the `native` feature; audio is rendered silently");
    ToneEngine::offline(audio.clone())
}

fn execute_run(args: RunArgs) -> Result<()> {
    let total = session_length(args.session.duration)?;
    let config = session_config(&args.session, BufferConfig::default());
    let store = open_store(args.session.settings_dir.as_ref(), args.session.ephemeral)?;
    let tones = live_tones(&config.audio);
    let frame = config.frame_interval;
    let mut session = Session::new(config, tones, store, DisplayList::default());
    start_session(&mut session, &args.session);

    let started = Instant::now();
    let mut last = None;
    while session.now() < total {
        let step = frame.min(total - session.now());
        session.advance(step);
        log_status(&session, &mut last);
        if !args.fast {
            let target = session.now();
            if let Some(wait) = target.checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        }
    }
    let snapshot = session.snapshot();
    session.execute(SessionCommand::Stop);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn execute_render(args: RenderArgs) -> Result<()> {
    let audio = BufferConfig::new(args.sample_rate as f32, 512, ChannelLayout::Stereo);
    let total = session_length(args.session.duration)?;
    let config = session_config(&args.session, audio.clone());
    let store = open_store(args.session.settings_dir.as_ref(), args.session.ephemeral)?;
    let mut session = Session::offline(config, store);

    let spec = hound::WavSpec {
        channels: audio.layout.channels() as u16,
        sample_rate: args.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.wav, spec)
        .with_context(|| format!("failed to create {}", args.wav.display()))?;

    start_session(&mut session, &args.session);
    let step = Duration::from_millis(100);
    let mut interleaved = Vec::new();
    let mut write_error = None;
    let mut last = None;
    while session.now() < total && write_error.is_none() {
        let chunk = step.min(total - session.now());
        session.advance_with(chunk, |block| {
            interleaved.clear();
            block.interleave_into(&mut interleaved);
            for sample in &interleaved {
                if let Err(err) = writer.write_sample(*sample) {
                    write_error.get_or_insert(err);
                    return;
                }
            }
        });
        log_status(&session, &mut last);
    }
    if let Some(err) = write_error {
        return Err(err).context("failed to write audio");
    }
    writer.finalize().context("failed to finalize WAV file")?;

    if let Some(path) = &args.svg {
        fs::write(path, session.surface().to_svg())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Frame: {}", path.display());
    }
    let snapshot = session.snapshot();
    session.execute(SessionCommand::Stop);
    println!(
        "Rendered {:.1}s to {} (final state {}, heart rate {:.1})",
        total.as_secs_f32(),
        args.wav.display(),
        snapshot.state,
        snapshot.heart_rate
    );
    Ok(())
}

fn execute_settings(args: SettingsArgs) -> Result<()> {
    let mut store = open_store(args.settings_dir.as_ref(), false)?;
    match args.action {
        SettingsAction::Show => {
            let settings = Settings::load(store.as_ref());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Clear => {
            let mut settings = Settings::load(store.as_ref());
            settings.clear(store.as_mut());
            println!("Preferences cleared.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_length_rejects_unusable_durations() {
        assert_eq!(session_length(2.5).unwrap(), Duration::from_millis(2_500));
        assert!(session_length(0.0).is_err());
        assert!(session_length(-1.0).is_err());
        assert!(session_length(f32::NAN).is_err());
        assert!(session_length(1e30).is_err());
    }
}
