//! Reverie kiosk binary

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reverie::app::KioskApp;
use reverie::config::{default_config_path, ApiKeys, Config};
use reverie::engine::{Engine, UserAction};
use reverie::voice::{AudioPlayback, AudioRecorder, SpeechSynthesizer};

#[derive(Parser)]
#[command(name = "reverie", version, about = "A voice-driven painting kiosk")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run in a window instead of fullscreen
    #[arg(long)]
    windowed: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Record one gated session from the microphone and save it as WAV
    TestMic {
        /// Recording cap in seconds
        #[arg(default_value_t = 10.0)]
        duration: f64,
    },
    /// Play a short test tone
    TestSpeaker,
    /// Synthesize a phrase and play it
    TestTts {
        /// Text to speak
        #[arg(default_value = "Reverie is listening.")]
        text: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("reverie={default_level}"))),
        )
        .init();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    tracing::info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path).context("loading configuration")?;

    match cli.command {
        Some(Command::TestMic { duration }) => test_mic(config, duration),
        Some(Command::TestSpeaker) => test_speaker(),
        Some(Command::TestTts { text }) => test_tts(config, &text),
        None => run_kiosk(config, cli.windowed),
    }
}

/// Start the engine on a worker thread and run the window on this one
fn run_kiosk(config: Config, windowed: bool) -> anyhow::Result<()> {
    let keys = ApiKeys::from_env();

    let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
    let (action_tx, action_rx) = crossbeam_channel::unbounded();

    let engine = Engine::new(config, &keys, frame_tx, action_rx)
        .context("initializing engine")?;

    let worker = std::thread::Builder::new()
        .name("engine".to_string())
        .spawn(move || engine.run())
        .context("spawning engine thread")?;

    let viewport = if windowed {
        eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Reverie")
    } else {
        eframe::egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title("Reverie")
    };
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let app_actions = action_tx.clone();
    let result = eframe::run_native(
        "Reverie",
        options,
        Box::new(move |_cc| Ok(Box::new(KioskApp::new(frame_rx, app_actions)))),
    );
    if let Err(e) = result {
        anyhow::bail!("window error: {e}");
    }

    // Window closed without Escape still shuts the engine down
    let _ = action_tx.send(UserAction::Quit);
    match worker.join() {
        Ok(engine_result) => engine_result.context("engine loop"),
        Err(_) => anyhow::bail!("engine thread panicked"),
    }
}

/// Record one gated session and write it next to the working directory
fn test_mic(mut config: Config, duration: f64) -> anyhow::Result<()> {
    config.audio.max_recording_secs = duration;
    let sample_rate = config.audio.sample_rate;

    let recorder = AudioRecorder::new(config.audio).context("opening microphone")?;
    tracing::info!("recording, speak now");
    let recording = recorder.record().context("recording")?;
    tracing::info!(
        chunks = recording.chunks_read,
        valid = recording.valid,
        "recording finished"
    );

    let wav = reverie::voice::pcm_to_wav(&recording.pcm, sample_rate)?;
    std::fs::write("mic-test.wav", wav).context("writing mic-test.wav")?;
    tracing::info!("wrote mic-test.wav");
    Ok(())
}

/// Play one second of a 440 Hz tone
fn test_speaker() -> anyhow::Result<()> {
    const SAMPLE_RATE: f32 = 16_000.0;
    const FREQ: f32 = 440.0;

    let playback = AudioPlayback::new().context("opening speaker")?;
    #[allow(clippy::cast_precision_loss)]
    let tone: Vec<f32> = (0..16_000)
        .map(|i| (i as f32 * FREQ * 2.0 * std::f32::consts::PI / SAMPLE_RATE).sin() * 0.4)
        .collect();
    playback.play(&tone).context("playing tone")?;
    Ok(())
}

/// Synthesize and play a phrase, bypassing the cache
fn test_tts(config: Config, text: &str) -> anyhow::Result<()> {
    let keys = ApiKeys::from_env();
    let key = keys
        .azure_speech_key
        .context("AZURE_SPEECH_KEY is not set")?;
    let region = keys
        .azure_speech_region
        .context("AZURE_SPEECH_REGION is not set")?;

    let synthesizer =
        SpeechSynthesizer::new(key, region, config.voice).context("initializing synthesizer")?;
    let playback = AudioPlayback::new().context("opening speaker")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let audio = runtime
        .block_on(synthesizer.synthesize(text, false))
        .context("synthesizing")?;
    playback.play_wav(&audio).context("playing")?;
    Ok(())
}
