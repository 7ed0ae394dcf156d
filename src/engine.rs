//! Orchestration of the kiosk: idle loop, creations, and daydreams
//!
//! The engine runs on its own thread, composing frames and handing them to
//! the window over a channel; user actions arrive on a second channel. API
//! clients are async and are driven with a current-thread runtime, so the
//! whole pipeline stays a single sequential blocking loop — the capture call
//! is the deliberate blocking point, exactly as the recorder contract says.

use std::time::{Duration, Instant};

use chrono::{Datelike, Local, Timelike};
use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::canvas::{Canvas, Creation, Side};
use crate::chat::{best_verse, one_verse, ChatCharacter};
use crate::config::{ApiKeys, Config};
use crate::imagegen::{self, ImageCreator};
use crate::moderation::Moderator;
use crate::recents::{self, RecentCreation};
use crate::storage::{render_share_page, Storage};
use crate::voice::{AudioPlayback, AudioRecorder, SpeechSynthesizer, Transcriber};
use crate::{qr, Error, Result};

/// How many consecutive invalid recordings end a listening session
const MAX_SILENT_LOOPS: usize = 10;

/// Idle loop poll interval
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An action requested by the visitor (or the daydream timer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Shut the kiosk down
    Quit,
    /// Start a new voice-driven creation
    NewCreation,
    /// Start a manual daydream
    Daydream,
    /// Reveal the prompt behind the current creation
    ShowPrompt,
    /// Reveal the QR share link for the current creation
    ShowQr,
    /// Step backwards through recent creations
    PreviousRecent,
    /// Step forwards through recent creations
    NextRecent,
    /// Daydream fired by the idle timer
    AutoDaydream,
}

/// What broke the idle loop
enum Trigger {
    Quit,
    New,
    Daydream { manual: bool },
}

/// The creation currently on screen
struct Current {
    base_name: String,
    prompt: String,
    daydream: bool,
    frame: RgbaImage,
}

/// The kiosk engine: owns every collaborator and the sequential loop
pub struct Engine {
    config: Config,
    recorder: AudioRecorder,
    playback: AudioPlayback,
    transcriber: Transcriber,
    synthesizer: SpeechSynthesizer,
    poet: ChatCharacter,
    critic: Option<ChatCharacter>,
    artist: ChatCharacter,
    moderator: Moderator,
    creator: Box<dyn ImageCreator>,
    canvas: Canvas,
    storage: Option<Storage>,
    runtime: tokio::runtime::Runtime,

    frames: Sender<RgbaImage>,
    actions: Receiver<UserAction>,

    recents: Vec<RecentCreation>,
    recent_index: usize,
    previous_prompt: String,
    current: Option<Current>,
    manual_daydreams: Vec<Instant>,
    next_daydream: Instant,
}

impl Engine {
    /// Build the engine and every collaborator it sequences
    ///
    /// # Errors
    ///
    /// Returns error if any device, font, or credential is unusable
    pub fn new(
        config: Config,
        keys: &ApiKeys,
        frames: Sender<RgbaImage>,
        actions: Receiver<UserAction>,
    ) -> Result<Self> {
        let openai_key = keys.require_openai()?.to_string();

        let azure_key = keys
            .azure_speech_key
            .clone()
            .ok_or_else(|| Error::Config("AZURE_SPEECH_KEY is not set".to_string()))?;
        let azure_region = keys
            .azure_speech_region
            .clone()
            .ok_or_else(|| Error::Config("AZURE_SPEECH_REGION is not set".to_string()))?;

        tracing::debug!("initializing audio recorder");
        let recorder = AudioRecorder::new(config.audio.clone())?;

        tracing::debug!("initializing audio playback");
        let playback = AudioPlayback::new()?;

        tracing::debug!("initializing transcriber");
        let transcriber = Transcriber::new(
            openai_key.clone(),
            "whisper-1".to_string(),
            config.audio.sample_rate,
        )?;

        tracing::debug!("initializing speech synthesizer");
        let synthesizer =
            SpeechSynthesizer::new(azure_key, azure_region, config.voice.clone())?;

        tracing::debug!("initializing chat characters");
        let poet = ChatCharacter::new(
            openai_key.clone(),
            config.poet.poet_model.clone(),
            config.poet.poet_system_prompt.clone(),
        )?;
        let critic = if config.poet.use_critic {
            Some(ChatCharacter::new(
                openai_key.clone(),
                config.poet.critic_model.clone(),
                config.poet.critic_system_prompt.clone(),
            )?)
        } else {
            None
        };
        let artist = ChatCharacter::new(
            openai_key.clone(),
            config.poet.artist_model.clone(),
            config.poet.artist_system_prompt.clone(),
        )?;

        tracing::debug!("initializing moderator");
        let moderator = Moderator::new(openai_key)?;

        tracing::debug!(model = %config.image.model, "initializing image creator");
        let creator = imagegen::from_config(&config.image, keys)?;

        tracing::debug!("initializing canvas");
        let canvas = Canvas::new(config.display.clone())?;

        let storage = match keys.azure_storage_sas.clone() {
            Some(sas) => Some(Storage::new(&config.storage, sas)?),
            None => {
                tracing::warn!("AZURE_STORAGE_SAS not set, uploads disabled");
                None
            }
        };

        std::fs::create_dir_all(&config.storage.output_dir)?;

        tracing::debug!("loading recent creations");
        let recents = recents::load(&config.storage.recents_file)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut engine = Self {
            config,
            recorder,
            playback,
            transcriber,
            synthesizer,
            poet,
            critic,
            artist,
            moderator,
            creator,
            canvas,
            storage,
            runtime,
            frames,
            actions,
            recents,
            recent_index: 0,
            previous_prompt: String::new(),
            current: None,
            manual_daydreams: Vec::new(),
            next_daydream: Instant::now(),
        };
        engine.reschedule_daydream();

        Ok(engine)
    }

    /// Run until a quit action arrives
    ///
    /// # Errors
    ///
    /// Returns error on unrecoverable device failures; generation failures
    /// are reported on screen and the loop continues
    pub fn run(mut self) -> Result<()> {
        self.show_status("Ready");

        loop {
            // Drop actions that piled up while we were busy creating
            while self.actions.try_recv().is_ok() {}

            let trigger = self.idle();

            match trigger {
                Trigger::Quit => {
                    tracing::info!("kiosk shutting down");
                    return Ok(());
                }
                Trigger::New => self.create(false, false)?,
                Trigger::Daydream { manual } => self.create(true, manual)?,
            }
        }
    }

    /// Idle loop: poll for actions, service overlays, fire scheduled
    /// daydreams
    fn idle(&mut self) -> Trigger {
        loop {
            std::thread::sleep(POLL_INTERVAL);

            self.expire_manual_daydreams();

            if self.auto_daydream_due() {
                tracing::info!("automatic daydream timer elapsed");
                return Trigger::Daydream { manual: false };
            }

            let Ok(action) = self.actions.try_recv() else {
                continue;
            };

            match action {
                UserAction::Quit => return Trigger::Quit,
                UserAction::NewCreation => return Trigger::New,
                UserAction::AutoDaydream => return Trigger::Daydream { manual: false },
                UserAction::Daydream => {
                    if self.manual_daydreams.len() < self.config.daydream.manual_limit {
                        tracing::debug!("manual daydream request accepted");
                        self.manual_daydreams.push(Instant::now());
                        return Trigger::Daydream { manual: true };
                    }
                    tracing::debug!("manual daydream request refused");
                    self.speak_random_line(&self.config.lines.daydream_refusal_lines);
                }
                UserAction::ShowPrompt => self.show_prompt_card(),
                UserAction::ShowQr => self.show_qr(),
                UserAction::PreviousRecent => self.navigate_recents(-1),
                UserAction::NextRecent => self.navigate_recents(1),
            }
        }
    }

    /// Drop manual-daydream timestamps older than the rate-limit window
    fn expire_manual_daydreams(&mut self) {
        let window = Duration::from_secs(self.config.daydream.manual_window_minutes * 60);
        self.manual_daydreams.retain(|t| t.elapsed() <= window);
    }

    /// Whether the automatic daydream timer has elapsed inside its hours
    fn auto_daydream_due(&self) -> bool {
        if Instant::now() < self.next_daydream {
            return false;
        }

        let now = Local::now();
        let hour = now.hour();
        let weekday = now.weekday().number_from_monday();

        hour >= self.config.daydream.start_hour
            && hour < self.config.daydream.end_hour
            && self.config.daydream.iso_weekdays.contains(&weekday)
    }

    /// Schedule the next automatic daydream at a random idle interval
    fn reschedule_daydream(&mut self) {
        let min = self.config.daydream.min_minutes * 60;
        let max = self.config.daydream.max_minutes * 60;
        let secs = rand::thread_rng().gen_range(min..=max);
        self.next_daydream = Instant::now() + Duration::from_secs(secs);
        tracing::debug!(in_secs = secs, "next automatic daydream scheduled");
    }

    /// One full creation cycle, voice-driven or daydreamed
    fn create(&mut self, daydream: bool, manual: bool) -> Result<()> {
        let prompt = if daydream {
            tracing::info!("=== starting daydream ===");
            match self.daydream_prompt(manual) {
                Ok(p) => p,
                Err(e) => return self.creation_failed(&e),
            }
        } else {
            tracing::info!("=== starting new creation ===");
            match self.listen_for_prompt() {
                Ok(Some(p)) => p,
                Ok(None) => {
                    // Nobody spoke; back to idle
                    self.show_status("Ready");
                    return Ok(());
                }
                // Device failures are fatal, service failures are not
                Err(e @ (Error::Audio(_) | Error::Io(_))) => return Err(e),
                Err(e) => return self.creation_failed(&e),
            }
        };

        let base_name = random_base_name(self.config.storage.file_name_length);
        tracing::info!(base_name = %base_name, "creation base name");

        let style = self
            .config
            .poet
            .image_base_prompts
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();
        let img_prompt = format!("{style}{prompt}");
        self.previous_prompt = prompt.clone();

        match self.produce(&base_name, &prompt, &img_prompt, daydream, manual) {
            Ok(()) => {
                self.reschedule_daydream();
                Ok(())
            }
            // Device and filesystem failures are fatal, service failures
            // are reported on screen and the loop continues
            Err(e @ (Error::Audio(_) | Error::Io(_))) => Err(e),
            Err(e) => self.creation_failed(&e),
        }
    }

    /// Report a recoverable creation failure on screen and aloud
    fn creation_failed(&mut self, error: &Error) -> Result<()> {
        tracing::warn!(error = %error, "creation failed");
        self.show_status("Creation failed!");
        self.speak_random_line(&self.config.lines.failed_lines);
        Ok(())
    }

    /// Record until a valid utterance arrives, then transcribe it
    ///
    /// Up to [`MAX_SILENT_LOOPS`] consecutive invalid recordings before
    /// giving up with `None`.
    fn listen_for_prompt(&mut self) -> Result<Option<String>> {
        self.show_status(" ");
        let greeting = format!(
            "{} {}",
            random_line(&self.config.lines.welcome_words),
            random_line(&self.config.lines.welcome_lines),
        );
        self.speak(&greeting, true);

        self.show_status("Listening...");
        tracing::debug!("recording");

        for _ in 0..MAX_SILENT_LOOPS {
            let recording = self.recorder.record()?;

            if recording.valid {
                self.show_status("Working...");
                self.speak_random_line(&self.config.lines.working_lines);

                let transcript = self
                    .runtime
                    .block_on(self.transcriber.transcribe(&recording.pcm))?;
                tracing::info!(transcript = %transcript, "transcribed");
                return Ok(Some(transcript));
            }
        }

        tracing::debug!("only silence detected");
        Ok(None)
    }

    /// Ask the artist character for a daydream prompt
    fn daydream_prompt(&mut self, manual: bool) -> Result<String> {
        self.artist.reset();
        self.show_status("Daydreaming...");

        // Only announce daydreams a visitor asked for
        if manual {
            self.speak_random_line(&self.config.lines.daydream_lines);
        }

        let seed = if self.previous_prompt.is_empty() {
            "something completely random.".to_string()
        } else {
            self.previous_prompt.clone()
        };

        tracing::debug!(seed = %seed, "daydreaming");
        let message = format!("{} {seed}", self.config.poet.artist_base_prompt);
        let prompt = self.runtime.block_on(self.artist.send(&message))?.content;
        tracing::info!(prompt = %prompt, "daydreamed");

        Ok(prompt)
    }

    /// Moderate, generate, compose, persist, and upload one creation
    #[allow(clippy::too_many_lines)]
    fn produce(
        &mut self,
        base_name: &str,
        prompt: &str,
        img_prompt: &str,
        daydream: bool,
        manual: bool,
    ) -> Result<()> {
        let allowed = self.runtime.block_on(self.moderator.check(img_prompt))?;
        if !allowed {
            return Err(Error::Moderation("prompt rejected".to_string()));
        }

        let img_bytes = self.runtime.block_on(self.creator.generate(img_prompt))?;

        let verse = if let Some(critic) = self.critic.as_mut() {
            tracing::debug!("getting best verse");
            self.runtime.block_on(best_verse(
                &mut self.poet,
                critic,
                &self.config.poet.verse_base_prompt,
                prompt,
                self.config.poet.num_verses,
            ))?
        } else {
            tracing::debug!("getting one verse");
            self.runtime.block_on(one_verse(
                &mut self.poet,
                &self.config.poet.verse_base_prompt,
                prompt,
            ))?
        };

        let verse_lines: Vec<String> = verse.lines().map(|l| l.trim().to_string()).collect();
        tracing::info!(verse = %verse_lines.join("/"), "verse");

        let side = if rand::thread_rng().gen_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        };

        if daydream {
            // Only speak the prompt aloud for manually requested daydreams,
            // and never cache one-off prompt speech
            if manual {
                self.speak(prompt, false);
            }
        } else {
            self.speak(&random_line(&self.config.lines.finished_lines), true);
        }

        tracing::debug!("saving raw image");
        let output_dir = self.config.storage.output_dir.clone();
        std::fs::write(output_dir.join(format!("{base_name}-raw.png")), &img_bytes)?;

        let decoded = image::load_from_memory(&img_bytes)?.to_rgba8();
        let creation = Creation {
            image: decoded,
            verse_lines,
            prompt: prompt.to_string(),
            is_daydream: daydream,
        };

        let frame = self.canvas.render_creation(&creation, side);
        self.send_frame(frame.clone());

        tracing::debug!("saving creation");
        let png_name = format!("{base_name}.png");
        let png_path = output_dir.join(&png_name);
        frame
            .save(&png_path)
            .map_err(|e| Error::Canvas(format!("cannot save {}: {e}", png_path.display())))?;

        self.publish(base_name, prompt, daydream, &png_path)?;

        recents::push_capped(
            &mut self.recents,
            RecentCreation {
                base_name: base_name.to_string(),
                prompt: prompt.to_string(),
                daydream,
            },
            self.config.storage.max_recents,
        );
        recents::save(&self.config.storage.recents_file, &self.recents)?;
        self.recent_index = self.recents.len().saturating_sub(1);

        self.current = Some(Current {
            base_name: base_name.to_string(),
            prompt: prompt.to_string(),
            daydream,
            frame,
        });

        Ok(())
    }

    /// Write the share page and upload both artifacts
    ///
    /// Upload failures are logged, never fatal: the kiosk keeps its local
    /// copy and the show goes on.
    fn publish(
        &self,
        base_name: &str,
        prompt: &str,
        daydream: bool,
        png_path: &std::path::Path,
    ) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        tracing::debug!("uploading creation");
        let png_name = format!("{base_name}.png");
        let html_name = format!("{base_name}.html");

        let template = std::fs::read_to_string(&self.config.storage.html_template)?;
        let generated_by = if daydream { "Reverie Daydream" } else { "Visitor Request" };
        let html = render_share_page(
            &template,
            &storage.blob_url(&png_name),
            prompt,
            generated_by,
            &Local::now().to_rfc2822(),
        );
        std::fs::write(self.config.storage.output_dir.join(&html_name), &html)?;

        if let Err(e) = self
            .runtime
            .block_on(storage.upload(&html_name, html.into_bytes(), "text/html"))
        {
            tracing::error!(error = %e, "error uploading share page");
        }

        let png_bytes = std::fs::read(png_path)?;
        if let Err(e) = self
            .runtime
            .block_on(storage.upload(&png_name, png_bytes, "image/png"))
        {
            tracing::error!(error = %e, "error uploading creation image");
        }

        Ok(())
    }

    /// Overlay the prompt-reveal card over the current creation
    fn show_prompt_card(&self) {
        let Some(current) = &self.current else {
            return;
        };

        let source = if current.daydream {
            "Reverie Daydream"
        } else {
            "Visitor prompt"
        };
        let overlaid = self
            .canvas
            .render_prompt_card(&current.frame, &current.prompt, source);
        self.send_frame(overlaid);

        std::thread::sleep(Duration::from_secs(self.config.display.prompt_display_secs));
        let frame = current.frame.clone();
        self.send_frame(frame);
    }

    /// Overlay the QR share link over the current creation
    fn show_qr(&self) {
        let Some(current) = &self.current else {
            return;
        };
        let Some(storage) = &self.storage else {
            return;
        };

        let url = storage.blob_url(&format!("{}.html", current.base_name));
        let qr_img = match qr::encode(&url) {
            Ok(img) => img,
            Err(e) => {
                tracing::error!(error = %e, "QR encoding failed");
                return;
            }
        };

        let overlaid = self.canvas.render_overlay(&current.frame, &qr_img);
        self.send_frame(overlaid);

        std::thread::sleep(Duration::from_secs(self.config.display.qr_display_secs));
        let frame = current.frame.clone();
        self.send_frame(frame);
    }

    /// Step through the recents carousel and show the stored composition
    fn navigate_recents(&mut self, step: i64) {
        if self.recents.is_empty() {
            return;
        }

        let len = self.recents.len() as i64;
        self.recent_index =
            usize::try_from((self.recent_index as i64 + step).rem_euclid(len)).unwrap_or(0);

        let entry = self.recents[self.recent_index].clone();
        let path = self
            .config
            .storage
            .output_dir
            .join(format!("{}.png", entry.base_name));

        let frame = match image::open(&path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot load recent creation");
                return;
            }
        };

        self.previous_prompt = entry.prompt.clone();
        self.send_frame(frame.clone());
        self.current = Some(Current {
            base_name: entry.base_name,
            prompt: entry.prompt,
            daydream: entry.daydream,
            frame,
        });
    }

    /// Compose and send a status frame
    fn show_status(&self, text: &str) {
        self.send_frame(self.canvas.render_status(text));
    }

    /// Hand a frame to the window; a closed window just means shutdown
    fn send_frame(&self, frame: RgbaImage) {
        if self.frames.send(frame).is_err() {
            tracing::debug!("frame channel closed");
        }
    }

    /// Synthesize and play a phrase; speech failures never stop the kiosk
    fn speak(&self, text: &str, use_cache: bool) {
        let audio = match self.runtime.block_on(self.synthesizer.synthesize(text, use_cache)) {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(error = %e, "speech synthesis failed");
                return;
            }
        };

        if let Err(e) = self.playback.play_wav(&audio) {
            tracing::error!(error = %e, "speech playback failed");
        }
    }

    /// Speak a randomly chosen line from a set
    fn speak_random_line(&self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.speak(&random_line(lines), true);
    }
}

/// Pick a random line from a set; empty sets yield an empty string
fn random_line(lines: &[String]) -> String {
    lines
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default()
}

/// Random base file name of lowercase letters and digits
#[must_use]
pub fn random_base_name(length: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}
