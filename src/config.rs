//! Configuration management for the reverie kiosk
//!
//! Tunables live in a TOML file; API credentials come from the environment
//! only, so a config file can be committed without leaking keys.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Full kiosk configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Capture and silence-gate tuning
    pub audio: AudioConfig,

    /// Spoken-voice (TTS) settings
    pub voice: VoiceConfig,

    /// Image generation settings
    pub image: ImageConfig,

    /// Poet / critic / daydream-artist characters
    pub poet: PoetConfig,

    /// Autonomous daydream scheduling
    pub daydream: DaydreamConfig,

    /// Kiosk display and composition settings
    pub display: DisplayConfig,

    /// Artifact output and blob storage settings
    pub storage: StorageConfig,

    /// Phrases spoken aloud at each stage
    pub lines: SpeechLines,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            voice: VoiceConfig::default(),
            image: ImageConfig::default(),
            poet: PoetConfig::default(),
            daydream: DaydreamConfig::default(),
            display: DisplayConfig::default(),
            storage: StorageConfig::default(),
            lines: SpeechLines::default(),
        }
    }
}

/// Capture and silence-gate configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input sample rate in Hz
    pub sample_rate: u32,

    /// Samples per device-read chunk
    pub chunk_size: usize,

    /// Peak-amplitude cutoff below which a chunk is classified silent
    pub silence_threshold: u16,

    /// Minimum chunks for a session to count as real speech
    pub min_frames: usize,

    /// Consecutive silent chunks that end a recording
    pub max_silent_frames: usize,

    /// Recording duration cap in seconds
    pub max_recording_secs: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_size: 1024,
            silence_threshold: 2000,
            min_frames: 18,
            max_silent_frames: 10,
            max_recording_secs: 10.0,
        }
    }
}

/// Spoken-voice settings for the Azure TTS service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// BCP-47 language tag, e.g. "en-US"
    pub language: String,

    /// Voice gender (part of the synthesis cache key)
    pub gender: String,

    /// Azure neural voice name
    pub voice: String,

    /// Optional mstts express-as style
    pub style: Option<String>,

    /// Optional prosody pitch, e.g. "+5%"
    pub pitch: Option<String>,

    /// Optional prosody rate, e.g. "-10%"
    pub rate: Option<String>,

    /// Directory for cached synthesized phrases
    pub cache_dir: PathBuf,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            gender: "Female".to_string(),
            voice: "en-US-JennyNeural".to_string(),
            style: None,
            pitch: None,
            rate: None,
            cache_dir: PathBuf::from("speech-cache"),
        }
    }
}

/// Which image model to use and its knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// One of "dalle2", "dalle3", "sdxl", "stable-image"
    pub model: String,

    /// Generated image width in pixels
    pub width: u32,

    /// Generated image height in pixels
    pub height: u32,

    /// Diffusion steps (SDXL only)
    pub steps: u32,

    /// Classifier-free guidance scale (SDXL only)
    pub cfg_scale: f32,

    /// DALL-E 3 quality: "standard" or "hd"
    pub quality: String,

    /// Stable Image endpoint model: "core", "ultra", or "sd3"
    pub stable_image_model: String,

    /// SD3 sub-model when `stable_image_model` is "sd3"
    pub sd3_model: Option<String>,

    /// Optional style preset for the "core" endpoint
    pub core_preset: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "dalle3".to_string(),
            width: 1024,
            height: 1024,
            steps: 30,
            cfg_scale: 7.0,
            quality: "standard".to_string(),
            stable_image_model: "core".to_string(),
            sd3_model: None,
            core_preset: None,
        }
    }
}

/// The three chat characters and their prompt scaffolding
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoetConfig {
    /// System prompt for the poet character
    pub poet_system_prompt: String,

    /// Chat model for the poet
    pub poet_model: String,

    /// System prompt for the critic character
    pub critic_system_prompt: String,

    /// Chat model for the critic
    pub critic_model: String,

    /// System prompt for the autonomous daydream artist
    pub artist_system_prompt: String,

    /// Chat model for the daydream artist
    pub artist_model: String,

    /// Prefix prepended to the user prompt when requesting a verse
    pub verse_base_prompt: String,

    /// Prefix prepended when asking the artist to daydream
    pub artist_base_prompt: String,

    /// How many candidate verses to collect for the critic
    pub num_verses: usize,

    /// Whether to run the critic at all (saves tokens when off)
    pub use_critic: bool,

    /// Style prefixes, one chosen at random per image prompt
    pub image_base_prompts: Vec<String>,
}

impl Default for PoetConfig {
    fn default() -> Self {
        Self {
            poet_system_prompt: "You are a poet. Respond to every message with a \
                 single short verse of poetry, four to six lines, and nothing else."
                .to_string(),
            poet_model: "gpt-4o-mini".to_string(),
            critic_system_prompt: "You are a poetry critic. You will receive a theme \
                 and several numbered poems. Reply with only the number of the best poem."
                .to_string(),
            critic_model: "gpt-4o-mini".to_string(),
            artist_system_prompt: "You are an artist dreaming up scenes to paint. \
                 Respond with a single vivid sentence describing a scene, and nothing else."
                .to_string(),
            artist_model: "gpt-4o-mini".to_string(),
            verse_base_prompt: "Write a verse about:".to_string(),
            artist_base_prompt: "Describe a scene inspired by:".to_string(),
            num_verses: 3,
            use_critic: true,
            image_base_prompts: vec![
                "A dreamlike painting of ".to_string(),
                "An impressionist rendering of ".to_string(),
                "A richly detailed illustration of ".to_string(),
            ],
        }
    }
}

/// When and how often the kiosk daydreams on its own
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaydreamConfig {
    /// Minimum idle minutes before an automatic daydream
    pub min_minutes: u64,

    /// Maximum idle minutes before an automatic daydream
    pub max_minutes: u64,

    /// Hour of day (local) automatic daydreams may start
    pub start_hour: u32,

    /// Hour of day (local) automatic daydreams stop
    pub end_hour: u32,

    /// ISO weekdays (1 = Monday .. 7 = Sunday) daydreams are allowed
    pub iso_weekdays: Vec<u32>,

    /// Manual daydream requests allowed per window
    pub manual_limit: usize,

    /// Manual daydream rate-limit window in minutes
    pub manual_window_minutes: u64,
}

impl Default for DaydreamConfig {
    fn default() -> Self {
        Self {
            min_minutes: 20,
            max_minutes: 45,
            start_hour: 9,
            end_hour: 17,
            iso_weekdays: vec![1, 2, 3, 4, 5],
            manual_limit: 3,
            manual_window_minutes: 60,
        }
    }
}

/// Display geometry, fonts, and overlay timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Kiosk frame width in pixels
    pub width: u32,

    /// Kiosk frame height in pixels
    pub height: u32,

    /// Horizontal margin around the composed image
    pub horiz_margin: u32,

    /// Vertical margin around the composed image
    pub vert_margin: u32,

    /// Path to the TTF used for verses
    pub verse_font: PathBuf,

    /// Largest verse font size tried before shrinking to fit
    pub verse_font_max_size: u32,

    /// Pixels between verse lines
    pub verse_line_spacing: u32,

    /// Path to the TTF used for status and prompt text
    pub status_font: PathBuf,

    /// Status screen title size
    pub status_heading1_size: u32,

    /// Status screen subtitle size
    pub status_heading2_size: u32,

    /// Status message size
    pub status_size: u32,

    /// Prompt-reveal card font size
    pub prompt_font_size: u32,

    /// Seconds the prompt-reveal card stays up
    pub prompt_display_secs: u64,

    /// Seconds the QR overlay stays up
    pub qr_display_secs: u64,

    /// Status screen title
    pub title: String,

    /// Status screen subtitle
    pub subtitle: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            horiz_margin: 64,
            vert_margin: 28,
            verse_font: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf"),
            verse_font_max_size: 72,
            verse_line_spacing: 12,
            status_font: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            status_heading1_size: 96,
            status_heading2_size: 36,
            status_size: 64,
            prompt_font_size: 28,
            prompt_display_secs: 8,
            qr_display_secs: 10,
            title: "R E V E R I E".to_string(),
            subtitle: "a listening machine that paints and rhymes".to_string(),
        }
    }
}

/// Where artifacts land locally and in blob storage
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Azure storage account name
    pub account: String,

    /// Blob container name
    pub container: String,

    /// Local directory for saved creations
    pub output_dir: PathBuf,

    /// Path of the recent-creations JSON file
    pub recents_file: PathBuf,

    /// How many recent creations to keep
    pub max_recents: usize,

    /// HTML share-page template with ***PLACEHOLDER*** markers
    pub html_template: PathBuf,

    /// Length of randomly generated base file names
    pub file_name_length: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            container: "creations".to_string(),
            output_dir: PathBuf::from("output"),
            recents_file: PathBuf::from("recents.json"),
            max_recents: 25,
            html_template: PathBuf::from("assets/share.html"),
            file_name_length: 12,
        }
    }
}

/// Everything the kiosk says out loud, by stage
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechLines {
    /// Interjections prepended to a greeting
    pub welcome_words: Vec<String>,

    /// Greeting lines inviting the visitor to speak
    pub welcome_lines: Vec<String>,

    /// Lines spoken while generation is underway
    pub working_lines: Vec<String>,

    /// Lines spoken when a creation is revealed
    pub finished_lines: Vec<String>,

    /// Lines spoken when moderation or generation fails
    pub failed_lines: Vec<String>,

    /// Lines spoken when a manual daydream starts
    pub daydream_lines: Vec<String>,

    /// Lines spoken when a manual daydream is rate-limited
    pub daydream_refusal_lines: Vec<String>,
}

impl Default for SpeechLines {
    fn default() -> Self {
        Self {
            welcome_words: vec!["Hello!".to_string(), "Welcome!".to_string()],
            welcome_lines: vec![
                "Tell me what you would like me to paint.".to_string(),
                "Describe a scene and I will paint it for you.".to_string(),
            ],
            working_lines: vec![
                "Let me think about that.".to_string(),
                "Give me a moment at the easel.".to_string(),
            ],
            finished_lines: vec![
                "Here is what I made for you.".to_string(),
                "I hope you like it.".to_string(),
            ],
            failed_lines: vec![
                "I'm sorry, I couldn't paint that one.".to_string(),
                "That one didn't come out. Try another idea.".to_string(),
            ],
            daydream_lines: vec!["Let me dream for a while.".to_string()],
            daydream_refusal_lines: vec![
                "I've been dreaming too much. Ask me again later.".to_string(),
            ],
        }
    }
}

/// API credentials, loaded from the environment only
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, chat, moderation, DALL-E)
    pub openai: Option<String>,

    /// Stability AI API key (SDXL / Stable Image)
    pub stability: Option<String>,

    /// Azure Speech subscription key
    pub azure_speech_key: Option<String>,

    /// Azure Speech region, e.g. "eastus"
    pub azure_speech_region: Option<String>,

    /// SAS token granting write access to the blob container
    pub azure_storage_sas: Option<String>,
}

impl ApiKeys {
    /// Load credentials from the environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            openai: std::env::var("OPENAI_API_KEY").ok(),
            stability: std::env::var("SAI_API_KEY").ok(),
            azure_speech_key: std::env::var("AZURE_SPEECH_KEY").ok(),
            azure_speech_region: std::env::var("AZURE_SPEECH_REGION").ok(),
            azure_storage_sas: std::env::var("AZURE_STORAGE_SAS").ok(),
        }
    }

    /// The OpenAI key, or a config error naming the variable
    ///
    /// # Errors
    ///
    /// Returns error if `OPENAI_API_KEY` is unset
    pub fn require_openai(&self) -> Result<&str> {
        self.openai
            .as_deref()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/reverie/reverie.toml`,
/// falling back to `./reverie.toml`
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "reverie", "reverie").map_or_else(
        || PathBuf::from("reverie.toml"),
        |d| d.config_dir().join("reverie.toml"),
    )
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the built-in defaults; a present but malformed
    /// file is an error.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed, or if
    /// the parsed values fail validation
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the type system can't express
    fn validate(&self) -> Result<()> {
        if self.audio.chunk_size == 0 {
            return Err(Error::Config("audio.chunk_size must be positive".to_string()));
        }
        if self.audio.max_recording_secs <= 0.0 {
            return Err(Error::Config(
                "audio.max_recording_secs must be positive".to_string(),
            ));
        }
        match self.image.model.as_str() {
            "dalle2" | "dalle3" | "sdxl" | "stable-image" => {}
            other => {
                return Err(Error::Config(format!("unknown image model \"{other}\"")));
            }
        }
        if self.daydream.min_minutes > self.daydream.max_minutes {
            return Err(Error::Config(
                "daydream.min_minutes exceeds daydream.max_minutes".to_string(),
            ));
        }
        if self.poet.num_verses == 0 {
            return Err(Error::Config("poet.num_verses must be at least 1".to_string()));
        }
        Ok(())
    }
}
