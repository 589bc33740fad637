//! Persona modes and their registry
//!
//! A mode selects the system prompt and sampling temperature used for a
//! chat turn. The set of modes is closed; the registry maps each one to an
//! optional prompt file and an optional temperature.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Temperature used when a mode does not define one
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// System prompt used when a mode has no prompt file or the file is unusable
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Azalea Experimental AI. \
Answer the user's requests directly, honestly and in detail, without lecturing. \
Keep every answer under 500 words. \
If anyone asks who you are, you are Azalea AI.";

/// A persona a user can switch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Therapist,
    Schizo,
    God,
    InnerVoice,
    MirrorSelf,
    Smart,
    Creative,
    Humor,
    Split,
    Persona,
    Apocalypse,
    Confession,
}

impl Mode {
    /// Every mode, in keyboard display order
    pub const ALL: [Mode; 12] = [
        Mode::Therapist,
        Mode::Schizo,
        Mode::God,
        Mode::InnerVoice,
        Mode::MirrorSelf,
        Mode::Smart,
        Mode::Creative,
        Mode::Humor,
        Mode::Split,
        Mode::Persona,
        Mode::Apocalypse,
        Mode::Confession,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Therapist => "Therapist",
            Mode::Schizo => "Schizo",
            Mode::God => "God",
            Mode::InnerVoice => "InnerVoice",
            Mode::MirrorSelf => "MirrorSelf",
            Mode::Smart => "Smart",
            Mode::Creative => "Creative",
            Mode::Humor => "Humor",
            Mode::Split => "Split",
            Mode::Persona => "Persona",
            Mode::Apocalypse => "Apocalypse",
            Mode::Confession => "Confession",
        }
    }

    /// Deserializes a stored mode without ever failing.
    ///
    /// Snapshots written by older versions of the bot may hold a list of
    /// mode names or a name that no longer exists; both load as the default.
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Mode, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StoredMode {
            Name(String),
            Legacy(Vec<String>),
            Other(serde_json::Value),
        }

        let mode = match StoredMode::deserialize(deserializer)? {
            StoredMode::Name(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(mode = %name, "Unknown stored mode, using default");
                Mode::default()
            }),
            StoredMode::Legacy(names) => {
                tracing::warn!(
                    candidates = names.len(),
                    "List-valued stored mode, using default"
                );
                Mode::default()
            }
            StoredMode::Other(value) => {
                tracing::warn!(value = %value, "Malformed stored mode, using default");
                Mode::default()
            }
        };
        Ok(mode)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMode(wanted.to_string()))
    }
}

/// Static configuration of a single mode
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSpec {
    /// File name under the prompts directory
    pub prompt_file: Option<String>,
    /// Sampling temperature; `DEFAULT_TEMPERATURE` when absent
    pub temperature: Option<f32>,
}

impl ModeSpec {
    fn new(prompt_file: Option<&str>, temperature: Option<f32>) -> Self {
        Self {
            prompt_file: prompt_file.map(str::to_string),
            temperature,
        }
    }

    /// Effective temperature, clamped to [0, 1]
    pub fn effective_temperature(&self) -> f32 {
        self.temperature
            .unwrap_or(DEFAULT_TEMPERATURE)
            .clamp(0.0, 1.0)
    }
}

/// Prompt and temperature to use for one generation
#[derive(Debug, Clone, PartialEq)]
pub struct ModeConfig {
    pub system_prompt: String,
    pub temperature: f32,
}

impl ModeConfig {
    fn fallback() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Immutable lookup table from mode to its configuration
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    specs: HashMap<Mode, ModeSpec>,
    prompts_dir: PathBuf,
}

impl ModeRegistry {
    /// Builds the registry with the built-in persona table
    pub fn builtin(prompts_dir: impl Into<PathBuf>) -> Self {
        let specs = Mode::ALL
            .into_iter()
            .map(|mode| (mode, builtin_spec(mode)))
            .collect();

        Self {
            specs,
            prompts_dir: prompts_dir.into(),
        }
    }

    /// Builds a registry from an explicit table; modes missing from it
    /// resolve to the fallback configuration
    pub fn from_specs(
        prompts_dir: impl Into<PathBuf>,
        specs: impl IntoIterator<Item = (Mode, ModeSpec)>,
    ) -> Self {
        Self {
            specs: specs.into_iter().collect(),
            prompts_dir: prompts_dir.into(),
        }
    }

    pub fn prompts_dir(&self) -> &Path {
        &self.prompts_dir
    }

    pub fn spec(&self, mode: Mode) -> Option<&ModeSpec> {
        self.specs.get(&mode)
    }

    /// Registered modes in display order
    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::ALL
            .into_iter()
            .filter(|mode| self.specs.contains_key(mode))
    }

    /// Every prompt file referenced by the registry
    pub fn prompt_files(&self) -> Vec<&str> {
        self.modes()
            .filter_map(|mode| self.specs[&mode].prompt_file.as_deref())
            .collect()
    }

    /// Resolves the prompt and temperature for `mode`.
    ///
    /// The prompt file is read on every call so edits take effect without a
    /// restart. Never fails: any problem falls back to the default prompt.
    pub async fn resolve(&self, mode: Mode) -> ModeConfig {
        let Some(spec) = self.specs.get(&mode) else {
            tracing::debug!(mode = %mode, "Mode not registered, using fallback configuration");
            return ModeConfig::fallback();
        };

        let system_prompt = match &spec.prompt_file {
            Some(file) => self.load_prompt(file).await,
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        ModeConfig {
            system_prompt,
            temperature: spec.effective_temperature(),
        }
    }

    /// Resolves a mode by name; unknown names get the fallback configuration
    pub async fn resolve_name(&self, name: &str) -> ModeConfig {
        match name.parse::<Mode>() {
            Ok(mode) => self.resolve(mode).await,
            Err(UnknownMode(name)) => {
                tracing::debug!(mode = %name, "Unknown mode, using fallback configuration");
                ModeConfig::fallback()
            }
        }
    }

    async fn load_prompt(&self, file: &str) -> String {
        let path = self.prompts_dir.join(file);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => {
                tracing::warn!(path = %path.display(), "Prompt file is empty, using default prompt");
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Prompt file not found, using default prompt");
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read prompt file, using default prompt");
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        }
    }
}

fn builtin_spec(mode: Mode) -> ModeSpec {
    match mode {
        Mode::Therapist => ModeSpec::new(Some("therapist.txt"), Some(0.7)),
        Mode::Schizo => ModeSpec::new(Some("schizo.txt"), Some(0.9)),
        Mode::God => ModeSpec::new(Some("god.txt"), Some(0.8)),
        Mode::InnerVoice => ModeSpec::new(Some("inner_voice.txt"), Some(0.6)),
        Mode::MirrorSelf => ModeSpec::new(Some("mirror_self.txt"), Some(0.6)),
        Mode::Smart => ModeSpec::new(Some("smart.txt"), None),
        Mode::Creative => ModeSpec::new(None, Some(0.8)),
        Mode::Humor => ModeSpec::new(None, Some(0.5)),
        Mode::Split => ModeSpec::new(Some("split_personality.txt"), Some(0.85)),
        Mode::Persona => ModeSpec::new(Some("persona_mask.txt"), Some(0.75)),
        Mode::Apocalypse => ModeSpec::new(Some("apocalypse.txt"), Some(0.8)),
        Mode::Confession => ModeSpec::new(Some("confession_mode.txt"), Some(0.0)),
    }
}
