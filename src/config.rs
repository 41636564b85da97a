use crate::app_dirs::AppDirs;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_GOAL: u32 = 10;
pub const DEFAULT_CUE_TEXT: &str = "Jai Hanuman, your goal is reached";
pub const DEFAULT_CUE_REPEAT: u32 = 3;

/// What happens when the goal is reached.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GoalAction {
    Speech,
    Clip,
    Tone,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_goal: u32,
    pub calibration_offset_ms: u64,
    pub goal_action: GoalAction,
    pub cue_text: String,
    pub cue_repeat: u32,
    pub clip_path: Option<PathBuf>,
    pub speech_command: Option<String>,
    pub tone_hz: f32,
    pub tone_ms: u64,
    pub count_visitors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_goal: DEFAULT_GOAL,
            calibration_offset_ms: 0,
            goal_action: GoalAction::Speech,
            cue_text: DEFAULT_CUE_TEXT.to_string(),
            cue_repeat: DEFAULT_CUE_REPEAT,
            clip_path: None,
            speech_command: None,
            tone_hz: 660.0,
            tone_ms: 600,
            count_visitors: true,
        }
    }
}

impl Config {
    pub fn timer_settings(&self) -> crate::round_timer::TimerSettings {
        crate::round_timer::TimerSettings {
            default_goal: self.default_goal,
            calibration_offset: Duration::from_millis(self.calibration_offset_ms),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("roundcount.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults.
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring invalid config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
