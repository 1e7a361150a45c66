use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub build: BuildConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub challenges: ChallengeFileConfig,
    pub debugger: Option<DebuggerConfig>,
}

/// External build collaborator; success is a zero exit status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Plain invocation of the target program.
    pub direct: String,
    /// Invocation wrapped by the memory/behavior checker.
    pub checked: String,
    #[serde(default = "RunConfig::default_shell")]
    pub shell: PathBuf,
    pub time_limit_ms: Option<u64>,
}

impl RunConfig {
    fn default_shell() -> PathBuf {
        "/bin/sh".into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChallengeFileConfig {
    #[serde(default = "ChallengeFileConfig::default_file")]
    pub file: PathBuf,
    /// The fixed location the target program reads its source input from.
    #[serde(default = "ChallengeFileConfig::default_input_slot")]
    pub input_slot: PathBuf,
    /// Where the captured stdout of the last run is persisted.
    #[serde(default = "ChallengeFileConfig::default_capture_file")]
    pub capture_file: PathBuf,
}

impl ChallengeFileConfig {
    fn default_file() -> PathBuf {
        "challenges.toml".into()
    }
    fn default_input_slot() -> PathBuf {
        "challenge".into()
    }
    fn default_capture_file() -> PathBuf {
        "challengeresult".into()
    }
}

impl Default for ChallengeFileConfig {
    fn default() -> Self {
        Self {
            file: Self::default_file(),
            input_slot: Self::default_input_slot(),
            capture_file: Self::default_capture_file(),
        }
    }
}

/// External interactive debugger invoked after a failing run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DebuggerConfig {
    pub command: String,
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "chal.toml";
    pub const EXAMPLE_CHALLENGES_FILENAME: &str = "challenges.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).unwrap();
        std::str::from_utf8(file.data.as_ref()).unwrap().to_owned()
    }

    pub fn example_challenges_toml() -> String {
        let file = Asset::get(Self::EXAMPLE_CHALLENGES_FILENAME).unwrap();
        std::str::from_utf8(file.data.as_ref()).unwrap().to_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let cur_dir = cur_dir.as_ref();
        cur_dir
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
            .with_context(|| {
                format!(
                    "Not in a chal harness dir: Cannot find '{}'",
                    Self::FILENAME
                )
            })
    }

    pub fn from_file_finding_in_ancestors(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_filepath = Config::find_file_in_ancestors(cur_dir)?;
        Self::from_toml_file(config_filepath)
    }

    /// Relative paths in the config are resolved against the config file's dir.
    pub fn base_dir(&self) -> &Path {
        self.source_config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."))
    }

    pub fn challenges_file_path(&self) -> PathBuf {
        self.base_dir().join(&self.challenges.file)
    }

    pub fn input_slot_path(&self) -> PathBuf {
        self.base_dir().join(&self.challenges.input_slot)
    }

    pub fn capture_file_path(&self) -> PathBuf {
        self.base_dir().join(&self.challenges.capture_file)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.run.time_limit_ms.map(Duration::from_millis)
    }
}
