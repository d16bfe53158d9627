//! Shade Configuration
//!
//! Shared configuration crate for the prover binaries and the ledger.
//!
//! Handles loading configuration from:
//! 1. SHADE_CONFIG env var (explicit path)
//! 2. ./shade.toml (current directory)
//! 3. ~/.shade/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::{env, fs};

/// Process-wide config, set once on first use.
pub static GLOBAL_CONFIG: OnceLock<ShadeConfig> = OnceLock::new();

const LOCAL_CONFIG_FILE: &str = "shade.toml";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".shade";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_PARAMS_DIR: &str = "./params";
const DEFAULT_PROVING_KEY: &str = "sprout-groth16.pk";
const DEFAULT_VERIFYING_KEY: &str = "sprout-groth16.vk";
const DEFAULT_LEDGER_PATH: &str = "./shade-ledger";
const DEFAULT_ANCHOR_HISTORY: usize = 1000;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadeConfig {
    #[serde(default)]
    pub params: ParamsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Proof backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProverMode {
    /// Hash-based stand-in that still checks the constraint system
    #[default]
    Mock,
    Groth16,
}

impl FromStr for ProverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(ProverMode::Mock),
            "groth16" => Ok(ProverMode::Groth16),
            other => Err(format!("unknown prover mode '{}'", other)),
        }
    }
}

/// Proving parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsConfig {
    #[serde(default)]
    pub prover_mode: ProverMode,
    /// Directory key file names are resolved against
    #[serde(default = "default_params_dir")]
    pub dir: String,
    #[serde(default = "default_proving_key")]
    pub proving_key: String,
    #[serde(default = "default_verifying_key")]
    pub verifying_key: String,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            prover_mode: ProverMode::Mock,
            dir: DEFAULT_PARAMS_DIR.into(),
            proving_key: DEFAULT_PROVING_KEY.into(),
            verifying_key: DEFAULT_VERIFYING_KEY.into(),
        }
    }
}

impl ParamsConfig {
    /// Proving key location (absolute names bypass `dir`)
    pub fn proving_key_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.proving_key)
    }

    /// Verifying key location (absolute names bypass `dir`)
    pub fn verifying_key_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.verifying_key)
    }
}

fn default_params_dir() -> String {
    DEFAULT_PARAMS_DIR.into()
}
fn default_proving_key() -> String {
    DEFAULT_PROVING_KEY.into()
}
fn default_verifying_key() -> String {
    DEFAULT_VERIFYING_KEY.into()
}

/// Ledger storage backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Memory,
    Rocksdb,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(LedgerBackend::Memory),
            "rocksdb" => Ok(LedgerBackend::Rocksdb),
            other => Err(format!("unknown ledger backend '{}'", other)),
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
    #[serde(default = "default_ledger_path")]
    pub path: String,
    /// Number of recent anchors whose tree snapshots stay resolvable
    #[serde(default = "default_anchor_history")]
    pub anchor_history: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            path: DEFAULT_LEDGER_PATH.into(),
            anchor_history: DEFAULT_ANCHOR_HISTORY,
        }
    }
}

fn default_ledger_path() -> String {
    DEFAULT_LEDGER_PATH.into()
}
fn default_anchor_history() -> usize {
    DEFAULT_ANCHOR_HISTORY
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from an override if present
fn env_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut String) {
    if let Some(v) = lookup(key) {
        *field = v;
    }
}

/// Set field from an override if present and parseable. Unparseable values
/// are logged and the current value is kept.
fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(v) = lookup(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(e) => log::warn!("Ignoring {}={}: {}", key, v, e),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl ShadeConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check SHADE_CONFIG env var
        if let Ok(path) = env::var("SHADE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./shade.toml (current directory)
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.shade/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        env_parse(&lookup, "SHADE_PROVER_MODE", &mut self.params.prover_mode);
        env_string(&lookup, "SHADE_PARAMS_DIR", &mut self.params.dir);
        env_string(&lookup, "SHADE_PROVING_KEY", &mut self.params.proving_key);
        env_string(
            &lookup,
            "SHADE_VERIFYING_KEY",
            &mut self.params.verifying_key,
        );

        env_parse(&lookup, "SHADE_LEDGER_BACKEND", &mut self.ledger.backend);
        env_string(&lookup, "SHADE_LEDGER_PATH", &mut self.ledger.path);
        env_parse(
            &lookup,
            "SHADE_ANCHOR_HISTORY",
            &mut self.ledger.anchor_history,
        );
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.params.prover_mode = ProverMode::Groth16;
        sample.ledger.backend = LedgerBackend::Rocksdb;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// The process-wide config, loaded on first call. Falls back to defaults
    /// if loading fails.
    pub fn global() -> &'static ShadeConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Install `config` as the global instance. Returns it back if one is
    /// already set.
    pub fn set_global(config: ShadeConfig) -> Result<(), ShadeConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
