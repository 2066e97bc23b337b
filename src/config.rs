use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

pub const CONFIG_ENV: &str = "SPRAYLOG_CONFIG";
pub const INPUT_DIR_ENV: &str = "SPRAYLOG_INPUT_DIR";
pub const NOZZLES_ENV: &str = "SPRAYLOG_NOZZLES";
pub const EXTRA_OFF_PROB_ENV: &str = "SPRAYLOG_EXTRA_OFF_PROB";
pub const SEED_ENV: &str = "SPRAYLOG_SEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory scanned for input logs.
    #[serde(default = "Config::default_input_dir")]
    pub input_dir: PathBuf,
    /// Length of a valid zone array.
    #[serde(default = "Config::default_nozzle_count")]
    pub nozzle_count: usize,
    /// Chance of switching off each active nozzle in the perturbed copy.
    #[serde(default = "Config::default_extra_off_prob")]
    pub extra_off_prob: f64,
    #[serde(default = "Config::default_seed")]
    pub seed: u64,
    #[serde(default = "Config::default_dedup_suffix")]
    pub dedup_suffix: String,
    #[serde(default = "Config::default_rand_suffix")]
    pub rand_suffix: String,
    #[serde(default = "Config::default_separator")]
    pub separator: char,
    /// File extensions picked up from `input_dir`, without the dot.
    #[serde(default = "Config::default_extensions")]
    pub extensions: Vec<String>,
    /// Ignore inputs whose stem already ends with an output suffix.
    #[serde(default = "Config::default_skip_derived")]
    pub skip_derived: bool,
    /// Optional run report (`.json` → JSON, otherwise YAML).
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl Config {
    fn default_input_dir() -> PathBuf {
        PathBuf::from(".")
    }
    fn default_nozzle_count() -> usize {
        6
    }
    fn default_extra_off_prob() -> f64 {
        0.25
    }
    fn default_seed() -> u64 {
        42
    }
    fn default_dedup_suffix() -> String {
        "_dedup".into()
    }
    fn default_rand_suffix() -> String {
        "_dedup_rand".into()
    }
    fn default_separator() -> char {
        ','
    }
    fn default_extensions() -> Vec<String> {
        vec!["txt".into(), "csv".into()]
    }
    fn default_skip_derived() -> bool {
        true
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: Self::default_input_dir(),
            nozzle_count: Self::default_nozzle_count(),
            extra_off_prob: Self::default_extra_off_prob(),
            seed: Self::default_seed(),
            dedup_suffix: Self::default_dedup_suffix(),
            rand_suffix: Self::default_rand_suffix(),
            separator: Self::default_separator(),
            extensions: Self::default_extensions(),
            skip_derived: Self::default_skip_derived(),
            report_path: None,
        }
    }
}

impl Config {
    /// Read a YAML config file; missing keys fall back to defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Defaults, then `$SPRAYLOG_CONFIG`, then the individual env vars,
    /// then `input_dir_arg` (first command-line argument) if given.
    pub fn load(input_dir_arg: Option<String>) -> Result<Self> {
        Self::load_with(|key| env::var(key).ok(), input_dir_arg)
    }

    /// `load`, reading the config path and overrides through `lookup`.
    pub fn load_with<F>(lookup: F, input_dir_arg: Option<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => {
                info!(path = %path, "loading config file");
                Self::from_yaml_file(&path)?
            }
            None => Self::default(),
        };
        cfg.apply_overrides(&lookup)?;
        if let Some(dir) = input_dir_arg {
            cfg.input_dir = PathBuf::from(dir);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply env-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(INPUT_DIR_ENV) {
            self.input_dir = PathBuf::from(dir);
        }
        if let Some(n) = lookup(NOZZLES_ENV) {
            self.nozzle_count = n
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer, got {:?}", NOZZLES_ENV, n))?;
        }
        if let Some(p) = lookup(EXTRA_OFF_PROB_ENV) {
            self.extra_off_prob = p
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number, got {:?}", EXTRA_OFF_PROB_ENV, p))?;
        }
        if let Some(s) = lookup(SEED_ENV) {
            self.seed = s
                .trim()
                .parse()
                .with_context(|| format!("{} must be an unsigned integer, got {:?}", SEED_ENV, s))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.nozzle_count == 0 {
            bail!("nozzle_count must be at least 1");
        }
        if !self.extra_off_prob.is_finite() || !(0.0..=1.0).contains(&self.extra_off_prob) {
            bail!(
                "extra_off_prob must be within [0, 1], got {}",
                self.extra_off_prob
            );
        }
        if self.separator == '[' || self.separator == ']' {
            bail!("separator cannot be a bracket");
        }
        if self.dedup_suffix.is_empty() || self.rand_suffix.is_empty() {
            bail!("output suffixes cannot be empty");
        }
        if self.dedup_suffix == self.rand_suffix {
            bail!("dedup_suffix and rand_suffix must differ");
        }
        if self.extensions.is_empty() {
            bail!("at least one input extension is required");
        }
        Ok(())
    }
}
