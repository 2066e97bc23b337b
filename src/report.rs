use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs, path::Path};

use crate::batch::{FileSummary, RunSummary};
use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub input_dir: &'a Path,
    pub seed: u64,
    pub nozzle_count: usize,
    pub extra_off_prob: f64,
    pub files: &'a [FileSummary],
    pub skipped: &'a [std::path::PathBuf],
}

impl<'a> RunReport<'a> {
    pub fn new(cfg: &'a Config, summary: &'a RunSummary) -> Self {
        Self {
            generated_at: Utc::now(),
            input_dir: &cfg.input_dir,
            seed: cfg.seed,
            nozzle_count: cfg.nozzle_count,
            extra_off_prob: cfg.extra_off_prob,
            files: &summary.files,
            skipped: &summary.skipped,
        }
    }

    /// JSON for a `.json` path, YAML otherwise.
    pub fn render_for(&self, path: &Path) -> Result<String> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            serde_json::to_string_pretty(self).context("serializing report as JSON")
        } else {
            serde_yaml::to_string(self).context("serializing report as YAML")
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.render_for(path)?;
        fs::write(path, text).with_context(|| format!("writing report {}", path.display()))
    }
}
