// src/batch.rs
use anyhow::{Context, Result};
use glob::{glob, Pattern};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::process::{
    dedup::dedup_by_coordinates, extra_off::apply_extra_off, savings::Savings, RawTable,
};

/// Outcome for one input log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub input: PathBuf,
    pub dedup_output: PathBuf,
    pub rand_output: PathBuf,
    /// Non-blank body lines read.
    pub rows_read: usize,
    /// Body lines left after deduplication.
    pub rows_kept: usize,
    pub before: Savings,
    pub after: Savings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileSummary>,
    /// Inputs that produced no usable data or failed on I/O.
    pub skipped: Vec<PathBuf>,
}

/// Decode UTF-8, dropping any byte sequence that is not valid.
pub fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix is UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(n) => rest = &after[n..],
                    // truncated sequence at the end
                    None => return out,
                }
            }
        }
    }
}

/// `<stem><suffix><.ext>` next to `path`.
pub fn derived_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}

fn is_derived(path: &Path, cfg: &Config) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| stem.ends_with(&cfg.dedup_suffix) || stem.ends_with(&cfg.rand_suffix))
        .unwrap_or(false)
}

/// Matching files directly inside `cfg.input_dir`, sorted by path.
pub fn discover_inputs(cfg: &Config) -> Result<Vec<PathBuf>> {
    let dir = Pattern::escape(&cfg.input_dir.to_string_lossy());
    let mut paths = Vec::new();
    for ext in &cfg.extensions {
        let pattern = format!("{}/*.{}", dir, ext.trim_start_matches('.'));
        let entries =
            glob(&pattern).with_context(|| format!("Failed to read glob pattern '{}'", pattern))?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!("unreadable entry while scanning: {}", e),
            }
        }
    }
    paths.sort();
    paths.dedup();
    if cfg.skip_derived {
        paths.retain(|p| {
            let derived = is_derived(p, cfg);
            if derived {
                info!("skipping {} (name ends with an output suffix)", p.display());
            }
            !derived
        });
    }
    Ok(paths)
}

/// Deduplicate, measure, perturb and measure again one log file.
///
/// Returns `Ok(None)` when the file has no usable data; nothing is written
/// in that case.
#[instrument(level = "info", skip(path, cfg, rng), fields(file = %path.display()))]
pub fn process_file<R: Rng>(path: &Path, cfg: &Config, rng: &mut R) -> Result<Option<FileSummary>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = decode_dropping_invalid(&bytes);

    let Some(table) = RawTable::from_text(&text, cfg.separator) else {
        warn!("no usable data: file is empty");
        return Ok(None);
    };
    debug!(
        lines = table.line_count(),
        columns = table.header.columns.len(),
        resolved = ?table.columns,
        "parsed"
    );
    let Some(deduped) = dedup_by_coordinates(&table) else {
        warn!(
            columns = ?table.header.columns,
            "no usable data: latitude/longitude columns not found"
        );
        return Ok(None);
    };

    let dedup_output = derived_path(path, &cfg.dedup_suffix);
    fs::write(&dedup_output, deduped.to_text())
        .with_context(|| format!("writing {}", dedup_output.display()))?;

    let before = Savings::compute(&deduped, cfg.nozzle_count);

    let perturbed = apply_extra_off(&deduped, cfg.nozzle_count, cfg.extra_off_prob, rng);
    let rand_output = derived_path(path, &cfg.rand_suffix);
    fs::write(&rand_output, perturbed.to_text())
        .with_context(|| format!("writing {}", rand_output.display()))?;

    let after = Savings::compute(&perturbed, cfg.nozzle_count);

    if deduped.columns.zones.is_none() {
        warn!("no zones / control signal column; savings reported as zero");
    }
    info!(
        rows_read = table.rows.len(),
        rows_kept = deduped.rows.len(),
        before = before.rate,
        after = after.rate,
        "processed"
    );

    Ok(Some(FileSummary {
        input: path.to_path_buf(),
        dedup_output,
        rand_output,
        rows_read: table.rows.len(),
        rows_kept: deduped.rows.len(),
        before,
        after,
    }))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable block for one file.
pub fn format_summary(summary: &FileSummary, cfg: &Config) -> String {
    let pass = |label: String, s: &Savings| {
        format!(
            "   → {}: records {}, active nozzles {} / max {}, savings = {:.2}%",
            label,
            s.records,
            s.active,
            s.max_active,
            s.rate * 100.0
        )
    };
    [
        file_name(&summary.input),
        pass("dedup".to_string(), &summary.before),
        pass(
            format!("extra-off ({:.0}%)", cfg.extra_off_prob * 100.0),
            &summary.after,
        ),
        format!(
            "   → output: {}, {}",
            file_name(&summary.dedup_output),
            file_name(&summary.rand_output)
        ),
    ]
    .join("\n")
}

/// Savings of one file as it is on disk, without deduplicating it.
pub fn measure_file(path: &Path, cfg: &Config) -> Result<Savings> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let text = decode_dropping_invalid(&bytes);
    Ok(RawTable::from_text(&text, cfg.separator)
        .map(|t| Savings::compute(&t, cfg.nozzle_count))
        .unwrap_or_default())
}

/// Measure `paths`, or every matching file in `cfg.input_dir` (outputs
/// included) when `paths` is empty.
pub fn measure_inputs(paths: Vec<PathBuf>, cfg: &Config) -> Result<Vec<(PathBuf, Savings)>> {
    let paths = if paths.is_empty() {
        let cfg = Config {
            skip_derived: false,
            ..cfg.clone()
        };
        discover_inputs(&cfg)?
    } else {
        paths
    };
    paths
        .into_iter()
        .map(|p| {
            let s = measure_file(&p, cfg)?;
            Ok((p, s))
        })
        .collect()
}

/// Process `paths` in order, threading one generator through all of them.
pub fn run_with_rng<R: Rng>(paths: &[PathBuf], cfg: &Config, rng: &mut R) -> RunSummary {
    let mut summary = RunSummary::default();
    for path in paths {
        match process_file(path, cfg, rng) {
            Ok(Some(file)) => {
                println!("{}", format_summary(&file, cfg));
                summary.files.push(file);
            }
            Ok(None) => {
                error!("dedup failed or no usable data: {}", file_name(path));
                summary.skipped.push(path.clone());
            }
            Err(e) => {
                error!("{} failed: {:#}", path.display(), e);
                summary.skipped.push(path.clone());
            }
        }
    }
    summary
}

/// Discover inputs and process them with a generator seeded from `cfg.seed`.
pub fn run(cfg: &Config) -> Result<RunSummary> {
    let start = Instant::now();
    let paths = discover_inputs(cfg)?;
    if paths.is_empty() {
        error!(
            "no .{} files found in {}",
            cfg.extensions.join("/."),
            cfg.input_dir.display()
        );
        return Ok(RunSummary::default());
    }
    info!("{} input files", paths.len());

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let summary = run_with_rng(&paths, cfg, &mut rng);
    info!(
        processed = summary.files.len(),
        skipped = summary.skipped.len(),
        elapsed = ?start.elapsed(),
        "run complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_decode_drops_invalid_bytes() {
        assert_eq!(decode_dropping_invalid(b"abc"), "abc");
        assert_eq!(decode_dropping_invalid(b"a\xffb\xfe\xfdc"), "abc");
        assert_eq!(decode_dropping_invalid("é,[1]".as_bytes()), "é,[1]");
        // truncated multi-byte sequence at the end
        assert_eq!(decode_dropping_invalid(b"ab\xe2\x82"), "ab");
    }

    #[test]
    fn test_derived_path() {
        let p = Path::new("/logs/run1.txt");
        assert_eq!(derived_path(p, "_dedup"), PathBuf::from("/logs/run1_dedup.txt"));
        assert_eq!(
            derived_path(Path::new("a.b.csv"), "_dedup_rand"),
            PathBuf::from("a.b_dedup_rand.csv")
        );
        assert_eq!(derived_path(Path::new("plain"), "_x"), PathBuf::from("plain_x"));
    }

    #[test]
    fn test_discover_sorted_and_skips_derived() -> Result<()> {
        let dir = tempdir()?;
        for name in [
            "b.csv",
            "a.txt",
            "a_dedup.txt",
            "a_dedup_rand.txt",
            "field_dedup.csv",
            "notes.md",
        ] {
            fs::write(dir.path().join(name), "x\n")?;
        }
        fs::create_dir(dir.path().join("sub.txt"))?;

        let cfg = Config {
            input_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let found = discover_inputs(&cfg)?;
        assert_eq!(found, vec![dir.path().join("a.txt"), dir.path().join("b.csv")]);

        let cfg = Config {
            skip_derived: false,
            ..cfg
        };
        let all = discover_inputs(&cfg)?;
        assert_eq!(all.len(), 5);
        assert!(all.contains(&dir.path().join("field_dedup.csv")));
        Ok(())
    }

    #[test]
    fn test_process_file_writes_outputs() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("run.txt");
        fs::write(
            &input,
            "Latitude,Longitude,Zones\n40.1N,70.2E,[1,1,0,1,0,1]\n\n40.1N,70.2E,[0,0,0,0,0,0]\n40.2N,70.3E,[1,0,1,0,1,0]\n",
        )?;
        let cfg = Config {
            input_dir: dir.path().to_path_buf(),
            extra_off_prob: 0.0,
            ..Config::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let summary = process_file(&input, &cfg, &mut rng)?.expect("usable data");

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.rows_kept, 2);
        assert_eq!(summary.before.records, 2);
        assert_eq!(summary.before.active, 7);
        assert_eq!(summary.after, summary.before);

        let dedup = fs::read_to_string(dir.path().join("run_dedup.txt"))?;
        assert_eq!(
            dedup,
            "Latitude,Longitude,Zones\n40.1N,70.2E,[1,1,0,1,0,1]\n40.2N,70.3E,[1,0,1,0,1,0]\n"
        );
        let rand = fs::read_to_string(dir.path().join("run_dedup_rand.txt"))?;
        assert_eq!(
            rand,
            "Latitude,Longitude,Zones\n40.1N,70.2E,[1, 1, 0, 1, 0, 1]\n40.2N,70.3E,[1, 0, 1, 0, 1, 0]\n"
        );

        let text = format_summary(&summary, &cfg);
        assert!(text.starts_with("run.txt\n"));
        assert!(text.contains("savings = 41.67%"));
        assert!(text.contains("run_dedup_rand.txt"));
        Ok(())
    }

    #[test]
    fn test_process_file_without_coordinates() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("bad.csv");
        fs::write(&input, "Time,Zones\n1,[1,1,1,1,1,1]\n")?;
        let cfg = Config::default();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);

        assert!(process_file(&input, &cfg, &mut rng)?.is_none());
        assert!(!dir.path().join("bad_dedup.csv").exists());
        Ok(())
    }

    #[test]
    fn test_measure_uses_configured_width() -> Result<()> {
        let dir = tempdir()?;
        let cfg_path = dir.path().join("spraylog.yaml");
        fs::write(&cfg_path, format!("input_dir: {:?}\nnozzle_count: 8\nseparator: ';'\n", dir.path()))?;
        fs::write(
            dir.path().join("a.txt"),
            "Latitude;Longitude;Zones\n1;2;[1,0,0,0,0,0,0,1]\n1;3;[0,0,0,1,0,0,0,0]\n",
        )?;
        let cfg = Config::from_yaml_file(&cfg_path)?;

        let measured = measure_inputs(vec![], &cfg)?;
        assert_eq!(measured.len(), 1);
        let (path, s) = &measured[0];
        assert_eq!(path, &dir.path().join("a.txt"));
        assert_eq!(s.records, 2);
        assert_eq!(s.active, 3);
        assert_eq!(s.max_active, 16);
        assert!((s.rate - 0.8125).abs() < 1e-12);

        // the default 6-wide config rejects every row
        let narrow = measure_file(path, &Config::default())?;
        assert_eq!(narrow, Savings::default());
        Ok(())
    }

    #[test]
    fn test_measure_includes_outputs() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.txt"), "Zones\n[1,1,1,0,0,0]\n")?;
        fs::write(dir.path().join("a_dedup_rand.txt"), "Zones\n[0,0,0,0,0,0]\n")?;
        let cfg = Config {
            input_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let measured = measure_inputs(vec![], &cfg)?;
        let rates: Vec<f64> = measured.iter().map(|(_, s)| s.rate).collect();
        assert_eq!(rates, vec![0.5, 1.0]);

        let picked = measure_inputs(vec![dir.path().join("a.txt")], &cfg)?;
        assert_eq!(picked.len(), 1);
        assert!(measure_inputs(vec![dir.path().join("missing.txt")], &cfg).is_err());
        Ok(())
    }

    #[test]
    fn test_run_on_empty_dir() -> Result<()> {
        let dir = tempdir()?;
        let cfg = Config {
            input_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        assert_eq!(run(&cfg)?, RunSummary::default());
        Ok(())
    }
}
