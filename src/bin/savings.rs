// src/bin/savings.rs
//
// Print the savings rate of existing log files without rewriting them.
// Usage: savings [FILE...]   (no files → every input in the configured dir)

use anyhow::Result;
use spraylog::{batch::measure_inputs, config::Config};
use std::{env, path::PathBuf};

fn main() -> Result<()> {
    let cfg = Config::load(None)?;

    let args: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    let measured = measure_inputs(args, &cfg)?;
    if measured.is_empty() {
        return Err(anyhow::anyhow!(
            "No input files found under '{}'",
            cfg.input_dir.display()
        ));
    }

    println!(
        "{: <40} {:>10} {:>10} {:>10} {:>10}",
        "File", "Records", "Active", "Max", "Savings"
    );
    println!("{:-<84}", "");
    for (path, s) in &measured {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{: <40} {:>10} {:>10} {:>10} {:>9.2}%",
            name,
            s.records,
            s.active,
            s.max_active,
            s.rate * 100.0
        );
    }
    Ok(())
}
