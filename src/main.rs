use anyhow::Result;
use spraylog::{batch, config::Config, report::RunReport};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,spraylog=info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = Config::load(env::args().nth(1))?;
    info!(
        dir = %cfg.input_dir.display(),
        nozzles = cfg.nozzle_count,
        extra_off_prob = cfg.extra_off_prob,
        seed = cfg.seed,
        "startup"
    );

    // ─── 3) process every log in the directory ───────────────────────
    let summary = batch::run(&cfg)?;

    // ─── 4) optional report ──────────────────────────────────────────
    if let Some(path) = &cfg.report_path {
        match RunReport::new(&cfg, &summary).write(path) {
            Ok(()) => info!("wrote report {}", path.display()),
            Err(e) => warn!("report not written: {:#}", e),
        }
    }

    info!("all done");
    Ok(())
}
