mod args;

use std::time::Duration;

use anyhow::Context;
use common::utils::fetch::HttpFileCache;
use msmarco_scenario::{
    output::{write_instances, RunManifest},
    PassageScenario,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DATA_SUBDIR: &str = "msmarco";

fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let parsed = args::parse()?;

    if parsed.dry_run {
        let resolved = serde_json::to_string_pretty(&parsed.scenario)
            .context("serialising resolved configuration")?;
        println!("{resolved}");
        println!("data_dir: {}", parsed.data_dir.display());
        println!("output_dir: {}", parsed.output_dir.display());
        println!("skip_train: {}", parsed.skip_train);
        return Ok(());
    }

    let data_dir = parsed.data_dir.join(DATA_SUBDIR);
    let files = HttpFileCache::new(
        &data_dir,
        Duration::from_secs(parsed.download_timeout_secs),
    )
    .with_context(|| format!("preparing download cache at {}", data_dir.display()))?;

    let mut scenario = PassageScenario::new(parsed.scenario.clone());
    if parsed.skip_train {
        scenario = scenario.without_train();
    }

    info!(
        task = %parsed.scenario.task(),
        track = %parsed.scenario.track(),
        seed = parsed.scenario.seed(),
        "Starting MSMARCO scenario run"
    );
    let run = scenario
        .run(&files)
        .with_context(|| format!("building {} track instances", parsed.scenario.track()))?;

    let manifest = RunManifest::new(&parsed.scenario, !parsed.skip_train, run.summary.clone())?;
    let paths = write_instances(&run.instances, &manifest, &parsed.output_dir)
        .with_context(|| format!("writing outputs to {}", parsed.output_dir.display()))?;

    for (split, summary) in &run.summary.splits {
        println!(
            "{split}: {} instances ({} yes, {} no)",
            summary.instances, summary.positives, summary.negatives
        );
    }
    println!(
        "Wrote {} instances to {}",
        run.summary.total_instances(),
        paths.instances.display()
    );
    println!("Manifest: {}", paths.manifest.display());

    Ok(())
}
