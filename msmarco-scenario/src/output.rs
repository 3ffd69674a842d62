//! Persists a scenario run as JSON lines plus a manifest.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
    config::ScenarioConfig,
    scenario::RunSummary,
    types::Instance,
};

const MANIFEST_VERSION: u32 = 1;
pub const INSTANCES_FILE_NAME: &str = "instances.jsonl";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub version: u32,
    /// Stable digest of the parameters that determine the instance set.
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub config: ScenarioConfig,
    pub include_train: bool,
    pub summary: RunSummary,
}

impl RunManifest {
    pub fn new(config: &ScenarioConfig, include_train: bool, summary: RunSummary) -> Result<Self> {
        Ok(Self {
            version: MANIFEST_VERSION,
            fingerprint: fingerprint(config, include_train)?,
            generated_at: Utc::now(),
            config: config.clone(),
            include_train,
            summary,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub instances: PathBuf,
    pub manifest: PathBuf,
}

pub fn write_instances(
    instances: &[Instance],
    manifest: &RunManifest,
    dir: &Path,
) -> Result<OutputPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let instances_path = dir.join(INSTANCES_FILE_NAME);
    let file = File::create(&instances_path)
        .with_context(|| format!("creating {}", instances_path.display()))?;
    let mut writer = BufWriter::new(file);
    for instance in instances {
        serde_json::to_writer(&mut writer, instance).context("serialising instance to JSON")?;
        writer.write_all(b"\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", instances_path.display()))?;

    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    let json = serde_json::to_vec_pretty(manifest).context("serialising run manifest to JSON")?;
    fs::write(&manifest_path, json)
        .with_context(|| format!("writing run manifest {}", manifest_path.display()))?;

    Ok(OutputPaths {
        instances: instances_path,
        manifest: manifest_path,
    })
}

fn fingerprint(config: &ScenarioConfig, include_train: bool) -> Result<String> {
    let payload = serde_json::to_vec(&(config, include_train))
        .context("serialising scenario parameters for fingerprint")?;
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let digest = hasher.finalize();
    Ok(digest[..16]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>())
}
