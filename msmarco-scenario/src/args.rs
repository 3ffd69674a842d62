use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use common::utils::config::{get_config, AppConfig};
use msmarco_scenario::{
    config::{
        DEFAULT_NUM_EVAL_QUERIES, DEFAULT_NUM_TRAIN_QUERIES, DEFAULT_SEED, DEFAULT_TOPK,
    },
    types::Rank,
    ScenarioConfig, TaskKind, TrackKind,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Scenario task
    #[arg(long, default_value_t = TaskKind::default())]
    pub task: TaskKind,

    /// Evaluation track (regular dev queries or TREC 2019)
    #[arg(long, default_value_t = TrackKind::default())]
    pub track: TrackKind,

    /// Number of validation queries to sample
    #[arg(long, default_value_t = DEFAULT_NUM_EVAL_QUERIES)]
    pub num_eval_queries: usize,

    /// Number of train queries to sample
    #[arg(long, default_value_t = DEFAULT_NUM_TRAIN_QUERIES)]
    pub num_train_queries: usize,

    /// Number of ranked passages considered per validation query
    #[arg(long, default_value_t = DEFAULT_TOPK)]
    pub topk: Rank,

    /// Sampling seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Directory holding downloaded source files (overrides DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving instances.jsonl and manifest.json (overrides OUTPUT_DIR)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Do not download or materialize the train split
    #[arg(long)]
    pub skip_train: bool,

    /// Validate and print the resolved configuration, then exit
    #[arg(long)]
    pub dry_run: bool,
}

pub struct ParsedArgs {
    pub scenario: ScenarioConfig,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub download_timeout_secs: u64,
    pub skip_train: bool,
    pub dry_run: bool,
}

impl Config {
    pub fn finalize(self, app: &AppConfig) -> Result<ParsedArgs> {
        let scenario = ScenarioConfig::new(
            self.task,
            self.track,
            self.num_eval_queries,
            self.num_train_queries,
            self.topk,
        )
        .context("validating scenario arguments")?
        .with_seed(self.seed);

        Ok(ParsedArgs {
            scenario,
            data_dir: self
                .data_dir
                .unwrap_or_else(|| PathBuf::from(&app.data_dir)),
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(&app.output_dir)),
            download_timeout_secs: app.download_timeout_secs,
            skip_train: self.skip_train,
            dry_run: self.dry_run,
        })
    }
}

pub fn parse() -> Result<ParsedArgs> {
    let config = Config::parse();
    let app = get_config().context("loading application configuration")?;
    config.finalize(&app)
}
