use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_download_timeout_secs() -> u64 {
    600
}

pub fn get_config() -> Result<AppConfig, AppError> {
    let builder = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default());

    load_config(builder)
}

fn load_config(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, AppError> {
    Ok(builder.build()?.try_deserialize()?)
}
