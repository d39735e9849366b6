use crate::{companion::CompanionConfig, layout::DisplayInfo, state::Theme};
use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::{fs::File, path::PathBuf};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file holding persisted settings and the last weather sample
    pub settings_path: PathBuf,
    /// Theme used until the user picks one
    pub default_theme: Theme,
    /// Geometry of the mock display. The hardware panel knows its own
    pub display: DisplayInfo,
    /// SPI device for the e-ink panel
    pub display_port: String,
    /// Where to get weather from. Without this the phone is never connected
    pub companion: Option<CompanionConfig>,
    /// sysfs file with the battery charge percentage
    pub battery_path: Option<PathBuf>,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from the given path, or the default location
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let path = path.unwrap_or(Self::PATH);
        info!("Loading config from `{path}`");
        let file = File::open(path)
            .with_context(|| format!("Error opening config file {path}"))?;
        serde_json::from_reader(file)
            .with_context(|| format!("Error parsing config file {path}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: "./settings.json".into(),
            default_theme: Theme::default(),
            display: DisplayInfo::default(),
            display_port: "/dev/spidev0.0".into(),
            companion: None,
            battery_path: None,
        }
    }
}
