use duration_str::deserialize_option_duration;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

const DEFAULT_CONFIG_FILE: &str = include_str!("geoaddress.default.toml");

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub db: Option<Db>,
    pub geocoding: Option<Geocoding>,
    pub queue: Option<Queue>,
    pub events: Option<Events>,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_FILE).expect("Default configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Db {
    pub connection_sqlite: String,
    pub connection_pool_size: u8,
}

impl Default for Db {
    fn default() -> Self {
        Config::default().db.expect("DB configuration")
    }
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Geocoding {
    pub provider: Option<String>,
    pub fallback_provider: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub timeout: Option<Duration>,
    pub retry_times: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub retry_sleep: Option<Duration>,
    pub google: Option<Google>,
    pub mapbox: Option<Mapbox>,
    pub nominatim: Option<Nominatim>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Google {
    pub api_key: Option<String>,
    pub language: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Mapbox {
    pub access_token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Nominatim {
    pub url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Queue {
    pub name: Option<String>,
    pub workers: Option<usize>,
    pub tries: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub backoff: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub unique_for: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub failure_cooldown: Option<Duration>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Events {
    pub json_dir: Option<PathBuf>,
}
