use anyhow::{anyhow, Result};
use geoaddr_application::queue::QueueSettings;
use geoaddr_gateways::{
    factory::GeocoderSettings, google::GoogleSettings, mapbox::MapboxSettings,
    nominatim::NominatimSettings, RequestSettings,
};
use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

mod raw;

const DEFAULT_CONFIG_FILE_NAME: &str = "geoaddress.toml";

const ENV_NAME_DB_URL: &str = "DATABASE_URL";
const ENV_NAME_PROVIDER: &str = "GEOADDRESS_PROVIDER";
const ENV_NAME_FALLBACK_PROVIDER: &str = "GEOADDRESS_FALLBACK_PROVIDER";
const ENV_NAME_TIMEOUT: &str = "GEOADDRESS_TIMEOUT";
const ENV_NAME_GOOGLE_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
const ENV_NAME_MAPBOX_ACCESS_TOKEN: &str = "MAPBOX_ACCESS_TOKEN";
const ENV_NAME_NOMINATIM_URL: &str = "NOMINATIM_URL";
const ENV_NAME_NOMINATIM_USER_AGENT: &str = "NOMINATIM_USER_AGENT";

pub struct Config {
    pub db: Db,
    pub geocoding: GeocoderSettings,
    pub queue: QueueSettings,
    /// Failed lookups are not repeated within this period.
    pub failure_cooldown: time::Duration,
    pub events: Events,
}

pub struct Db {
    /// SQLite connection
    pub conn_sqlite: String,
    pub conn_pool_size: u8,
}

pub struct Events {
    /// File system directory for writing geocoded events into JSON files.
    pub json_dir: Option<PathBuf>,
}

impl Config {
    pub fn try_load_from_file_or_default<P: AsRef<Path>>(file_path: Option<P>) -> Result<Self> {
        let file_path: &Path = file_path.as_ref().map(|p| p.as_ref()).unwrap_or_else(|| {
            log::info!("No configuration file specified. load {DEFAULT_CONFIG_FILE_NAME}");
            Path::new(DEFAULT_CONFIG_FILE_NAME)
        });

        let raw_config = match fs::read_to_string(file_path) {
            Ok(cfg_string) => toml::from_str(&cfg_string)?,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    log::info!(
                        "{} not found => load default configuration.",
                        file_path.display()
                    );
                    Ok(raw::Config::default())
                }
                _ => Err(err),
            }?,
        };
        let mut cfg = Self::try_from(raw_config)?;
        cfg.apply_env_overrides(|name| env::var(name).ok())?;
        Ok(cfg)
    }

    fn apply_env_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_url) = var(ENV_NAME_DB_URL) {
            self.db.conn_sqlite = db_url;
        }
        let geocoding = &mut self.geocoding;
        if let Some(provider) = var(ENV_NAME_PROVIDER) {
            geocoding.provider = provider;
        }
        if let Some(provider) = var(ENV_NAME_FALLBACK_PROVIDER) {
            geocoding.fallback_provider = Some(provider).filter(|p| !p.trim().is_empty());
        }
        if let Some(timeout) = var(ENV_NAME_TIMEOUT) {
            geocoding.request.timeout = duration_str::parse(&timeout)
                .map_err(|err| anyhow!("Invalid {ENV_NAME_TIMEOUT} '{timeout}': {err}"))?;
        }
        if let Some(api_key) = var(ENV_NAME_GOOGLE_API_KEY) {
            geocoding.google.api_key = api_key;
        }
        if let Some(access_token) = var(ENV_NAME_MAPBOX_ACCESS_TOKEN) {
            geocoding.mapbox.access_token = access_token;
        }
        if let Some(url) = var(ENV_NAME_NOMINATIM_URL) {
            geocoding.nominatim.url = url;
        }
        if let Some(user_agent) = var(ENV_NAME_NOMINATIM_USER_AGENT) {
            geocoding.nominatim.user_agent = user_agent;
        }
        Ok(())
    }
}

impl TryFrom<raw::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(from: raw::Config) -> Result<Self> {
        let raw::Config {
            db,
            geocoding,
            queue,
            events,
        } = from;

        let raw::Db {
            connection_sqlite,
            connection_pool_size,
        } = db.unwrap_or_default();

        if connection_pool_size == 0 {
            return Err(anyhow!("The connection pool must not be empty"));
        }
        let db = Db {
            conn_sqlite: connection_sqlite,
            conn_pool_size: connection_pool_size,
        };

        let raw::Geocoding {
            provider,
            fallback_provider,
            timeout,
            retry_times,
            retry_sleep,
            google,
            mapbox,
            nominatim,
        } = geocoding.unwrap_or_default();

        let defaults = GeocoderSettings::default();
        let request = RequestSettings {
            timeout: timeout.unwrap_or(defaults.request.timeout),
            retry_times: retry_times.unwrap_or(defaults.request.retry_times),
            retry_sleep: retry_sleep.unwrap_or(defaults.request.retry_sleep),
        };

        let raw::Google {
            api_key,
            language,
            region,
            country,
            base_url,
        } = google.unwrap_or_default();
        let google = GoogleSettings {
            api_key: api_key.unwrap_or(defaults.google.api_key),
            language,
            region,
            country,
            base_url: base_url.unwrap_or(defaults.google.base_url),
        };

        let raw::Mapbox {
            access_token,
            base_url,
        } = mapbox.unwrap_or_default();
        let mapbox = MapboxSettings {
            access_token: access_token.unwrap_or(defaults.mapbox.access_token),
            base_url: base_url.unwrap_or(defaults.mapbox.base_url),
        };

        let raw::Nominatim { url, user_agent } = nominatim.unwrap_or_default();
        let nominatim = NominatimSettings {
            url: url.unwrap_or(defaults.nominatim.url),
            user_agent: user_agent.unwrap_or(defaults.nominatim.user_agent),
        };

        let geocoding = GeocoderSettings {
            provider: provider.unwrap_or(defaults.provider),
            fallback_provider: fallback_provider.filter(|p| !p.trim().is_empty()),
            request,
            google,
            mapbox,
            nominatim,
        };

        let raw::Queue {
            name,
            workers,
            tries,
            backoff,
            unique_for,
            failure_cooldown,
        } = queue.unwrap_or_default();
        let defaults = QueueSettings::default();
        let queue = QueueSettings {
            name: name.unwrap_or(defaults.name),
            workers: workers.unwrap_or(defaults.workers),
            tries: tries.unwrap_or(defaults.tries),
            backoff: backoff.unwrap_or(defaults.backoff),
            unique_for: unique_for.unwrap_or(defaults.unique_for),
        };
        if queue.workers == 0 || queue.tries == 0 {
            return Err(anyhow!("The queue needs at least one worker and one try"));
        }
        let failure_cooldown = match failure_cooldown {
            Some(cooldown) => time::Duration::try_from(cooldown)?,
            None => geoaddr_core::usecases::DEFAULT_FAILURE_COOLDOWN,
        };

        let raw::Events { json_dir } = events.unwrap_or_default();
        let events = Events { json_dir };

        Ok(Self {
            db,
            geocoding,
            queue,
            failure_cooldown,
            events,
        })
    }
}
