//! Selection of geocoding providers by name.

use std::{collections::BTreeMap, fmt, sync::Arc};

use geoaddr_core::gateways::geocode::GeoCodingGateway;
use thiserror::Error;

use crate::{
    google::{self, Google, GoogleSettings},
    http::RequestSettings,
    mapbox::{self, Mapbox, MapboxSettings},
    nominatim::{self, Nominatim, NominatimSettings},
};

pub type Geocoder = Box<dyn GeoCodingGateway + Send + Sync>;

type Constructor = Arc<dyn Fn(&GeocoderSettings) -> Geocoder + Send + Sync>;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Unsupported geocoding provider '{0}'")]
    UnsupportedProvider(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderSettings {
    /// Name of the provider that is used by default.
    pub provider: String,
    /// Asked when the default provider found nothing.
    pub fallback_provider: Option<String>,
    pub request: RequestSettings,
    pub google: GoogleSettings,
    pub mapbox: MapboxSettings,
    pub nominatim: NominatimSettings,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            provider: google::NAME.to_owned(),
            fallback_provider: None,
            request: RequestSettings::default(),
            google: GoogleSettings::default(),
            mapbox: MapboxSettings::default(),
            nominatim: NominatimSettings::default(),
        }
    }
}

/// Registry of provider constructors.
#[derive(Clone)]
pub struct GeocoderFactory {
    settings: GeocoderSettings,
    constructors: BTreeMap<String, Constructor>,
}

impl fmt::Debug for GeocoderFactory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GeocoderFactory")
            .field("settings", &self.settings)
            .field("providers", &self.list_providers())
            .finish()
    }
}

impl GeocoderFactory {
    /// Creates a factory with the built-in providers.
    pub fn new(settings: GeocoderSettings) -> Self {
        let mut factory = Self {
            settings,
            constructors: BTreeMap::new(),
        };
        factory.extend(google::NAME, |settings| {
            Box::new(Google::new(settings.google.clone(), settings.request))
        });
        factory.extend(mapbox::NAME, |settings| {
            Box::new(Mapbox::new(settings.mapbox.clone(), settings.request))
        });
        factory.extend(nominatim::NAME, |settings| {
            Box::new(Nominatim::new(settings.nominatim.clone(), settings.request))
        });
        factory
    }

    pub fn settings(&self) -> &GeocoderSettings {
        &self.settings
    }

    /// Registers an additional provider or replaces an existing one.
    pub fn extend<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&GeocoderSettings) -> Geocoder + Send + Sync + 'static,
    {
        let name = name.into();
        log::debug!("Registering geocoding provider '{name}'");
        self.constructors.insert(name, Arc::new(constructor));
    }

    /// Creates the named provider or the configured default.
    pub fn make(&self, name: Option<&str>) -> Result<Geocoder, ConfigurationError> {
        let name = name.unwrap_or(self.settings.provider.as_str());
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ConfigurationError::UnsupportedProvider(name.to_owned()))?;
        Ok(constructor(&self.settings))
    }

    /// Creates the fallback provider if one is configured and it
    /// differs from the default provider.
    pub fn make_fallback(&self) -> Result<Option<Geocoder>, ConfigurationError> {
        match &self.settings.fallback_provider {
            Some(name) if *name != self.settings.provider => {
                self.make(Some(name.as_str())).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Checks that all configured providers are registered.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.make(None)?;
        self.make_fallback()?;
        Ok(())
    }

    /// Names of all registered providers in alphabetical order.
    pub fn list_providers(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}
