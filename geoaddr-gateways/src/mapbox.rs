use geoaddr_core::{
    entities::{Address, Coordinates},
    gateways::geocode::GeoCodingGateway,
};
use reqwest::Url;
use serde::Deserialize;

use crate::http::{self, LookupFailure, RequestSettings};

pub const NAME: &str = "mapbox";

pub const DEFAULT_BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapboxSettings {
    pub access_token: String,
    pub base_url: String,
}

impl Default for MapboxSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}

/// Mapbox forward geocoding.
#[derive(Debug, Clone)]
pub struct Mapbox {
    settings: MapboxSettings,
    request: RequestSettings,
}

impl Mapbox {
    pub fn new(settings: MapboxSettings, request: RequestSettings) -> Self {
        Self { settings, request }
    }

    // The search text is the last path segment: `{base_url}/{query}.json`
    fn request_url(&self, address: &str) -> Result<Url, LookupFailure> {
        let MapboxSettings {
            access_token,
            base_url,
        } = &self.settings;
        let mut url = http::parse_url(
            base_url,
            &[("access_token", access_token.as_str()), ("limit", "1")],
        )?;
        url.path_segments_mut()
            .map_err(|()| LookupFailure::InvalidUrl(base_url.clone()))?
            .pop_if_empty()
            .push(&format!("{address}.json"));
        Ok(url)
    }

    fn lookup(&self, address: &Address) -> Result<Coordinates, LookupFailure> {
        if self.settings.access_token.trim().is_empty() {
            return Err(LookupFailure::MissingCredentials);
        }
        let url = self.request_url(&address.formatted_address())?;
        let body = http::get_text(url, None, &self.request)?;
        parse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    /// `[longitude, latitude]`
    center: (f64, f64),
}

fn parse_response(body: &str) -> Result<Coordinates, LookupFailure> {
    let FeatureCollection { features } = serde_json::from_str(body)?;
    let (lng, lat) = features
        .into_iter()
        .next()
        .ok_or(LookupFailure::NoResults)?
        .center;
    http::checked_coordinates(lat, lng)
}

impl GeoCodingGateway for Mapbox {
    fn name(&self) -> &str {
        NAME
    }

    fn geocode(&self, address: &Address) -> Option<Coordinates> {
        http::log_outcome(NAME, address, self.lookup(address))
    }
}
