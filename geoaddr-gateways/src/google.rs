use geoaddr_core::{
    entities::{Address, Coordinates},
    gateways::geocode::GeoCodingGateway,
};
use reqwest::Url;
use serde::Deserialize;

use crate::http::{self, LookupFailure, RequestSettings};

pub const NAME: &str = "google";

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleSettings {
    pub api_key: String,
    pub language: Option<String>,
    pub region: Option<String>,
    /// Restricts results to a country (ISO 3166-1 alpha-2).
    pub country: Option<String>,
    pub base_url: String,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: None,
            region: None,
            country: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}

/// Google Maps Geocoding API.
#[derive(Debug, Clone)]
pub struct Google {
    settings: GoogleSettings,
    request: RequestSettings,
}

impl Google {
    pub fn new(settings: GoogleSettings, request: RequestSettings) -> Self {
        Self { settings, request }
    }

    fn request_url(&self, address: &str) -> Result<Url, LookupFailure> {
        let GoogleSettings {
            api_key,
            language,
            region,
            country,
            base_url,
        } = &self.settings;
        let mut params = vec![("address", address.to_owned()), ("key", api_key.clone())];
        if let Some(language) = language {
            params.push(("language", language.clone()));
        }
        if let Some(region) = region {
            params.push(("region", region.clone()));
        }
        if let Some(country) = country {
            params.push(("components", format!("country:{country}")));
        }
        http::parse_url(base_url, &params)
    }

    fn lookup(&self, address: &Address) -> Result<Coordinates, LookupFailure> {
        if self.settings.api_key.trim().is_empty() {
            return Err(LookupFailure::MissingCredentials);
        }
        let url = self.request_url(&address.formatted_address())?;
        let body = http::get_text(url, None, &self.request)?;
        parse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

fn parse_response(body: &str) -> Result<Coordinates, LookupFailure> {
    let Response {
        status,
        results,
        error_message,
    } = serde_json::from_str(body)?;
    match status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Err(LookupFailure::NoResults),
        _ => {
            let reason = match error_message {
                Some(msg) => format!("{status}: {msg}"),
                None => status,
            };
            return Err(LookupFailure::Rejected(reason));
        }
    }
    let location = results
        .into_iter()
        .next()
        .ok_or(LookupFailure::NoResults)?
        .geometry
        .location;
    http::checked_coordinates(location.lat, location.lng)
}

impl GeoCodingGateway for Google {
    fn name(&self) -> &str {
        NAME
    }

    fn geocode(&self, address: &Address) -> Option<Coordinates> {
        http::log_outcome(NAME, address, self.lookup(address))
    }
}
