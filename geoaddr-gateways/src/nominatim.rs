use geoaddr_core::{
    entities::{Address, Coordinates, PostalAddress},
    gateways::geocode::GeoCodingGateway,
};
use itertools::Itertools;
use reqwest::Url;
use serde::Deserialize;

use crate::http::{self, LookupFailure, RequestSettings};

pub const NAME: &str = "nominatim";

pub const DEFAULT_URL: &str = "https://nominatim.openstreetmap.org";

pub const DEFAULT_USER_AGENT: &str = "geoaddress";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominatimSettings {
    pub url: String,
    /// Sent with every request, required by the usage policy.
    pub user_agent: String,
}

impl Default for NominatimSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// OpenStreetMap Nominatim search API.
#[derive(Debug, Clone)]
pub struct Nominatim {
    settings: NominatimSettings,
    request: RequestSettings,
}

/// Search text in the order Nominatim matches best:
/// `{number} {street}, {city}, {state}, {postal_code}`.
///
/// Complement and neighbourhood are left out, the country is passed
/// as a separate filter.
fn search_text(postal: &PostalAddress) -> String {
    let house = [
        postal.number.as_deref().unwrap_or_default(),
        postal.street.as_str(),
    ]
    .into_iter()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .join(" ");
    let text = [
        house.as_str(),
        postal.city.as_str(),
        postal.state.as_str(),
        postal.postal_code.as_deref().unwrap_or_default(),
    ]
    .into_iter()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .join(", ");
    text
}

impl Nominatim {
    pub fn new(settings: NominatimSettings, request: RequestSettings) -> Self {
        Self { settings, request }
    }

    fn request_url(&self, postal: &PostalAddress) -> Result<Url, LookupFailure> {
        let base_url = format!("{}/search", self.settings.url.trim_end_matches('/'));
        let mut params = vec![
            ("q", search_text(postal)),
            ("format", "json".to_owned()),
            ("limit", "1".to_owned()),
        ];
        let country_code = postal.country_code.trim();
        if !country_code.is_empty() {
            params.push(("countrycodes", country_code.to_ascii_lowercase()));
        }
        http::parse_url(&base_url, &params)
    }

    fn lookup(&self, address: &Address) -> Result<Coordinates, LookupFailure> {
        let url = self.request_url(&address.postal)?;
        let body = http::get_text(url, Some(&self.settings.user_agent), &self.request)?;
        parse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

fn parse_response(body: &str) -> Result<Coordinates, LookupFailure> {
    let places: Vec<Place> = serde_json::from_str(body)?;
    let Place { lat, lon } = places.into_iter().next().ok_or(LookupFailure::NoResults)?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|err| LookupFailure::InvalidResponse(format!("'{s}': {err}")))
    };
    http::checked_coordinates(parse(&lat)?, parse(&lon)?)
}

impl GeoCodingGateway for Nominatim {
    fn name(&self) -> &str {
        NAME
    }

    fn geocode(&self, address: &Address) -> Option<Coordinates> {
        http::log_outcome(NAME, address, self.lookup(address))
    }
}
